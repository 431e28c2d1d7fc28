//! Token stream shared by the script lexers and the call scanner that turns
//! keyword calls into messages.

use super::ExtractedMessage;
use crate::keywords::Keywords;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Name(String),
    /// A string literal; `None` when its value depends on runtime data
    /// (f-strings, template literals with substitutions).
    Str(Option<String>),
    Punct(char),
    Comment(String),
    /// Numbers, regex literals and anything else the scanner ignores.
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize) -> Self {
        Self { kind, line }
    }
}

/// Translator comments collected ahead of a call.
#[derive(Default)]
struct CommentBlock {
    lines: Vec<(usize, String)>,
}

impl CommentBlock {
    fn feed(&mut self, line: usize, text: &str, tags: &[String]) {
        let continues = self.lines.last().is_some_and(|(last, _)| *last + 1 == line);
        if tags.iter().any(|tag| text.starts_with(tag.as_str())) {
            if !continues {
                self.lines.clear();
            }
            self.lines.push((line, text.to_string()));
        } else if continues {
            self.lines.push((line, text.to_string()));
        } else {
            self.lines.clear();
        }
    }

    /// Comments that end on `line` or the line before, consuming the block.
    fn take_for(&mut self, line: usize) -> Vec<String> {
        let lines = std::mem::take(&mut self.lines);
        match lines.last() {
            Some((last, _)) if *last + 1 >= line => lines.into_iter().map(|(_, text)| text).collect(),
            _ => Vec::new(),
        }
    }
}

/// Finds keyword calls in a token stream.
pub(crate) struct CallScanner<'a> {
    pub keywords: &'a Keywords,
    pub comment_tags: &'a [String],
    /// Names that introduce a definition rather than a call (`def _(...)`).
    pub definition_words: &'a [&'a str],
    /// Whether `"a" + "b"` joins into one literal.
    pub join_plus: bool,
}

struct Call {
    args: Vec<Option<String>>,
    first_string_line: Option<usize>,
}

#[derive(Default)]
struct ArgState {
    text: String,
    strings: usize,
    pending_plus: bool,
    literal: bool,
    empty: bool,
}

impl ArgState {
    fn new() -> Self {
        Self {
            literal: true,
            empty: true,
            ..Default::default()
        }
    }

    fn finish(self) -> Option<String> {
        (self.literal && self.strings > 0 && !self.pending_plus).then_some(self.text)
    }
}

impl CallScanner<'_> {
    pub fn scan(&self, tokens: &[Token]) -> Vec<ExtractedMessage> {
        let mut messages = Vec::new();
        let mut comments = CommentBlock::default();

        for (i, token) in tokens.iter().enumerate() {
            let name = match &token.kind {
                TokenKind::Comment(text) => {
                    comments.feed(token.line, text, self.comment_tags);
                    continue;
                },
                TokenKind::Name(name) => name,
                _ => continue,
            };

            let Some(spec) = self.keywords.get(name) else {
                continue;
            };
            if !matches!(tokens.get(i + 1).map(|t| &t.kind), Some(TokenKind::Punct('('))) {
                continue;
            }
            let is_definition = i
                .checked_sub(1)
                .and_then(|prev| tokens.get(prev))
                .is_some_and(|prev| {
                    matches!(&prev.kind, TokenKind::Name(word) if self.definition_words.contains(&word.as_str()))
                });
            if is_definition {
                continue;
            }

            let call = self.collect_args(&tokens[i + 2..]);
            let lineno = call.first_string_line.unwrap_or(token.line);
            let auto_comments = comments.take_for(token.line);

            let Some((id, context)) = spec.select(&call.args) else {
                continue;
            };
            if id.msgid().is_empty() {
                tracing::warn!(
                    line = lineno,
                    "empty msgid in call to {name}; it is reserved by gettext, skipping"
                );
                continue;
            }

            messages.push(ExtractedMessage {
                lineno,
                funcname: name.clone(),
                id,
                context,
                comments: auto_comments,
            });
        }

        messages
    }

    /// Collect positional arguments of a call whose `(` has been consumed.
    fn collect_args(&self, tokens: &[Token]) -> Call {
        let mut args = Vec::new();
        let mut arg = ArgState::new();
        let mut depth = 0usize;
        let mut first_string_line = None;

        for token in tokens {
            match &token.kind {
                TokenKind::Comment(_) => continue,
                TokenKind::Punct('(' | '[' | '{') => {
                    depth += 1;
                    arg.literal = false;
                },
                TokenKind::Punct(')' | ']' | '}') if depth > 0 => depth -= 1,
                TokenKind::Punct(')') => break,
                TokenKind::Punct(_) | TokenKind::Name(_) | TokenKind::Other | TokenKind::Str(_)
                    if depth > 0 => {},
                TokenKind::Punct(',') => {
                    args.push(std::mem::replace(&mut arg, ArgState::new()).finish());
                    continue;
                },
                TokenKind::Punct('+') if self.join_plus && arg.strings > 0 && !arg.pending_plus => {
                    arg.pending_plus = true;
                },
                TokenKind::Str(Some(value)) => {
                    if arg.strings > 0 && !arg.pending_plus && self.join_plus {
                        arg.literal = false;
                    }
                    first_string_line.get_or_insert(token.line);
                    arg.text.push_str(value);
                    arg.strings += 1;
                    arg.pending_plus = false;
                },
                TokenKind::Str(None) | TokenKind::Punct(_) | TokenKind::Name(_) | TokenKind::Other => {
                    arg.literal = false;
                },
            }
            arg.empty = false;
        }

        if !arg.empty {
            args.push(arg.finish());
        }

        Call {
            args,
            first_string_line,
        }
    }
}
