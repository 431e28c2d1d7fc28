//! Extraction from JavaScript source.

use super::tokens::{CallScanner, Token, TokenKind};
use super::{ExtractOptions, ExtractedMessage};

/// Keywords after which a `/` starts a regular expression literal.
const REGEX_PRECEDING_WORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else",
];

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            tokens: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: TokenKind, line: usize) {
        self.tokens.push(Token::new(kind, line));
    }

    /// Whether a `/` at the current position starts a regex literal.
    fn regex_allowed(&self) -> bool {
        let previous = self
            .tokens
            .iter()
            .rev()
            .find(|t| !matches!(t.kind, TokenKind::Comment(_)));
        match previous.map(|t| &t.kind) {
            None => true,
            Some(TokenKind::Punct(c)) => !matches!(c, ')' | ']' | '}'),
            Some(TokenKind::Name(word)) => REGEX_PRECEDING_WORDS.contains(&word.as_str()),
            Some(_) => false,
        }
    }

    fn run(mut self) -> Vec<Token> {
        while let Some(c) = self.peek(0) {
            match c {
                '\n' => {
                    self.line += 1;
                    self.pos += 1;
                },
                '/' if self.peek(1) == Some('/') => self.line_comment(),
                '/' if self.peek(1) == Some('*') => self.block_comment(),
                '/' if self.regex_allowed() => self.regex(),
                '\'' | '"' => {
                    let line = self.line;
                    let value = self.string(c);
                    self.push(TokenKind::Str(Some(value)), line);
                },
                '`' => {
                    let line = self.line;
                    let value = self.template();
                    self.push(TokenKind::Str(value), line);
                },
                c if c.is_alphabetic() || c == '_' || c == '$' => {
                    let start = self.pos;
                    while self
                        .peek(0)
                        .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
                    {
                        self.pos += 1;
                    }
                    let word: String = self.chars[start..self.pos].iter().collect();
                    self.push(TokenKind::Name(word), self.line);
                },
                c if c.is_ascii_digit() => {
                    while self
                        .peek(0)
                        .is_some_and(|c| c.is_alphanumeric() || c == '.' || c == '_')
                    {
                        self.pos += 1;
                    }
                    self.push(TokenKind::Other, self.line);
                },
                c if c.is_whitespace() => self.pos += 1,
                c => {
                    self.push(TokenKind::Punct(c), self.line);
                    self.pos += 1;
                },
            }
        }
        self.tokens
    }

    fn line_comment(&mut self) {
        let start = self.pos + 2;
        while self.peek(0).is_some_and(|c| c != '\n') {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.push(TokenKind::Comment(text.trim().to_string()), self.line);
    }

    /// Emits one comment token per line, with the leading `*` of each
    /// continuation line removed.
    fn block_comment(&mut self) {
        self.pos += 2;
        let mut text = String::new();
        let mut line = self.line;
        let mut lines = Vec::new();

        while let Some(c) = self.peek(0) {
            if c == '*' && self.peek(1) == Some('/') {
                self.pos += 2;
                break;
            }
            if c == '\n' {
                lines.push((line, std::mem::take(&mut text)));
                self.line += 1;
                line = self.line;
            } else {
                text.push(c);
            }
            self.pos += 1;
        }
        lines.push((line, text));

        for (line, text) in lines {
            let text = text.trim();
            let text = text.strip_prefix('*').map(str::trim_start).unwrap_or(text);
            if !text.is_empty() {
                self.push(TokenKind::Comment(text.to_string()), line);
            }
        }
    }

    fn regex(&mut self) {
        self.pos += 1;
        let mut in_class = false;
        while let Some(c) = self.peek(0) {
            match c {
                '\n' => break,
                '\\' => self.pos += 1,
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => {
                    self.pos += 1;
                    break;
                },
                _ => {},
            }
            self.pos += 1;
        }
        while self.peek(0).is_some_and(char::is_alphanumeric) {
            self.pos += 1;
        }
        self.push(TokenKind::Other, self.line);
    }

    fn string(&mut self, quote: char) -> String {
        self.pos += 1;
        let mut value = String::new();
        while let Some(c) = self.peek(0) {
            match c {
                c if c == quote => {
                    self.pos += 1;
                    break;
                },
                '\n' => break,
                '\\' => {
                    self.pos += 1;
                    self.escape(&mut value);
                },
                c => {
                    value.push(c);
                    self.pos += 1;
                },
            }
        }
        value
    }

    /// Read a template literal. Returns `None` if it has substitutions.
    fn template(&mut self) -> Option<String> {
        self.pos += 1;
        let mut value = String::new();
        let mut dynamic = false;
        while let Some(c) = self.peek(0) {
            match c {
                '`' => {
                    self.pos += 1;
                    break;
                },
                '\\' => {
                    self.pos += 1;
                    self.escape(&mut value);
                },
                '$' if self.peek(1) == Some('{') => {
                    dynamic = true;
                    self.pos += 2;
                    self.skip_substitution();
                },
                c => {
                    if c == '\n' {
                        self.line += 1;
                    }
                    value.push(c);
                    self.pos += 1;
                },
            }
        }
        (!dynamic).then_some(value)
    }

    fn skip_substitution(&mut self) {
        let mut depth = 1;
        while let Some(c) = self.peek(0) {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return;
                    }
                },
                '\'' | '"' => {
                    self.string(c);
                    continue;
                },
                '`' => {
                    self.template();
                    continue;
                },
                '\n' => self.line += 1,
                _ => {},
            }
            self.pos += 1;
        }
    }

    fn escape(&mut self, value: &mut String) {
        let Some(c) = self.peek(0) else {
            return;
        };
        self.pos += 1;
        match c {
            '\n' => self.line += 1,
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            'b' => value.push('\x08'),
            'f' => value.push('\x0c'),
            'v' => value.push('\x0b'),
            '0' if !self.peek(0).is_some_and(|d| d.is_ascii_digit()) => value.push('\0'),
            'x' => self.hex_escape(value, 'x', 2),
            'u' if self.peek(0) == Some('{') => {
                let close = (1..=7).find(|&i| self.peek(i) == Some('}'));
                let decoded = close.and_then(|end| {
                    let hex: String = (1..end).filter_map(|i| self.peek(i)).collect();
                    u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
                });
                match (close, decoded) {
                    (Some(end), Some(c)) => {
                        value.push(c);
                        self.pos += end + 1;
                    },
                    _ => value.push('u'),
                }
            },
            'u' => self.hex_escape(value, 'u', 4),
            c => value.push(c),
        }
    }

    fn hex_escape(&mut self, value: &mut String, marker: char, digits: usize) {
        let hex: String = (0..digits).filter_map(|i| self.peek(i)).collect();
        let decoded = (hex.len() == digits)
            .then(|| u32::from_str_radix(&hex, 16).ok())
            .flatten()
            .and_then(char::from_u32);
        match decoded {
            Some(c) => {
                value.push(c);
                self.pos += digits;
            },
            None => value.push(marker),
        }
    }
}

/// Extract messages from JavaScript source.
pub fn extract(source: &str, options: &ExtractOptions) -> Vec<ExtractedMessage> {
    let tokens = Lexer::new(source).run();
    CallScanner {
        keywords: &options.keywords,
        comment_tags: &options.comment_tags,
        definition_words: &["function"],
        join_plus: true,
    }
    .scan(&tokens)
}
