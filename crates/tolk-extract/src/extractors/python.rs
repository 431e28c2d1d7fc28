//! Extraction from Python-style source code.
//!
//! Also used for the expressions inside template tags, which share Python's
//! string and call syntax.

use super::tokens::{CallScanner, Token, TokenKind};
use super::{ExtractOptions, ExtractedMessage};

const STRING_PREFIXES: &[&str] = &["r", "u", "b", "f", "br", "rb", "fr", "rf"];

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str, first_line: usize) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: first_line,
            tokens: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: TokenKind, line: usize) {
        self.tokens.push(Token::new(kind, line));
    }

    fn run(mut self) -> Vec<Token> {
        while let Some(c) = self.peek(0) {
            match c {
                '\n' => {
                    self.line += 1;
                    self.pos += 1;
                },
                '#' => self.comment(),
                '\\' if self.peek(1) == Some('\n') => {
                    self.line += 1;
                    self.pos += 2;
                },
                '\'' | '"' => {
                    let line = self.line;
                    let value = self.string(c, false);
                    self.push(TokenKind::Str(Some(value)), line);
                },
                c if c.is_alphabetic() || c == '_' => self.name_or_prefixed_string(),
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

    fn comment(&mut self) {
        let start = self.pos + 1;
        while self.peek(0).is_some_and(|c| c != '\n') {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.push(TokenKind::Comment(text.trim().to_string()), self.line);
    }

    fn name_or_prefixed_string(&mut self) {
        let start = self.pos;
        while self
            .peek(0)
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        if let Some(quote @ ('\'' | '"')) = self.peek(0) {
            let prefix = word.to_ascii_lowercase();
            if STRING_PREFIXES.contains(&prefix.as_str()) {
                let line = self.line;
                let value = self.string(quote, prefix.contains('r'));
                let kind = if prefix.contains('f') {
                    TokenKind::Str(None)
                } else {
                    TokenKind::Str(Some(value))
                };
                self.push(kind, line);
                return;
            }
        }

        self.push(TokenKind::Name(word), self.line);
    }

    /// Read a string literal starting at its opening quote.
    fn string(&mut self, quote: char, raw: bool) -> String {
        let triple = self.peek(1) == Some(quote) && self.peek(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        let mut value = String::new();
        while let Some(c) = self.peek(0) {
            if c == quote
                && (!triple || (self.peek(1) == Some(quote) && self.peek(2) == Some(quote)))
            {
                self.pos += if triple { 3 } else { 1 };
                return value;
            }
            match c {
                '\n' if !triple => return value,
                '\n' => {
                    self.line += 1;
                    value.push(c);
                    self.pos += 1;
                },
                '\\' if raw => {
                    value.push(c);
                    if let Some(next) = self.peek(1) {
                        if next == '\n' {
                            self.line += 1;
                        }
                        value.push(next);
                        self.pos += 1;
                    }
                    self.pos += 1;
                },
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

    /// Decode the escape sequence after a backslash.
    fn escape(&mut self, value: &mut String) {
        let Some(c) = self.peek(0) else {
            value.push('\\');
            return;
        };
        self.pos += 1;
        match c {
            '\n' => self.line += 1,
            '\\' | '\'' | '"' => value.push(c),
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            'a' => value.push('\x07'),
            'b' => value.push('\x08'),
            'f' => value.push('\x0c'),
            'v' => value.push('\x0b'),
            '0'..='7' => {
                let mut code = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek(0).and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.pos += 1;
                        },
                        None => break,
                    }
                }
                value.extend(char::from_u32(code));
            },
            'x' => self.hex_escape(value, 'x', 2),
            'u' => self.hex_escape(value, 'u', 4),
            'U' => self.hex_escape(value, 'U', 8),
            c => {
                value.push('\\');
                value.push(c);
            },
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
            None => {
                value.push('\\');
                value.push(marker);
            },
        }
    }
}

/// Tokenize Python source. Line numbers start at `first_line`.
pub(crate) fn tokenize(source: &str, first_line: usize) -> Vec<Token> {
    Lexer::new(source, first_line).run()
}

/// Scan a token stream for keyword calls with Python call rules.
pub(crate) fn scan(tokens: &[Token], options: &ExtractOptions) -> Vec<ExtractedMessage> {
    CallScanner {
        keywords: &options.keywords,
        comment_tags: &options.comment_tags,
        definition_words: &["def", "class"],
        join_plus: false,
    }
    .scan(tokens)
}

/// Extract messages from Python source.
pub fn extract(source: &str, options: &ExtractOptions) -> Vec<ExtractedMessage> {
    let tokens = tokenize(source, 1);
    scan(&tokens, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MessageId;

    fn options() -> ExtractOptions {
        ExtractOptions {
            comment_tags: vec!["L10n:".to_string()],
            ..Default::default()
        }
    }

    fn ids(source: &str) -> Vec<String> {
        extract(source, &options())
            .into_iter()
            .map(|m| m.id.msgid().to_string())
            .collect()
    }

    #[test]
    fn test_simple_call() {
        let messages = extract("from foo import _\n\n_('python string')\n", &options());
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].lineno, 3);
        assert_eq!(messages[0].funcname, "_");
        assert_eq!(messages[0].id, MessageId::Singular("python string".to_string()));
        assert_eq!(messages[0].context, None);
    }

    #[test]
    fn test_plural_and_context() {
        let source = r#"
ngettext("%(num)s apple", "%(num)s apples", n)
pgettext("menu", "Open")
npgettext("menu", "%(num)s file", "%(num)s files", n)
"#;
        let messages = extract(source, &options());
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].id.plural(), Some("%(num)s apples"));
        assert_eq!(messages[1].context.as_deref(), Some("menu"));
        assert_eq!(messages[1].id.msgid(), "Open");
        assert_eq!(messages[2].context.as_deref(), Some("menu"));
        assert_eq!(messages[2].id.plural(), Some("%(num)s files"));
    }

    #[test]
    fn test_string_forms() {
        let source = r#"
_('single') ; _("double")
_("""triple
quoted""")
_(r'raw\n') ; _(u'unicode é')
_('implicit ' 'concat')
_("escaped \"quote\"\t")
_(f'{name} dynamic')
_(variable)
"#;
        assert_eq!(
            ids(source),
            vec![
                "single",
                "double",
                "triple\nquoted",
                "raw\\n",
                "unicode \u{e9}",
                "implicit concat",
                "escaped \"quote\"\t",
            ]
        );
    }

    #[test]
    fn test_multiline_call_uses_string_line() {
        let source = "x = _(\n    'spread out'\n)\ny = _('after')\n";
        let messages = extract(source, &options());
        assert_eq!(messages[0].lineno, 2);
        assert_eq!(messages[1].lineno, 4);
    }

    #[test]
    fn test_translator_comments() {
        let source = "\
# L10n: shown on the front page
# keep it short
title = _('Welcome')

# unrelated
other = _('Other')
";
        let messages = extract(source, &options());
        assert_eq!(
            messages[0].comments,
            vec![
                "L10n: shown on the front page".to_string(),
                "keep it short".to_string()
            ]
        );
        assert!(messages[1].comments.is_empty());
    }

    #[test]
    fn test_nested_and_method_calls() {
        let source = "self._(ngettext('a', 'b', n) % {'x': _('inner')})\n";
        assert_eq!(ids(source), vec!["a", "inner"]);
    }

    #[test]
    fn test_definitions_and_lazy_keywords() {
        let source = "def _(text):\n    return text\n\nLABEL = _lazy('Lazy label')\n";
        assert_eq!(ids(source), vec!["Lazy label"]);
    }

    #[test]
    fn test_first_argument_only_for_gettext_alias() {
        let messages = extract("_('  gettext2  test  ', 'context')", &options());
        assert_eq!(messages[0].id.msgid(), "  gettext2  test  ");
        assert_eq!(messages[0].context, None);
    }

    #[test]
    fn test_unterminated_string_does_not_panic() {
        assert!(ids("_('never closed\n_('next')").contains(&"next".to_string()));
    }
}
