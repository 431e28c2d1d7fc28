//! Extraction from Jinja2-style templates.
//!
//! Keyword calls inside `{{ ... }}` and `{% ... %}` are scanned with the
//! Python call rules. `{% trans %}` blocks are turned into message ids by the
//! [`TransBlockParser`](crate::trans::TransBlockParser) carried in
//! [`TemplateOptions`](super::TemplateOptions).

use super::tokens::TokenKind;
use super::{ExtractOptions, ExtractedMessage, TemplateSyntaxError, python};
use crate::catalog::MessageId;
use crate::trans::{TransBlock, TransPart};
use regex::Regex;
use std::sync::LazyLock;

static ENDRAW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{%[-+]?\s*endraw\s*[-+]?%\}").unwrap());

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

#[derive(Clone, Debug, PartialEq, Eq)]
enum Node {
    Data(String),
    /// `{{ ... }}`
    Expr(String),
    /// `{% ... %}`
    Tag(String),
    /// `{# ... #}`
    Comment(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Spanned {
    node: Node,
    line: usize,
}

fn error(line: usize, message: impl Into<String>) -> TemplateSyntaxError {
    TemplateSyntaxError {
        line,
        message: message.into(),
    }
}

/// Find the closing delimiter of a tag or expression, skipping over string
/// literals inside it.
fn find_close(source: &str, from: usize, close: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            },
            _ if bytes[i..].starts_with(close.as_bytes()) => return Some(i),
            _ => {},
        }
        i += 1;
    }
    None
}

fn newlines(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count()
}

/// Split a template into data, expressions, tags and comments, applying
/// whitespace control markers and `{% raw %}` sections.
fn lex(source: &str) -> Result<Vec<Spanned>, TemplateSyntaxError> {
    let bytes = source.as_bytes();
    let mut nodes: Vec<Spanned> = Vec::new();
    let mut pos = 0;
    let mut line = 1;

    loop {
        let open = (pos..bytes.len().saturating_sub(1))
            .find(|&i| bytes[i] == b'{' && matches!(bytes[i + 1], b'{' | b'%' | b'#'));

        let Some(start) = open else {
            if pos < source.len() {
                nodes.push(Spanned {
                    node: Node::Data(source[pos..].to_string()),
                    line,
                });
            }
            return Ok(nodes);
        };

        if start > pos {
            let text = &source[pos..start];
            nodes.push(Spanned {
                node: Node::Data(text.to_string()),
                line,
            });
            line += newlines(text);
        }

        let kind = bytes[start + 1];
        let close = match kind {
            b'{' => "}}",
            b'%' => "%}",
            _ => "#}",
        };

        let mut inner_start = start + 2;
        if matches!(bytes.get(inner_start), Some(b'-' | b'+')) {
            if bytes[inner_start] == b'-' {
                if let Some(Spanned {
                    node: Node::Data(text),
                    ..
                }) = nodes.last_mut()
                {
                    let trimmed_len = text.trim_end().len();
                    text.truncate(trimmed_len);
                }
            }
            inner_start += 1;
        }

        let found = if kind == b'#' {
            source[inner_start..].find(close).map(|i| i + inner_start)
        } else {
            find_close(source, inner_start, close)
        };
        let Some(close_at) = found else {
            let what = match kind {
                b'{' => "expression",
                b'%' => "tag",
                _ => "comment",
            };
            return Err(error(line, format!("unexpected end of template, unclosed {what}")));
        };

        let mut inner_end = close_at;
        let mut strip_after = false;
        if inner_end > inner_start && matches!(bytes[inner_end - 1], b'-' | b'+') {
            strip_after = bytes[inner_end - 1] == b'-';
            inner_end -= 1;
        }
        let inner = source[inner_start..inner_end].to_string();
        let tag_line = line;
        line += newlines(&source[start..close_at]);
        pos = close_at + close.len();

        if strip_after {
            let rest = &source[pos..];
            let skipped = rest.len() - rest.trim_start().len();
            line += newlines(&rest[..skipped]);
            pos += skipped;
        }

        let node = match kind {
            b'{' => Node::Expr(inner),
            b'%' => Node::Tag(inner),
            _ => Node::Comment(inner),
        };

        let is_raw = matches!(&node, Node::Tag(inner) if inner.trim() == "raw");
        if is_raw {
            let Some(end) = ENDRAW_RE.find(&source[pos..]) else {
                return Err(error(tag_line, "missing endraw for raw block"));
            };
            let text = &source[pos..pos + end.start()];
            if !text.is_empty() {
                nodes.push(Spanned {
                    node: Node::Data(text.to_string()),
                    line,
                });
            }
            line += newlines(&source[pos..pos + end.end()]);
            pos += end.end();
            continue;
        }

        nodes.push(Spanned {
            node,
            line: tag_line,
        });
    }
}

/// First word of a tag and the rest of it.
fn split_tag(inner: &str) -> (&str, &str) {
    let inner = inner.trim();
    match inner.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim_start()),
        None => (inner, ""),
    }
}

struct Extractor<'a> {
    options: &'a ExtractOptions,
    nodes: Vec<Spanned>,
    messages: Vec<ExtractedMessage>,
    pending_comment: Option<String>,
}

impl Extractor<'_> {
    fn push(&mut self, mut message: ExtractedMessage) {
        if let Some(comment) = self.pending_comment.take() {
            message.comments.insert(0, comment);
        }
        self.messages.push(message);
    }

    fn scan_expression(&mut self, source: &str, line: usize) {
        let tokens = python::tokenize(source, line);
        for message in python::scan(&tokens, self.options) {
            self.push(message);
        }
    }

    fn comment(&mut self, text: &str) {
        let text = text.trim();
        let Some((prefix, comment)) = text.split_once(char::is_whitespace) else {
            return;
        };
        if self.options.comment_tags.iter().any(|tag| tag == prefix) {
            self.pending_comment = Some(comment.trim().to_string());
        }
    }

    fn run(mut self) -> Result<Vec<ExtractedMessage>, TemplateSyntaxError> {
        let mut i = 0;
        while i < self.nodes.len() {
            let Spanned { node, line } = self.nodes[i].clone();
            i += 1;
            match node {
                Node::Data(_) => {},
                Node::Comment(text) => self.comment(&text),
                Node::Expr(source) => self.scan_expression(&source, line),
                Node::Tag(source) => match split_tag(&source) {
                    ("trans", args) => i = self.trans(args, line, i)?,
                    (name @ ("pluralize" | "endtrans"), _) => {
                        return Err(error(line, format!("unexpected '{name}' outside of a trans block")));
                    },
                    _ => self.scan_expression(&source, line),
                },
            }
        }
        Ok(self.messages)
    }

    /// Parse a trans block whose opening tag has been read. Returns the index
    /// of the node after `{% endtrans %}`.
    fn trans(&mut self, args: &str, line: usize, mut i: usize) -> Result<usize, TemplateSyntaxError> {
        let tokens = python::tokenize(args, line);

        let mut context = None;
        let mut trimmed = self.options.template.trimmed;
        let mut depth = 0usize;
        for (idx, token) in tokens.iter().enumerate() {
            match &token.kind {
                TokenKind::Str(Some(value)) if idx == 0 => context = Some(value.clone()),
                TokenKind::Punct('(' | '[' | '{') => depth += 1,
                TokenKind::Punct(')' | ']' | '}') => depth = depth.saturating_sub(1),
                TokenKind::Name(word) if depth == 0 => {
                    let assigned = matches!(tokens.get(idx + 1).map(|t| &t.kind), Some(TokenKind::Punct('=')));
                    match word.as_str() {
                        "trimmed" if !assigned => trimmed = true,
                        "notrimmed" if !assigned => trimmed = false,
                        _ => {},
                    }
                },
                _ => {},
            }
        }
        let nested = python::scan(&tokens, self.options);

        let mut singular = Vec::new();
        let mut plural: Option<Vec<TransPart>> = None;

        loop {
            let Some(Spanned { node, line: node_line }) = self.nodes.get(i).cloned() else {
                return Err(error(line, "unclosed trans block, expected 'endtrans'"));
            };
            i += 1;
            let target = plural.as_mut().unwrap_or(&mut singular);
            match node {
                Node::Data(text) => target.push(TransPart::Text(text)),
                Node::Comment(_) => {},
                Node::Expr(expr) => {
                    let name = expr.trim();
                    if !NAME_RE.is_match(name) {
                        return Err(error(
                            node_line,
                            format!("only simple names are allowed in trans blocks, got '{name}'"),
                        ));
                    }
                    target.push(TransPart::Variable(name.to_string()));
                },
                Node::Tag(tag) => match split_tag(&tag).0 {
                    "pluralize" if plural.is_none() => plural = Some(Vec::new()),
                    "pluralize" => {
                        return Err(error(node_line, "a trans block can only pluralize once"));
                    },
                    "endtrans" => break,
                    name => {
                        return Err(error(
                            node_line,
                            format!(
                                "control structures in translatable sections are not allowed, saw '{name}'"
                            ),
                        ));
                    },
                },
            }
        }

        let block = TransBlock::build(
            &singular,
            plural.as_deref(),
            self.options.template.parser,
            trimmed,
        );
        let funcname = match (&block.plural, &context) {
            (Some(_), Some(_)) => "npgettext",
            (Some(_), None) => "ngettext",
            (None, Some(_)) => "pgettext",
            (None, None) => "gettext",
        };
        let id = match block.plural {
            Some(plural) => MessageId::Plural {
                singular: block.singular,
                plural,
            },
            None => MessageId::Singular(block.singular),
        };

        if id.msgid().is_empty() {
            tracing::warn!(line, "empty trans block, skipping");
        } else {
            self.push(ExtractedMessage {
                lineno: line,
                funcname: funcname.to_string(),
                id,
                context,
                comments: Vec::new(),
            });
        }
        for message in nested {
            self.push(message);
        }

        Ok(i)
    }
}

/// Extract messages from a template.
pub fn extract(
    source: &str,
    options: &ExtractOptions,
) -> Result<Vec<ExtractedMessage>, TemplateSyntaxError> {
    let nodes = lex(source)?;
    Extractor {
        options,
        nodes,
        messages: Vec::new(),
        pending_comment: None,
    }
    .run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::TemplateOptions;
    use crate::trans::{TransBlockParser, TransBlockStyle};

    fn options(style: TransBlockStyle) -> ExtractOptions {
        ExtractOptions {
            comment_tags: vec!["L10n:".to_string()],
            template: TemplateOptions::new(style),
            ..Default::default()
        }
    }

    fn collapsing() -> ExtractOptions {
        options(TransBlockStyle::CollapseWhitespace)
    }

    #[test]
    fn test_lex_whitespace_control() {
        let nodes = lex("a  {%- if x -%}\n  b {{- y }} {# c #}").unwrap();
        let kinds: Vec<_> = nodes.into_iter().map(|n| n.node).collect();
        assert_eq!(
            kinds,
            vec![
                Node::Data("a".to_string()),
                Node::Tag(" if x ".to_string()),
                Node::Data("b".to_string()),
                Node::Expr(" y ".to_string()),
                Node::Data(" ".to_string()),
                Node::Comment(" c ".to_string()),
            ]
        );
    }

    #[test]
    fn test_lex_skips_delimiters_in_strings() {
        let nodes = lex("{{ _(\"}} not the end\") }}").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].node, Node::Expr(" _(\"}} not the end\") ".to_string()));
    }

    #[test]
    fn test_calls_in_expressions_and_tags() {
        let source = "\
<p>
{{ _('html string') }}
{% set title = gettext('tag string') %}
{{ ngettext('%(num)s apple', '%(num)s apples', n) }}
";
        let messages = extract(source, &collapsing()).unwrap();
        let found: Vec<_> = messages
            .iter()
            .map(|m| (m.lineno, m.id.msgid().to_string()))
            .collect();
        assert_eq!(
            found,
            vec![
                (2, "html string".to_string()),
                (3, "tag string".to_string()),
                (4, "%(num)s apple".to_string()),
            ]
        );
    }

    #[test]
    fn test_collapsing_trans_block() {
        let source = "<div>\n{% trans %}\n    html trans block\n{% endtrans %}\n</div>\n";
        let messages = extract(source, &collapsing()).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].lineno, 2);
        assert_eq!(messages[0].funcname, "gettext");
        assert_eq!(messages[0].id, MessageId::Singular("html trans block".to_string()));
    }

    #[test]
    fn test_verbatim_trans_block() {
        let source = "{% trans %}\n    html trans block\n{% endtrans %}";
        let messages = extract(source, &options(TransBlockStyle::Verbatim)).unwrap();
        assert_eq!(messages[0].id.msgid(), "\n    html trans block\n");
    }

    #[test]
    fn test_trimmed_modifier() {
        let source = "{% trans trimmed %}\n  a\n  b\n{% endtrans %}";
        let messages = extract(source, &options(TransBlockStyle::Verbatim)).unwrap();
        assert_eq!(messages[0].id.msgid(), "a b");
    }

    #[test]
    fn test_plural_trans_block() {
        let source = "\
{% trans num=n %}
  There is {{ num }} thing.
{% pluralize %}
  There are {{ num }} things.
{% endtrans %}";
        let messages = extract(source, &collapsing()).unwrap();
        assert_eq!(messages[0].funcname, "ngettext");
        assert_eq!(
            messages[0].id,
            MessageId::Plural {
                singular: "There is %(num)s thing.".to_string(),
                plural: "There are %(num)s things.".to_string(),
            }
        );
    }

    #[test]
    fn test_trans_context_and_nested_calls() {
        let source = "{% trans \"greeting\" user=_('guest') %}Hello {{ user }}{% endtrans %}";
        let messages = extract(source, &collapsing()).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].context.as_deref(), Some("greeting"));
        assert_eq!(messages[0].id.msgid(), "Hello %(user)s");
        assert_eq!(messages[0].funcname, "pgettext");
        assert_eq!(messages[1].id.msgid(), "guest");
    }

    #[test]
    fn test_template_comments() {
        let source = "\
{# L10n: page title #}
<h1>{{ _('Welcome') }}</h1>
{# unrelated #}
{{ _('Plain') }}";
        let messages = extract(source, &collapsing()).unwrap();
        assert_eq!(messages[0].comments, vec!["page title".to_string()]);
        assert!(messages[1].comments.is_empty());
    }

    #[test]
    fn test_raw_block_is_not_extracted() {
        let source = "{% raw %}{{ _('hidden') }}{% endraw %}\n{{ _('shown') }}";
        let messages = extract(source, &collapsing()).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id.msgid(), "shown");
        assert_eq!(messages[0].lineno, 2);
    }

    #[test]
    fn test_syntax_errors() {
        let cases = [
            ("{% trans %}{% if x %}{% endif %}{% endtrans %}", 1),
            ("{% trans %}{{ user.name }}{% endtrans %}", 1),
            ("\n{% trans %}never closed", 2),
            ("{{ _('x') ", 1),
            ("{% endtrans %}", 1),
        ];
        for (source, line) in cases {
            let err = extract(source, &collapsing()).unwrap_err();
            assert_eq!(err.line, line, "{source}");
        }
    }

    #[test]
    fn test_non_ascii_inside_delimiters() {
        let source = "{{ größe }}\n{% set ü = 'café' %}\n{{ _('ok') }}";
        let messages = extract(source, &collapsing()).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id.msgid(), "ok");
        assert_eq!(messages[0].lineno, 3);

        let err = extract("{{ 'naïve }}\nsmörgåsbord", &collapsing()).unwrap_err();
        assert_eq!(err.line, 1);
    }

    struct Shouting;

    impl TransBlockParser for Shouting {
        fn name(&self) -> &'static str {
            "shouting"
        }

        fn normalize(&self, buffer: &str) -> String {
            buffer.trim().to_uppercase()
        }
    }

    static SHOUTING: Shouting = Shouting;

    #[test]
    fn test_injected_parser() {
        let mut options = collapsing();
        options.template.parser = &SHOUTING;
        let messages = extract("{% trans %} quiet {% endtrans %}", &options).unwrap();
        assert_eq!(messages[0].id.msgid(), "QUIET");
    }
}
