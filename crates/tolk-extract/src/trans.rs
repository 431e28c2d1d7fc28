//! Strategies for turning the body of a `{% trans %}` block into a message id.
//!
//! The template extractor never hard-codes how block text is normalized. It
//! is handed a [`TransBlockParser`] chosen from the template-engine
//! configuration, and the same strategy builds the lookup key at render time
//! through [`TransBlock::render`].

use crate::whitespace::collapse_whitespace;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Post-processing applied to the raw text buffer of a trans block.
pub trait TransBlockParser: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Normalize the buffer collected between `{% trans %}` and the next
    /// `{% pluralize %}` or `{% endtrans %}` tag.
    fn normalize(&self, buffer: &str) -> String;
}

/// Collapses all whitespace in the block so indentation never leaks into
/// message ids.
#[derive(Clone, Copy, Debug, Default)]
pub struct CollapseWhitespace;

impl TransBlockParser for CollapseWhitespace {
    fn name(&self) -> &'static str {
        "collapse-whitespace"
    }

    fn normalize(&self, buffer: &str) -> String {
        collapse_whitespace(buffer)
    }
}

/// Keeps the block text exactly as written, like the stock i18n extension.
#[derive(Clone, Copy, Debug, Default)]
pub struct Verbatim;

impl TransBlockParser for Verbatim {
    fn name(&self) -> &'static str {
        "verbatim"
    }

    fn normalize(&self, buffer: &str) -> String {
        buffer.to_string()
    }
}

/// The closed set of trans-block strategies a configuration can select.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransBlockStyle {
    #[default]
    CollapseWhitespace,
    Verbatim,
}

impl TransBlockStyle {
    /// Extension id of the whitespace collapsing i18n extension.
    pub const COLLAPSING_EXTENSION: &'static str = "tolk.ext.i18n";

    /// Pick the strategy matching a template engine's extension list.
    pub fn from_extensions<S: AsRef<str>>(extensions: &[S]) -> Self {
        if extensions
            .iter()
            .any(|ext| ext.as_ref() == Self::COLLAPSING_EXTENSION)
        {
            TransBlockStyle::CollapseWhitespace
        } else {
            TransBlockStyle::Verbatim
        }
    }

    pub fn parser(self) -> &'static dyn TransBlockParser {
        match self {
            TransBlockStyle::CollapseWhitespace => &CollapseWhitespace,
            TransBlockStyle::Verbatim => &Verbatim,
        }
    }
}

/// A piece of a trans block body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransPart {
    /// Literal template data.
    Text(String),
    /// A `{{ name }}` placeholder.
    Variable(String),
}

/// Message ids built from one `{% trans %}` block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransBlock {
    pub singular: String,
    pub plural: Option<String>,
    /// Names referenced by `{{ name }}` placeholders, in first-use order.
    pub variables: Vec<String>,
}

static TRIM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\n\s*").unwrap());

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\(([A-Za-z_][A-Za-z0-9_]*)\)s|%%").unwrap());

impl TransBlock {
    /// Build the ids for a block.
    ///
    /// `trimmed` applies the template engine's own `trimmed` policy after the
    /// strategy has run.
    pub fn build(
        singular: &[TransPart],
        plural: Option<&[TransPart]>,
        parser: &dyn TransBlockParser,
        trimmed: bool,
    ) -> Self {
        let mut variables = Vec::new();
        let singular = Self::buffer(singular, &mut variables);
        let plural = plural.map(|parts| Self::buffer(parts, &mut variables));

        let finish = |buffer: String| {
            let mut text = parser.normalize(&buffer);
            if trimmed {
                text = TRIM_RE.replace_all(text.trim(), " ").into_owned();
            }
            text
        };

        let mut singular = finish(singular);
        let mut plural = plural.map(finish);

        if variables.is_empty() {
            singular = singular.replace("%%", "%");
            plural = plural.map(|p| p.replace("%%", "%"));
        }

        Self {
            singular,
            plural,
            variables,
        }
    }

    fn buffer(parts: &[TransPart], variables: &mut Vec<String>) -> String {
        let mut buf = String::new();
        for part in parts {
            match part {
                TransPart::Text(text) => buf.push_str(&text.replace('%', "%%")),
                TransPart::Variable(name) => {
                    buf.push_str("%(");
                    buf.push_str(name);
                    buf.push_str(")s");
                    if !variables.contains(name) {
                        variables.push(name.clone());
                    }
                },
            }
        }
        buf
    }

    /// Render the block the way the template engine does at runtime.
    ///
    /// `translate` receives the singular id, the plural id and the count, and
    /// returns the translated format string if the catalog has one. Without a
    /// translation the source ids are used with the English plural rule.
    pub fn render<F>(&self, count: u64, values: &[(&str, &str)], translate: F) -> String
    where
        F: Fn(&str, Option<&str>, u64) -> Option<String>,
    {
        let template = translate(&self.singular, self.plural.as_deref(), count).unwrap_or_else(
            || match &self.plural {
                Some(plural) if count != 1 => plural.clone(),
                _ => self.singular.clone(),
            },
        );

        if self.variables.is_empty() {
            return template;
        }

        PLACEHOLDER_RE
            .replace_all(&template, |caps: &regex::Captures<'_>| match caps.get(1) {
                Some(name) => values
                    .iter()
                    .find(|(key, _)| *key == name.as_str())
                    .map(|(_, value)| (*value).to_string())
                    .unwrap_or_default(),
                None => "%".to_string(),
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> TransPart {
        TransPart::Text(s.to_string())
    }

    fn var(s: &str) -> TransPart {
        TransPart::Variable(s.to_string())
    }

    #[test]
    fn test_style_from_extensions() {
        assert_eq!(
            TransBlockStyle::from_extensions(&["jinja2.ext.autoescape", "tolk.ext.i18n"]),
            TransBlockStyle::CollapseWhitespace
        );
        assert_eq!(
            TransBlockStyle::from_extensions(&["jinja2.ext.i18n"]),
            TransBlockStyle::Verbatim
        );
        let none: [&str; 0] = [];
        assert_eq!(
            TransBlockStyle::from_extensions(&none),
            TransBlockStyle::Verbatim
        );
    }

    #[test]
    fn test_collapsing_block() {
        let block = TransBlock::build(
            &[text("\n    Bridges\n    rule!\n  ")],
            None,
            &CollapseWhitespace,
            false,
        );
        assert_eq!(block.singular, "Bridges rule!");
        assert_eq!(block.plural, None);
        assert!(block.variables.is_empty());
    }

    #[test]
    fn test_verbatim_block_keeps_indentation() {
        let block = TransBlock::build(&[text("\n    html trans\n")], None, &Verbatim, false);
        assert_eq!(block.singular, "\n    html trans\n");
    }

    #[test]
    fn test_trimmed_policy_applies_after_strategy() {
        let block = TransBlock::build(&[text("\n  a\n   b  \n")], None, &Verbatim, true);
        assert_eq!(block.singular, "a b");
    }

    #[test]
    fn test_plural_block_with_variables() {
        let block = TransBlock::build(
            &[text("\n    There is "), var("num"), text(" thing.\n")],
            Some(&[text("\n    There are "), var("num"), text(" things.\n")]),
            &CollapseWhitespace,
            false,
        );
        assert_eq!(block.singular, "There is %(num)s thing.");
        assert_eq!(block.plural.as_deref(), Some("There are %(num)s things."));
        assert_eq!(block.variables, vec!["num".to_string()]);
    }

    #[test]
    fn test_percent_escaping_depends_on_variables() {
        let plain = TransBlock::build(&[text("100% sure")], None, &CollapseWhitespace, false);
        assert_eq!(plain.singular, "100% sure");

        let with_var = TransBlock::build(
            &[text("100% sure, "), var("name")],
            None,
            &CollapseWhitespace,
            false,
        );
        assert_eq!(with_var.singular, "100%% sure, %(name)s");
    }

    #[test]
    fn test_render_uses_extracted_key() {
        let block = TransBlock::build(
            &[text("\n  this is a tag <b>"), var("tag"), text("</b>\n")],
            None,
            &CollapseWhitespace,
            false,
        );
        let rendered = block.render(1, &[("tag", "bar")], |id, _, _| {
            (id == "this is a tag <b>%(tag)s</b>").then(|| "c'est <b>%(tag)s</b>".to_string())
        });
        assert_eq!(rendered, "c'est <b>bar</b>");
        assert_eq!(block.singular, "this is a tag <b>%(tag)s</b>");
    }

    #[test]
    fn test_render_plural_fallback() {
        let block = TransBlock::build(
            &[var("count"), text(" bridge spans!")],
            Some(&[var("count"), text(" bridges span!")]),
            &CollapseWhitespace,
            false,
        );
        let none = |_: &str, _: Option<&str>, _: u64| None;
        assert_eq!(block.render(1, &[("count", "1")], none), "1 bridge spans!");
        assert_eq!(block.render(2, &[("count", "2")], none), "2 bridges span!");
    }
}
