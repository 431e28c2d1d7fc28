pub mod javascript;
pub mod jinja;
pub mod python;
mod tokens;

use crate::catalog::MessageId;
use crate::keywords::Keywords;
use crate::trans::{TransBlockParser, TransBlockStyle};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The extractors a path pattern can be mapped to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    Python,
    JavaScript,
    Jinja2,
    /// Matching files are skipped.
    Ignore,
}

impl ExtractorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractorKind::Python => "python",
            ExtractorKind::JavaScript => "javascript",
            ExtractorKind::Jinja2 => "jinja2",
            ExtractorKind::Ignore => "ignore",
        }
    }

    /// Run the extractor over one file's contents.
    pub fn extract(
        self,
        source: &str,
        options: &ExtractOptions,
    ) -> Result<Vec<ExtractedMessage>, TemplateSyntaxError> {
        match self {
            ExtractorKind::Python => Ok(python::extract(source, options)),
            ExtractorKind::JavaScript => Ok(javascript::extract(source, options)),
            ExtractorKind::Jinja2 => jinja::extract(source, options),
            ExtractorKind::Ignore => Ok(Vec::new()),
        }
    }
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message found in a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedMessage {
    pub lineno: usize,
    /// The keyword (or `gettext`/`ngettext` for trans blocks) that produced it.
    pub funcname: String,
    pub id: MessageId,
    pub context: Option<String>,
    /// Translator comments.
    pub comments: Vec<String>,
}

/// A template that could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateSyntaxError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for TemplateSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Template engine settings used by the template extractor.
#[derive(Clone, Copy)]
pub struct TemplateOptions {
    /// Strategy applied to the text of trans blocks.
    pub parser: &'static dyn TransBlockParser,
    /// Default for blocks without an explicit `trimmed`/`notrimmed` modifier.
    pub trimmed: bool,
    /// Log syntax errors and skip the file instead of failing.
    pub silent: bool,
}

impl TemplateOptions {
    pub fn new(style: TransBlockStyle) -> Self {
        Self {
            parser: style.parser(),
            trimmed: false,
            silent: false,
        }
    }
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self::new(TransBlockStyle::default())
    }
}

impl fmt::Debug for TemplateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateOptions")
            .field("parser", &self.parser.name())
            .field("trimmed", &self.trimmed)
            .field("silent", &self.silent)
            .finish()
    }
}

/// Settings shared by every extractor.
#[derive(Clone, Debug, Default)]
pub struct ExtractOptions {
    pub keywords: Keywords,
    pub comment_tags: Vec<String>,
    pub template: TemplateOptions,
}
