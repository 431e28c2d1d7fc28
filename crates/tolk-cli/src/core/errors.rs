//! CLI error types using miette for rustc-style diagnostics.

// Fields in these structs are read by miette's Diagnostic derive macro
#![allow(unused)]

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::path::PathBuf;
use thiserror::Error;
use tolk_extract::ExtractError;
use tolk_toml::TolkConfigError;

/// Error when the tolk.toml configuration file is not found.
#[derive(Debug, Diagnostic, Error)]
#[error("tolk.toml configuration file not found at {}", expected_path.display())]
#[diagnostic(
    code(tolk::config::not_found),
    help(
        "Create a tolk.toml file in your project root, for example:\n\n  \
          text_domain = \"django\"\n\n  \
          [domains.django]\n  \
          methods = [{{ pattern = \"**.py\", extractor = \"python\" }}]\n"
    )
)]
pub struct ConfigNotFoundError {
    /// The path where the config was expected.
    pub expected_path: PathBuf,
}

/// Error when parsing the tolk.toml configuration file.
#[derive(Debug, Diagnostic, Error)]
#[error("failed to parse tolk.toml configuration")]
#[diagnostic(code(tolk::config::parse_error))]
pub struct ConfigParseError {
    /// The source content of the config file.
    #[source_code]
    pub src: NamedSource<String>,

    /// The span where the error occurred.
    #[label("error occurred here")]
    pub span: Option<SourceSpan>,

    /// The underlying parse error message.
    #[help]
    pub help: String,
}

/// Error when a keyword spec or method pattern in tolk.toml is malformed.
#[derive(Debug, Diagnostic, Error)]
#[error("invalid configuration: {message}")]
#[diagnostic(
    code(tolk::config::invalid),
    help("Check the `keywords` list and the method patterns of each domain")
)]
pub struct ConfigInvalidError {
    pub message: String,
}

/// Error when templates must be extracted but no template engine is set up.
#[derive(Debug, Diagnostic, Error)]
#[error("no Jinja2 template engine configuration found")]
#[diagnostic(
    code(tolk::config::template_engine),
    help(
        "Add a [template_engine] table to tolk.toml, or a [[templates]] entry whose \
         backend is jinja2:\n\n  \
          [template_engine]\n  \
          extensions = [\"tolk.ext.i18n\"]\n"
    )
)]
pub struct TemplateEngineNotConfiguredError;

/// Error when a requested domain is not configured.
#[derive(Debug, Diagnostic, Error)]
#[error("domain '{domain}' not found")]
#[diagnostic(code(tolk::config::domain_not_found), help("Available domains: {available}"))]
pub struct DomainNotFoundError {
    /// The domain that was requested.
    pub domain: String,
    /// Comma-separated list of configured domains.
    pub available: String,
}

/// Error when a specified locale doesn't exist.
#[derive(Debug, Diagnostic, Error)]
#[error("locale '{locale}' not found")]
#[diagnostic(code(tolk::merge::locale_not_found), help("Available locales: {available}"))]
pub struct LocaleNotFoundError {
    /// The locale that was specified but not found.
    pub locale: String,
    /// Comma-separated list of available locales.
    pub available: String,
}

/// Error when the extraction output directory doesn't exist.
#[derive(Debug, Diagnostic, Error)]
#[error("output directory not found: {}", path.display())]
#[diagnostic(
    code(tolk::extract::output_dir_not_found),
    help("Create the directory or pass --create")
)]
pub struct OutputDirNotFoundError {
    pub path: PathBuf,
}

/// Error when a required gettext program cannot be found.
#[derive(Debug, Diagnostic, Error)]
#[error("required program '{}' not found", program.display())]
#[diagnostic(
    code(tolk::tools::missing),
    help("Install GNU gettext, or point [tools].{tool} in tolk.toml at the {tool} executable")
)]
pub struct MissingToolError {
    /// The tool's default program name.
    pub tool: String,
    /// The program that was looked up.
    pub program: PathBuf,
}

/// A standalone domain whose template has not been extracted.
#[derive(Debug, Diagnostic, Error)]
#[error("template for domain '{domain}' not found: {}", path.display())]
#[diagnostic(code(tolk::merge::template_not_found))]
pub struct TemplateNotFoundError {
    pub domain: String,
    pub path: PathBuf,
}

/// Every missing template, reported before any catalog is touched.
#[derive(Debug, Diagnostic, Error)]
#[error("{} template(s) missing", missing.len())]
#[diagnostic(
    code(tolk::merge::templates_missing),
    help("Run `tolk extract` first to create the templates")
)]
pub struct MissingTemplatesReport {
    #[related]
    pub missing: Vec<TemplateNotFoundError>,
}

/// Error when a template can't be parsed during extraction.
#[derive(Debug, Diagnostic, Error)]
#[error("template syntax error: {message}")]
#[diagnostic(
    code(tolk::extract::template_syntax),
    help("Fix the template, or set `silent = true` in [template_engine] to skip broken templates")
)]
pub struct TemplateSyntaxError {
    /// The template source.
    #[source_code]
    pub src: NamedSource<String>,

    /// The line the parser stopped at.
    #[label("here")]
    pub span: Option<SourceSpan>,

    pub message: String,
}

/// A gettext invocation that could not be spawned or exited unsuccessfully.
#[derive(Debug, Diagnostic, Error)]
#[error("{domain} ({locale}): `{command}` {reason}")]
#[diagnostic(code(tolk::tools::failed))]
pub struct ToolFailedError {
    pub domain: String,
    pub locale: String,
    /// The full command line.
    pub command: String,
    /// `failed to start: ...` or `exited with ...`.
    pub reason: String,

    /// What the program wrote to stderr, if anything.
    #[help]
    pub stderr: Option<String>,
}

/// Aggregated merge failures, one per failed domain.
#[derive(Debug, Diagnostic, Error)]
#[error("merge failed for {} of {domain_count} domain(s)", failures.len())]
#[diagnostic(code(tolk::merge::report))]
pub struct MergeReport {
    /// Number of domains processed.
    pub domain_count: usize,

    #[related]
    pub failures: Vec<ToolFailedError>,
}

#[derive(Debug, Diagnostic, Error)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    ConfigNotFound(#[from] ConfigNotFoundError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ConfigParse(#[from] ConfigParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ConfigInvalid(#[from] ConfigInvalidError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    TemplateEngineNotConfigured(#[from] TemplateEngineNotConfiguredError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    DomainNotFound(#[from] DomainNotFoundError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    LocaleNotFound(#[from] LocaleNotFoundError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    OutputDirNotFound(#[from] OutputDirNotFoundError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    MissingTool(#[from] MissingToolError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    MissingTemplates(#[from] MissingTemplatesReport),

    #[error(transparent)]
    #[diagnostic(transparent)]
    TemplateSyntax(#[from] TemplateSyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ToolFailed(#[from] ToolFailedError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Merge(#[from] MergeReport),

    #[error(transparent)]
    #[diagnostic(code(tolk::extract))]
    Extract(ExtractError),

    #[error("IO error: {0}")]
    #[diagnostic(code(tolk::io))]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    #[diagnostic(code(tolk::other))]
    Other(String),
}

impl From<TolkConfigError> for CliError {
    fn from(err: TolkConfigError) -> Self {
        match err {
            TolkConfigError::NotFound(expected_path) => {
                ConfigNotFoundError { expected_path }.into()
            },
            TolkConfigError::ReadError(err) => CliError::Io(err),
            TolkConfigError::ParseError {
                path,
                content,
                source,
            } => ConfigParseError {
                src: NamedSource::new(path.display().to_string(), content),
                span: source.span().map(SourceSpan::from),
                help: source.message().to_string(),
            }
            .into(),
            TolkConfigError::Invalid(err) => ConfigInvalidError {
                message: err.to_string(),
            }
            .into(),
            TolkConfigError::UnknownDomain { name, available } => DomainNotFoundError {
                domain: name,
                available: available.join(", "),
            }
            .into(),
            TolkConfigError::TemplateEngineNotConfigured => TemplateEngineNotConfiguredError.into(),
        }
    }
}

impl From<ExtractError> for CliError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::TemplateSyntax {
                path,
                line,
                message,
            } => {
                let source = fs_err::read_to_string(&path).unwrap_or_default();
                let span = line_span(&source, line);
                TemplateSyntaxError {
                    src: NamedSource::new(path.display().to_string(), source),
                    span,
                    message,
                }
                .into()
            },
            ExtractError::InvalidKeyword { .. } | ExtractError::InvalidPattern { .. } => {
                ConfigInvalidError {
                    message: err.to_string(),
                }
                .into()
            },
            other => CliError::Extract(other),
        }
    }
}

/// The span covering a 1-based line of `source`, without its line break.
pub fn line_span(source: &str, line: usize) -> Option<SourceSpan> {
    let mut offset = 0;
    for (i, content) in source.split_inclusive('\n').enumerate() {
        if i + 1 == line {
            let len = content.trim_end_matches(['\n', '\r']).len();
            return Some(SourceSpan::new(offset.into(), len));
        }
        offset += content.len();
    }
    None
}
