#![doc = include_str!("../README.md")]

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tolk_extract::{
    CatalogMetadata, ExtractError, ExtractOptions, ExtractorKind, Keywords, PathPattern,
    TemplateOptions, TransBlockStyle,
};

/// File name of the project configuration.
pub const CONFIG_FILE: &str = "tolk.toml";

#[derive(Debug, Error)]
pub enum TolkConfigError {
    /// Configuration file not found.
    #[error("tolk.toml configuration file not found at '{}'", .0.display())]
    NotFound(PathBuf),
    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] io::Error),
    /// Failed to parse configuration file.
    #[error("Failed to parse configuration file '{}'", path.display())]
    ParseError {
        path: PathBuf,
        /// The file contents, kept for error reporting.
        content: String,
        #[source]
        source: toml::de::Error,
    },
    /// A keyword spec or path pattern is malformed.
    #[error(transparent)]
    Invalid(#[from] ExtractError),
    /// The requested domain has no `[domains.<name>]` table.
    #[error("Domain '{name}' is not configured")]
    UnknownDomain {
        name: String,
        available: Vec<String>,
    },
    /// No Jinja2 template engine configuration could be found.
    #[error("No Jinja2 template engine configuration found")]
    TemplateEngineNotConfigured,
}

/// An entry of the `languages` list: either a bare code or a
/// `[code, display name]` pair.
///
/// ```toml
/// languages = ["de", ["en-US", "English (US)"]]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum LanguageEntry {
    Code(String),
    Named(String, String),
}

impl LanguageEntry {
    pub fn code(&self) -> &str {
        match self {
            LanguageEntry::Code(code) | LanguageEntry::Named(code, _) => code,
        }
    }

    /// Name of the locale directory for this language (`en-US` becomes
    /// `en_US`).
    pub fn locale_dir_name(&self) -> String {
        self.code().replace('-', "_")
    }
}

/// One `pattern -> extractor` rule of a domain.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct MethodConfig {
    pub pattern: String,
    pub extractor: ExtractorKind,
}

/// A `[domains.<name>]` table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DomainConfig {
    #[serde(default)]
    pub methods: Vec<MethodConfig>,
}

impl DomainConfig {
    /// Whether any rule uses the template extractor.
    pub fn uses_templates(&self) -> bool {
        self.methods
            .iter()
            .any(|method| method.extractor == ExtractorKind::Jinja2)
    }

    pub fn method_map(&self) -> Result<Vec<(PathPattern, ExtractorKind)>, TolkConfigError> {
        self.methods
            .iter()
            .map(|method| Ok((PathPattern::new(&method.pattern)?, method.extractor)))
            .collect()
    }
}

/// Template engine settings used for trans-block extraction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TemplateEngineConfig {
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub silent: bool,
    #[serde(default)]
    pub trimmed: bool,
}

impl TemplateEngineConfig {
    pub fn style(&self) -> TransBlockStyle {
        TransBlockStyle::from_extensions(&self.extensions)
    }

    pub fn template_options(&self) -> TemplateOptions {
        TemplateOptions {
            parser: self.style().parser(),
            trimmed: self.trimmed,
            silent: self.silent,
        }
    }
}

/// A host template backend, introspected when no `[template_engine]` is set.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TemplateBackend {
    pub backend: String,
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl TemplateBackend {
    /// Matches `jinja2` and dotted paths ending in `Jinja2`.
    pub fn is_jinja2(&self) -> bool {
        self.backend
            .rsplit('.')
            .next()
            .is_some_and(|last| last.eq_ignore_ascii_case("jinja2"))
    }
}

/// Program overrides for the gettext tools.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolsConfig {
    pub msginit: Option<PathBuf>,
    pub msgmerge: Option<PathBuf>,
    pub msgcat: Option<PathBuf>,
    pub msgen: Option<PathBuf>,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_locale_dir() -> PathBuf {
    PathBuf::from("locale")
}

fn default_text_domain() -> String {
    "django".to_string()
}

fn default_comment_tags() -> Vec<String> {
    ["L10n:", "L10N:", "l10n:", "l10N:"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_source_locales() -> Vec<String> {
    vec!["en_US".to_string()]
}

fn default_project() -> String {
    "PROJECT".to_string()
}

fn default_version() -> String {
    "VERSION".to_string()
}

/// The configuration for `tolk`, read from `tolk.toml`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TolkConfig {
    /// Root of the extraction walk, relative to the configuration file.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// Directory holding `<locale>/LC_MESSAGES`, relative to `base_dir`.
    #[serde(default = "default_locale_dir")]
    pub locale_dir: PathBuf,
    /// Name of the combined template.
    #[serde(default = "default_text_domain")]
    pub text_domain: String,
    /// Domains merged into their own `.po` files. Defaults to
    /// `[text_domain]`.
    #[serde(default)]
    pub standalone_domains: Option<Vec<String>>,
    /// Keyword specs. Defaults to [`Keywords::DEFAULT_SPECS`].
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default = "default_comment_tags")]
    pub comment_tags: Vec<String>,
    #[serde(default)]
    pub languages: Vec<LanguageEntry>,
    /// Locales whose translations are the source strings themselves.
    #[serde(default = "default_source_locales")]
    pub source_locales: Vec<String>,
    #[serde(default = "default_project")]
    pub project: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub msgid_bugs_address: String,
    #[serde(default)]
    pub domains: IndexMap<String, DomainConfig>,
    #[serde(default)]
    pub template_engine: Option<TemplateEngineConfig>,
    #[serde(default)]
    pub templates: Vec<TemplateBackend>,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl TolkConfig {
    /// Reads the configuration from a path.
    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, TolkConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(TolkConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs_err::read_to_string(path)?;

        toml::from_str(&content).map_err(|source| TolkConfigError::ParseError {
            path: path.to_path_buf(),
            content,
            source,
        })
    }

    /// Reads `tolk.toml` from a project directory.
    pub fn from_dir(dir: &Path) -> Result<Self, TolkConfigError> {
        Self::read_from_path(dir.join(CONFIG_FILE))
    }

    /// Extraction root, resolved against the configuration directory.
    pub fn base_dir_from(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.base_dir).components().collect()
    }

    /// Locale directory, resolved against the configuration directory.
    pub fn locale_dir_from(&self, config_dir: &Path) -> PathBuf {
        self.base_dir_from(config_dir)
            .join(&self.locale_dir)
            .components()
            .collect()
    }

    /// Where catalog templates live: `<locale_dir>/templates/LC_MESSAGES`.
    pub fn templates_dir_from(&self, config_dir: &Path) -> PathBuf {
        self.locale_dir_from(config_dir)
            .join("templates")
            .join("LC_MESSAGES")
    }

    pub fn standalone_domains(&self) -> Vec<String> {
        self.standalone_domains
            .clone()
            .unwrap_or_else(|| vec![self.text_domain.clone()])
    }

    pub fn is_standalone(&self, domain: &str) -> bool {
        self.standalone_domains().iter().any(|d| d == domain)
    }

    pub fn keywords(&self) -> Result<Keywords, TolkConfigError> {
        match &self.keywords {
            Some(specs) => Ok(Keywords::parse(specs)?),
            None => Ok(Keywords::default()),
        }
    }

    pub fn domain_names(&self) -> Vec<String> {
        self.domains.keys().cloned().collect()
    }

    pub fn domain(&self, name: &str) -> Result<&DomainConfig, TolkConfigError> {
        self.domains
            .get(name)
            .ok_or_else(|| TolkConfigError::UnknownDomain {
                name: name.to_string(),
                available: self.domain_names(),
            })
    }

    /// Resolve the template engine settings: the explicit
    /// `[template_engine]` table, else the first Jinja2 `[[templates]]`
    /// backend.
    pub fn template_engine(&self) -> Result<TemplateEngineConfig, TolkConfigError> {
        if let Some(engine) = &self.template_engine {
            return Ok(engine.clone());
        }

        self.templates
            .iter()
            .find(|backend| backend.is_jinja2())
            .map(|backend| TemplateEngineConfig {
                extensions: backend.extensions.clone(),
                silent: false,
                trimmed: false,
            })
            .ok_or(TolkConfigError::TemplateEngineNotConfigured)
    }

    /// Options for the extractors. The template engine is only resolved
    /// when `needs_templates` is set.
    pub fn extract_options(&self, needs_templates: bool) -> Result<ExtractOptions, TolkConfigError> {
        let template = if needs_templates {
            self.template_engine()?.template_options()
        } else {
            TemplateOptions::default()
        };

        Ok(ExtractOptions {
            keywords: self.keywords()?,
            comment_tags: self.comment_tags.clone(),
            template,
        })
    }

    /// Header metadata for new catalog templates, stamped now.
    pub fn catalog_metadata(&self) -> CatalogMetadata {
        CatalogMetadata::new(&self.project, &self.version, &self.msgid_bugs_address)
    }

    pub fn is_source_locale(&self, locale: &str) -> bool {
        self.source_locales.iter().any(|l| l == locale)
    }
}
