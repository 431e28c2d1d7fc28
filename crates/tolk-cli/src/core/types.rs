use crate::core::CliError;
use std::path::{Path, PathBuf};
use tolk_toml::TolkConfig;

/// Directory name under the locale directory holding extracted templates.
pub const TEMPLATES_DIR: &str = "templates";

/// Directory name under the locale directory holding compendium files.
pub const COMPENDIA_DIR: &str = "compendia";

/// A loaded `tolk.toml` together with the directory it was read from.
#[derive(Clone, Debug)]
pub struct Project {
    /// The directory containing `tolk.toml`.
    pub root: PathBuf,
    pub config: TolkConfig,
}

impl Project {
    /// Load the project rooted at `path` (defaults to the current directory).
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let root = path.map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let config = TolkConfig::from_dir(&root)?;
        tracing::debug!("Loaded configuration from {}", root.display());
        Ok(Self { root, config })
    }

    pub fn base_dir(&self) -> PathBuf {
        self.config.base_dir_from(&self.root)
    }

    pub fn locale_dir(&self) -> PathBuf {
        self.config.locale_dir_from(&self.root)
    }

    /// `<locale_dir>/templates/LC_MESSAGES`.
    pub fn templates_dir(&self) -> PathBuf {
        self.config.templates_dir_from(&self.root)
    }

    /// The extracted template of a domain.
    pub fn template_path(&self, domain: &str) -> PathBuf {
        self.templates_dir().join(format!("{domain}.pot"))
    }

    /// The catalog of a domain in a locale.
    pub fn catalog_path(&self, locale: &str, domain: &str) -> PathBuf {
        self.locale_dir()
            .join(locale)
            .join("LC_MESSAGES")
            .join(format!("{domain}.po"))
    }

    /// The compendium consulted when merging a locale.
    pub fn compendium_path(&self, locale: &str) -> PathBuf {
        self.locale_dir()
            .join(COMPENDIA_DIR)
            .join(format!("{locale}.compendium"))
    }
}

/// Result of extracting one domain.
#[derive(Clone, Debug)]
pub struct ExtractedDomain {
    pub domain: String,
    /// The template written for the domain.
    pub path: PathBuf,
    pub message_count: usize,
}

/// Counts of what `merge` did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Catalogs created with `msginit`.
    pub initialized: usize,
    /// Catalogs updated with `msgmerge`.
    pub merged: usize,
}
