use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while extracting messages or writing catalogs.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid keyword spec '{spec}': {reason}")]
    InvalidKeyword { spec: String, reason: String },

    #[error("invalid path pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("{}:{line}: {message}", path.display())]
    TemplateSyntax {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("failed to write catalog")]
    Write(#[from] std::io::Error),
}
