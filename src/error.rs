// Error kinds shared by every library module. The controller renders each
// variant as a single status line, so the Display strings are user-facing.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("API key required!")]
    MissingApiKey,

    #[error("Provide a handshake file.")]
    MissingFile,

    /// Carries the offending extension, empty when the file has none.
    #[error("Unsupported file extension: {}", extension_label(.0))]
    UnsupportedExtension(String),

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("No hash found in {}", .0.display())]
    NoHashFound(PathBuf),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Malformed response: {0}")]
    Parse(String),

    /// The service answered `success: false`.
    #[error("{0}")]
    ApiLogic(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config error: {0}")]
    Config(String),
}

fn extension_label(ext: &str) -> &str {
    if ext.is_empty() {
        "(none)"
    } else {
        ext
    }
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
