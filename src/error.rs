use std::path::PathBuf;
use thiserror::Error;

pub type ImportResult<T> = Result<T, ImportError>;

/// Failures surfaced by a conversion run. None of them are retried.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("remote service rejected the API key (HTTP {status}): {body}")]
    Authentication { status: u16, body: String },

    #[error("GET {url} failed with HTTP {status}: {body}")]
    Fetch { url: String, status: u16, body: String },

    #[error("GET {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("could not set up the HTTP client: {0}")]
    ClientSetup(String),

    #[error("{url}: unrecognized image header {header:02X?}")]
    UnrecognizedFormat { url: String, header: Vec<u8> },

    #[error("malformed map data: {0}")]
    MalformedMapData(String),

    #[error("cache index {}: {message}", path.display())]
    CachePersistence { path: PathBuf, message: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("grid has {actual} cells but its geometry needs {expected}")]
    GridMismatch { expected: usize, actual: usize },
}

impl ImportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ImportError::Io { path: path.into(), source }
    }

    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        ImportError::Image { path: path.into(), source }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        ImportError::MalformedMapData(message.into())
    }
}
