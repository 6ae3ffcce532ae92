use std::path::PathBuf;
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("font provider `{provider}` failed: {message}")]
    Provider { provider: String, message: String },

    #[error("failed to fetch font `{url}`: {message}")]
    Fetch { url: String, message: String },

    #[error("font cache I/O error at {}: {source}", path.display())]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("font cache JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSS minification failed: {message}")]
    Minify { message: String },

    #[error("invalid font options: {message}")]
    InvalidOptions { message: String },

    /// A failure observed through a de-duplicated in-flight operation.
    #[error(transparent)]
    Shared(#[from] Arc<Error>),
}

impl Error {
    pub(crate) fn cache_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheIo {
            path: path.into(),
            source,
        }
    }
}
