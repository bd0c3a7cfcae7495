use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file to dump does not exist.
    #[error("source file not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("invalid configuration: {name}: {reason}")]
    InvalidConfig { name: &'static str, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Delivery(#[from] chattext_channels::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_config(name: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidConfig {
            name,
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
