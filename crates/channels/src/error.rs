use std::error::Error as StdError;

/// Crate-wide result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed channel errors shared across sinks, delivery, and commands.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A delivery or stream setting failed validation at construction.
    #[error("invalid configuration: {name}: {reason}")]
    InvalidConfig { name: &'static str, reason: String },

    /// The payload contains an unbroken run longer than the message ceiling.
    #[error("message can't be split at a word boundary (len is {length})")]
    UnsplittableMessage { length: usize },

    /// The payload would need more messages than allowed.
    #[error("message is too long and won't be sent (needs {count} messages, max is {max})")]
    TooManyChunks { count: usize, max: usize },

    /// A chunk could not be sent, even after the retry.
    #[error("send failed for chunk {index} after {attempts} attempt(s): {source}")]
    SendFailed {
        index: usize,
        attempts: usize,
        #[source]
        source: Box<Error>,
    },

    /// The destination is gone (connection closed, writer stopped).
    #[error("chat destination unavailable: {message}")]
    Unavailable { message: String },

    /// Wrapped source error from an external dependency.
    #[error("channel operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
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
    pub fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
