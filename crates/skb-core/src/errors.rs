use std::time::Duration;

/// Core error type for the bridge.
///
/// Adapter crates map their specific errors into this type so the supervisor
/// can tell fatal failures (identity, credentials) from per-message ones.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("external error: {0}")]
    External(String),

    #[error("while testing the ability to do auth request: {0}")]
    Identity(String),

    #[error("invalid credentials")]
    InvalidAuth,

    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("while reading Slack response: empty response for request {request:?}")]
    EmptyResponse { request: String },

    #[error("{context}: {source}")]
    Transport {
        context: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap `self` with the pipeline stage it failed in.
    pub fn context(self, context: &'static str) -> Self {
        Error::Transport {
            context,
            source: Box::new(self),
        }
    }

    /// Errors that must stop the supervisor instead of being logged.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Identity(_) | Error::InvalidAuth => true,
            Error::Transport { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
