use thiserror::Error;

/// Maximum number of characters of an upstream error body kept in
/// [`DoraError::UpstreamError`].
pub const BODY_EXCERPT_CHARS: usize = 200;

/// Errors that can occur while building queries or talking to the repository.
#[derive(Error, Debug)]
pub enum DoraError {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("repository unavailable: {message}")]
    UpstreamUnavailable { message: String },

    #[error("repository returned HTTP {status}: {body_excerpt}")]
    UpstreamError { status: u16, body_excerpt: String },

    #[error("unexpected repository response: {message}")]
    UpstreamProtocolError { message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DoraError {
    /// Builds an `InvalidArgument` error from any displayable message.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Builds an `UpstreamError`, cutting the body down to an excerpt.
    pub fn upstream_status(status: u16, body: &str) -> Self {
        Self::UpstreamError {
            status,
            body_excerpt: excerpt(body, BODY_EXCERPT_CHARS),
        }
    }

    /// Returns `true` for failures of the repository call itself.
    ///
    /// These are domain failures: the dispatcher reports them inside a normal
    /// tool result instead of a JSON-RPC error.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. }
                | Self::UpstreamError { .. }
                | Self::UpstreamProtocolError { .. }
        )
    }
}

/// Returns at most `max_chars` characters of `s`, trimmed of surrounding whitespace.
fn excerpt(s: &str, max_chars: usize) -> String {
    let trimmed = s.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &trimmed[..end]),
        None => trimmed.to_string(),
    }
}

/// Convenience alias for results using `DoraError`.
pub type Result<T> = std::result::Result<T, DoraError>;
