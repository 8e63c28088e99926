use thiserror::Error;

/// Failure at the completion service boundary.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("completion API key is not configured")]
    MissingApiKey,

    #[error("completion request failed: {0}")]
    Transport(String),

    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion reply could not be read: {0}")]
    MalformedResponse(String),
}

/// Failure of the external media tooling. Always recoverable by the caller.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media tool `{0}` is not available")]
    ToolMissing(String),

    #[error("media tool `{tool}` failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("video file not found: {0}")]
    NotFound(String),

    #[error("clip end {end}s is not after start {start}s")]
    InvalidRange { start: f64, end: f64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the session engine to its caller.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("generated chart used the placeholder label `{placeholder}`")]
    PlaceholderDetected { placeholder: String },

    #[error("generated chart does not start from `{position}`")]
    StartingPositionMissing { position: String },

    #[error("no chart has been generated yet")]
    NoChart,
}

impl FlowError {
    /// Generation failures are worth retrying; provider failures point at connectivity.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FlowError::PlaceholderDetected { .. } | FlowError::StartingPositionMissing { .. }
        )
    }
}

/// A single graph statement that could not be read. Never leaves the crate.
#[derive(Debug, Error)]
#[error("malformed graph statement `{line}`")]
pub(crate) struct MalformedStatement {
    pub(crate) line: String,
}
