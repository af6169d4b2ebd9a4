use thiserror::Error;

/// Top-level error type for Asro.
#[derive(Debug, Error)]
pub enum AsroError {
    /// Error from the AI provider.
    #[error("provider error: {0}")]
    Provider(String),

    /// Error from the messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// How a generation failure should be treated by the retry policy.
///
/// Decided by inspecting the provider's HTTP status code, never by
/// matching on error message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The service is temporarily overloaded (HTTP 503). Retryable.
    Overloaded,
    /// The rate/quota limit was reached (HTTP 429). Not retryable.
    QuotaExhausted,
    /// Any other failure. Not retryable.
    Other,
}

impl FailureKind {
    /// Classify an HTTP status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            503 => Self::Overloaded,
            429 => Self::QuotaExhausted,
            _ => Self::Other,
        }
    }
}

/// A classified failure from the generation boundary.
#[derive(Debug, Clone, Error)]
#[error("generation failed ({kind:?}): {message}")]
pub struct GenerateError {
    pub kind: FailureKind,
    pub message: String,
}

impl GenerateError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A failure with no useful status signal (network error, bad body).
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Other, message)
    }

    /// Classify from an HTTP status code and response body.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        Self::new(FailureKind::from_status(status), body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(FailureKind::from_status(503), FailureKind::Overloaded);
        assert_eq!(FailureKind::from_status(429), FailureKind::QuotaExhausted);
        assert_eq!(FailureKind::from_status(500), FailureKind::Other);
        assert_eq!(FailureKind::from_status(400), FailureKind::Other);
        assert_eq!(FailureKind::from_status(404), FailureKind::Other);
    }

    #[test]
    fn test_generate_error_display() {
        let e = GenerateError::from_status(503, "busy");
        assert_eq!(e.kind, FailureKind::Overloaded);
        assert!(e.to_string().contains("busy"));
    }
}
