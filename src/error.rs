//! Error types for readalong

use thiserror::Error;

/// Result type alias for readalong operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while preparing or narrating content
#[derive(Debug, Error)]
pub enum Error {
    /// Root content selector resolved to nothing
    #[error("content not found: {0}")]
    ContentNotFound(String),

    /// Root content selector could not be parsed
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// Synthesis collaborator returned a non-success or malformed response
    #[error("synthesis failed: {0}")]
    SynthesisFailed(String),

    /// Audio resource failed to decode or play
    #[error("playback failed: {0}")]
    PlaybackFailed(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether a playback session can return to idle and retry after this error
    ///
    /// Content and configuration errors abort initialization instead.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SynthesisFailed(_) | Self::PlaybackFailed(_) | Self::Http(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesis_and_playback_errors_are_recoverable() {
        assert!(Error::SynthesisFailed("503".into()).is_recoverable());
        assert!(Error::PlaybackFailed("decode".into()).is_recoverable());
    }

    #[test]
    fn content_errors_are_fatal() {
        assert!(!Error::ContentNotFound("article".into()).is_recoverable());
        assert!(!Error::InvalidSelector("[[".into()).is_recoverable());
        assert!(!Error::Config("bad".into()).is_recoverable());
    }
}
