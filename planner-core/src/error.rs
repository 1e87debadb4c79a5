//! Error types for the planner engine.

use thiserror::Error;

/// Errors that can occur while loading, syncing or laying out events.
#[derive(Error, Debug)]
pub enum PlannerError {
    /// The provider rejected the credential (HTTP 401).
    #[error("Authorization expired")]
    AuthExpired,

    /// The provider no longer accepts the incremental sync token (HTTP 410).
    #[error("Sync token is no longer valid")]
    SyncTokenInvalid,

    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// No provider client identity is configured; nothing can be fetched.
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PlannerError {
    /// Classify a non-success provider response.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 => PlannerError::AuthExpired,
            410 => PlannerError::SyncTokenInvalid,
            _ => PlannerError::Http {
                status,
                message: message.into(),
            },
        }
    }

    /// Errors the engine recovers from on its own (re-auth or full reload).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PlannerError::AuthExpired | PlannerError::SyncTokenInvalid
        )
    }

    /// Errors that abort a whole load instead of a single source.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PlannerError::ConfigurationMissing(_))
    }
}

/// Result type alias for planner operations.
pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classifies_auth_and_gone() {
        assert!(matches!(
            PlannerError::from_status(401, "unauthorized"),
            PlannerError::AuthExpired
        ));
        assert!(matches!(
            PlannerError::from_status(410, "gone"),
            PlannerError::SyncTokenInvalid
        ));

        let other = PlannerError::from_status(503, "backend unavailable");
        assert!(matches!(other, PlannerError::Http { status: 503, .. }));
        assert!(!other.is_recoverable());
        assert_eq!(other.to_string(), "HTTP error 503: backend unavailable");
    }

    #[test]
    fn test_only_configuration_missing_is_fatal() {
        assert!(PlannerError::ConfigurationMissing("no client id".into()).is_fatal());
        assert!(!PlannerError::AuthExpired.is_fatal());
        assert!(!PlannerError::MalformedEvent("no start".into()).is_fatal());
    }
}
