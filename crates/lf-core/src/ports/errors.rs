use thiserror::Error;

/// The only failure kinds the readiness engine surfaces upward.
///
/// `Clone` so that one deduplicated probe can hand the same result to every
/// waiting caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// Network or backend failure. Retried with bounded backoff.
    #[error("transient backend failure: {0}")]
    Transient(String),

    /// The session is no longer valid. Never retried.
    #[error("authentication expired")]
    AuthExpired,

    /// The backend reported something outside the known domain.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl ProbeError {
    pub fn transient(err: impl std::fmt::Display) -> Self {
        ProbeError::Transient(err.to_string())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ProbeError::Transient(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    #[error("subscribe failed: {0}")]
    Subscribe(String),

    #[error("unsubscribe failed: {0}")]
    Unsubscribe(String),

    #[error("unknown subscription: {0}")]
    UnknownSubscription(String),
}
