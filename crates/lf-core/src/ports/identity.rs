use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ProbeError;

/// The authenticated user, as far as the readiness engine cares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

#[async_trait]
pub trait IdentityPort: Send + Sync {
    /// Current user, `None` when nobody is signed in.
    ///
    /// Returns [`ProbeError::AuthExpired`] when a session exists but is no
    /// longer valid.
    async fn current_identity(&self) -> Result<Option<Identity>, ProbeError>;
}
