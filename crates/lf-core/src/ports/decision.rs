use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ProbeError;
use crate::ids::ProjectId;

/// Response of the server-side combined decision RPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDecision {
    pub display_component: String,
    #[serde(default)]
    pub project_status: Option<serde_json::Value>,
    #[serde(default)]
    pub progress_percentage: Option<f64>,
    #[serde(default)]
    pub has_messages: Option<bool>,
    #[serde(default)]
    pub processing_message: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Single round-trip decision read, preferred over the multi-query fallback
/// where the backend provides it.
#[async_trait]
pub trait DisplayDecisionPort: Send + Sync {
    async fn check_display_state(
        &self,
        user_email: &str,
        project_id: &ProjectId,
    ) -> Result<RemoteDecision, ProbeError>;
}
