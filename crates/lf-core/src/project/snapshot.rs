use serde::{Deserialize, Serialize};

use super::{IntegrationSummary, Stage};

/// Point-in-time read of a project's lifecycle attributes.
/// 项目生命周期属性的时间点快照。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub stage: Stage,
    /// At least one analysis artifact exists. Never inferred from `stage`.
    pub output_exists: bool,
    pub integration: IntegrationSummary,
    /// Server supplied processing message, when the combined decision RPC
    /// was used.
    pub message: Option<String>,
}

impl ProjectSnapshot {
    pub fn new(stage: Stage, output_exists: bool, integration: IntegrationSummary) -> Self {
        Self {
            stage,
            output_exists,
            integration,
            message: None,
        }
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }
}
