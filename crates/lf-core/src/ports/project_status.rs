use async_trait::async_trait;

use super::ProbeError;
use crate::ids::ProjectId;

/// Raw status row. The stage is kept as the backend sent it and is mapped
/// into a [`Stage`](crate::project::Stage) by the status probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectStatusRecord {
    pub stage: serde_json::Value,
}

#[async_trait]
pub trait ProjectStatusPort: Send + Sync {
    async fn get_project_status(
        &self,
        project_id: &ProjectId,
    ) -> Result<ProjectStatusRecord, ProbeError>;
}
