use async_trait::async_trait;

use super::ProbeError;
use crate::ids::ProjectId;
use crate::project::IntegrationRecord;

#[async_trait]
pub trait IntegrationPort: Send + Sync {
    async fn list_integrations(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<IntegrationRecord>, ProbeError>;
}
