use async_trait::async_trait;

use super::ProbeError;
use crate::ids::ProjectId;

#[async_trait]
pub trait OutputExistencePort: Send + Sync {
    /// Whether at least one analysis artifact exists. Implemented as an
    /// existence query with `limit = 1`, never as a count.
    async fn has_any_output(&self, project_id: &ProjectId) -> Result<bool, ProbeError>;
}
