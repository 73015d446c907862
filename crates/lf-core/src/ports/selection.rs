use async_trait::async_trait;

use crate::ids::ProjectId;

/// Remembers the last selected project across sessions.
#[async_trait]
pub trait SelectionStorePort: Send + Sync {
    async fn load_selection(&self) -> anyhow::Result<Option<ProjectId>>;
    async fn save_selection(&self, project_id: &ProjectId) -> anyhow::Result<()>;
}
