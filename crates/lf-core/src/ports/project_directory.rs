use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Identity, ProbeError};
use crate::ids::ProjectId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
}

#[async_trait]
pub trait ProjectDirectoryPort: Send + Sync {
    /// Projects owned by the given user.
    async fn list_projects(&self, owner: &Identity) -> Result<Vec<ProjectSummary>, ProbeError>;
}
