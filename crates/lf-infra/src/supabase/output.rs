use async_trait::async_trait;
use lf_core::ports::OutputExistencePort;
use lf_core::{ProbeError, ProjectId};
use serde_json::Value;

use super::SupabaseBackend;

#[async_trait]
impl OutputExistencePort for SupabaseBackend {
    async fn has_any_output(&self, project_id: &ProjectId) -> Result<bool, ProbeError> {
        let request = self.rest("Mensagens").query(&[
            ("select", "id".to_string()),
            ("project_id", format!("eq.{project_id}")),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<Value> = self.fetch("has_any_output", request).await?;
        Ok(!rows.is_empty())
    }
}
