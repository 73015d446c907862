//! Scripted pipeline for `--demo`: a signed-in user, one project, and a
//! backend that walks the project through every processing stage.

use std::sync::Arc;
use std::time::Duration;

use lf_core::ProjectId;
use lf_infra::memory::InMemoryBackend;
use tokio::task::JoinHandle;
use tracing::info;

pub const DEMO_EMAIL: &str = "demo@liftlio.com";
pub const DEMO_PROJECT: &str = "1";

/// Seed the backend with the demo user and a project still waiting for its
/// integration.
pub fn seed(backend: &InMemoryBackend) -> ProjectId {
    let project_id = ProjectId::from(DEMO_PROJECT);
    backend.sign_in(DEMO_EMAIL);
    backend.add_project(&project_id, "Demo channel");
    project_id
}

/// Connect the integration, advance one stage per `step` up to `ready_stage`,
/// then record the first output.
pub fn spawn_pipeline(
    backend: Arc<InMemoryBackend>,
    project_id: ProjectId,
    ready_stage: u32,
    step: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(step).await;
        backend.connect_integration(&project_id);
        info!(project_id = %project_id, "demo: integration connected");

        for stage in 1..=ready_stage {
            tokio::time::sleep(step).await;
            backend.set_stage(&project_id, stage);
            info!(project_id = %project_id, stage, "demo: stage advanced");
        }

        tokio::time::sleep(step).await;
        backend.add_output(&project_id);
        info!(project_id = %project_id, "demo: first output recorded");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lf_core::ports::{OutputExistencePort, ProjectStatusPort};

    #[tokio::test(start_paused = true)]
    async fn test_pipeline_reaches_ready_stage_with_output() {
        let backend = Arc::new(InMemoryBackend::new());
        let project_id = seed(&backend);

        spawn_pipeline(backend.clone(), project_id.clone(), 6, Duration::from_secs(1))
            .await
            .unwrap();

        let record = backend.get_project_status(&project_id).await.unwrap();
        assert_eq!(record.stage.as_str(), Some("6"));
        assert!(backend.has_any_output(&project_id).await.unwrap());
    }
}
