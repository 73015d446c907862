//! Backend state held in memory.
//!
//! Implements every read port the engine needs. Mutators mirror what the
//! processing pipeline does (advance the stage, write an artifact, connect
//! or disable an integration) and publish the matching change notification
//! when a realtime hub is attached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use lf_core::ports::{
    Identity, IdentityPort, IntegrationPort, OutputExistencePort, ProbeError,
    ProjectDirectoryPort, ProjectStatusPort, ProjectStatusRecord, ProjectSummary, RealtimeTopic,
};
use lf_core::{IntegrationRecord, ProjectId};
use serde_json::{json, Value};

use crate::realtime::InMemoryRealtimeHub;

#[derive(Default)]
struct State {
    identity: Option<Identity>,
    session_expired: bool,
    unavailable: bool,
    failing_status_reads: u32,
    projects: Vec<ProjectSummary>,
    statuses: HashMap<ProjectId, Value>,
    outputs: HashMap<ProjectId, usize>,
    integrations: HashMap<ProjectId, Vec<IntegrationRecord>>,
    latency: HashMap<ProjectId, Duration>,
}

/// 内存后端。
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
    realtime: Option<Arc<InMemoryRealtimeHub>>,
    status_reads: AtomicUsize,
    output_reads: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish change notifications to `hub` when state changes.
    pub fn with_realtime(mut self, hub: Arc<InMemoryRealtimeHub>) -> Self {
        self.realtime = Some(hub);
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not wedge the rest of the suite.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ----- session -----

    pub fn sign_in(&self, email: &str) {
        let mut state = self.state();
        state.identity = Some(Identity {
            user_id: format!("user-{email}"),
            email: email.to_string(),
        });
        state.session_expired = false;
    }

    pub fn sign_out(&self) {
        let mut state = self.state();
        state.identity = None;
        state.session_expired = false;
    }

    /// Every subsequent read fails with [`ProbeError::AuthExpired`].
    pub fn expire_session(&self) {
        self.state().session_expired = true;
    }

    /// Every subsequent read fails with a transient error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// The next `count` status reads fail with a transient error.
    pub fn fail_next_status_reads(&self, count: u32) {
        self.state().failing_status_reads = count;
    }

    /// Delay every read for the project by `latency`.
    pub fn set_latency(&self, project_id: &ProjectId, latency: Duration) {
        self.state().latency.insert(project_id.clone(), latency);
    }

    // ----- pipeline -----

    /// New project at stage 0 without integration or output.
    pub fn add_project(&self, project_id: &ProjectId, name: &str) {
        let mut state = self.state();
        state.projects.push(ProjectSummary {
            id: project_id.clone(),
            name: name.to_string(),
        });
        state.statuses.insert(project_id.clone(), json!("0"));
    }

    /// Drop the project from its owner's listing and forget its rows.
    pub fn remove_project(&self, project_id: &ProjectId) {
        let mut state = self.state();
        state.projects.retain(|project| &project.id != project_id);
        state.statuses.remove(project_id);
        state.outputs.remove(project_id);
        state.integrations.remove(project_id);
    }

    /// Advance the stage. Stored as text, the way the project table keeps it.
    pub fn set_stage(&self, project_id: &ProjectId, stage: u32) {
        self.set_raw_status(project_id, json!(stage.to_string()));
    }

    pub fn set_raw_status(&self, project_id: &ProjectId, status: Value) {
        self.state()
            .statuses
            .insert(project_id.clone(), status.clone());
        self.notify(
            RealtimeTopic::ProjectStatus(project_id.clone()),
            json!({ "new": { "id": project_id.as_str(), "status": status } }),
        );
    }

    pub fn add_output(&self, project_id: &ProjectId) {
        *self.state().outputs.entry(project_id.clone()).or_insert(0) += 1;
        self.notify(
            RealtimeTopic::ProjectOutput(project_id.clone()),
            json!({ "new": { "project_id": project_id.as_str() } }),
        );
    }

    pub fn connect_integration(&self, project_id: &ProjectId) {
        self.state()
            .integrations
            .entry(project_id.clone())
            .or_default()
            .push(IntegrationRecord { active: true });
    }

    /// Keep the records but mark them inactive.
    pub fn disable_integrations(&self, project_id: &ProjectId) {
        if let Some(records) = self.state().integrations.get_mut(project_id) {
            for record in records.iter_mut() {
                record.active = false;
            }
        }
    }

    /// Delete every integration row, active or not.
    pub fn clear_integrations(&self, project_id: &ProjectId) {
        self.state().integrations.remove(project_id);
    }

    /// Number of status reads served, failed ones included.
    pub fn status_reads(&self) -> usize {
        self.status_reads.load(Ordering::SeqCst)
    }

    /// Number of output existence reads served, failed ones included.
    pub fn output_reads(&self) -> usize {
        self.output_reads.load(Ordering::SeqCst)
    }

    fn notify(&self, topic: RealtimeTopic, payload: Value) {
        if let Some(hub) = &self.realtime {
            hub.publish(topic, payload);
        }
    }

    /// Common gate for every read: latency, then availability and session.
    async fn gate(&self, project_id: Option<&ProjectId>) -> Result<(), ProbeError> {
        let latency = project_id.and_then(|id| self.state().latency.get(id).copied());
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let state = self.state();
        if state.unavailable {
            return Err(ProbeError::transient("backend unavailable"));
        }
        if state.session_expired {
            return Err(ProbeError::AuthExpired);
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityPort for InMemoryBackend {
    async fn current_identity(&self) -> Result<Option<Identity>, ProbeError> {
        self.gate(None).await?;
        Ok(self.state().identity.clone())
    }
}

#[async_trait]
impl ProjectDirectoryPort for InMemoryBackend {
    async fn list_projects(&self, _owner: &Identity) -> Result<Vec<ProjectSummary>, ProbeError> {
        self.gate(None).await?;
        Ok(self.state().projects.clone())
    }
}

#[async_trait]
impl ProjectStatusPort for InMemoryBackend {
    async fn get_project_status(
        &self,
        project_id: &ProjectId,
    ) -> Result<ProjectStatusRecord, ProbeError> {
        self.status_reads.fetch_add(1, Ordering::SeqCst);
        self.gate(Some(project_id)).await?;

        let mut state = self.state();
        if state.failing_status_reads > 0 {
            state.failing_status_reads -= 1;
            return Err(ProbeError::transient("injected status read failure"));
        }
        state
            .statuses
            .get(project_id)
            .cloned()
            .map(|stage| ProjectStatusRecord { stage })
            .ok_or_else(|| ProbeError::InvariantViolation(format!("unknown project {project_id}")))
    }
}

#[async_trait]
impl OutputExistencePort for InMemoryBackend {
    async fn has_any_output(&self, project_id: &ProjectId) -> Result<bool, ProbeError> {
        self.output_reads.fetch_add(1, Ordering::SeqCst);
        self.gate(Some(project_id)).await?;
        Ok(self
            .state()
            .outputs
            .get(project_id)
            .is_some_and(|count| *count > 0))
    }
}

#[async_trait]
impl IntegrationPort for InMemoryBackend {
    async fn list_integrations(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<IntegrationRecord>, ProbeError> {
        self.gate(Some(project_id)).await?;
        Ok(self
            .state()
            .integrations
            .get(project_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use lf_core::ports::RealtimePort;

    #[tokio::test]
    async fn pipeline_mutations_are_visible_to_reads() {
        let backend = InMemoryBackend::new();
        let id = ProjectId::from("58");
        backend.add_project(&id, "Liftlio");
        backend.set_stage(&id, 4);
        backend.connect_integration(&id);

        let status = backend.get_project_status(&id).await.unwrap();
        assert_eq!(status.stage, json!("4"));
        assert!(!backend.has_any_output(&id).await.unwrap());

        backend.add_output(&id);
        assert!(backend.has_any_output(&id).await.unwrap());

        backend.disable_integrations(&id);
        assert_eq!(
            backend.list_integrations(&id).await.unwrap(),
            vec![IntegrationRecord { active: false }]
        );
    }

    #[tokio::test]
    async fn removed_project_and_cleared_integrations_disappear() {
        let backend = InMemoryBackend::new();
        let owner = Identity {
            user_id: "u1".into(),
            email: "owner@example.com".into(),
        };
        let a = ProjectId::from("a");
        let b = ProjectId::from("b");
        backend.add_project(&a, "A");
        backend.add_project(&b, "B");
        backend.connect_integration(&b);

        backend.clear_integrations(&b);
        assert!(backend.list_integrations(&b).await.unwrap().is_empty());

        backend.remove_project(&a);
        let listed = backend.list_projects(&owner).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, b);
        assert!(backend.get_project_status(&a).await.is_err());

        backend.has_any_output(&b).await.unwrap();
        assert_eq!(backend.output_reads(), 1);
    }

    #[tokio::test]
    async fn expired_session_and_outage_surface_as_probe_errors() {
        let backend = InMemoryBackend::new();
        backend.sign_in("owner@example.com");
        assert!(backend.current_identity().await.unwrap().is_some());

        backend.set_unavailable(true);
        assert!(matches!(
            backend.current_identity().await,
            Err(ProbeError::Transient(_))
        ));

        backend.set_unavailable(false);
        backend.expire_session();
        assert_eq!(backend.current_identity().await, Err(ProbeError::AuthExpired));
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let backend = InMemoryBackend::new();
        let id = ProjectId::from("58");
        backend.add_project(&id, "Liftlio");
        backend.fail_next_status_reads(1);

        assert!(backend.get_project_status(&id).await.is_err());
        assert!(backend.get_project_status(&id).await.is_ok());
        assert_eq!(backend.status_reads(), 2);
    }

    #[tokio::test]
    async fn stage_changes_are_pushed_to_the_hub() {
        let hub = Arc::new(InMemoryRealtimeHub::new());
        let backend = InMemoryBackend::new().with_realtime(hub.clone());
        let id = ProjectId::from("58");
        let (tx, mut rx) = mpsc::channel(4);
        hub.subscribe(RealtimeTopic::ProjectStatus(id.clone()), tx)
            .await
            .unwrap();

        backend.add_project(&id, "Liftlio");
        backend.set_stage(&id, 6);

        let message = rx.recv().await.unwrap();
        assert_eq!(message.payload["new"]["status"], json!("6"));
    }
}
