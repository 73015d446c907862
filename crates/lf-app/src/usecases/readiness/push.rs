//! Realtime change notifications turned into refresh triggers.
//! 将实时变更通知转换为刷新触发。

use std::sync::Arc;

use lf_core::ports::{RealtimeError, RealtimeMessage, RealtimePort, RealtimeTopic};
use lf_core::{ProjectId, Stage, StageCatalog, SubscriptionId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const FORWARD_BUFFER: usize = 64;

/// What the backend told us changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// The project row changed. `stage` is `None` when the payload did not
    /// carry a recognizable stage; the event is still a refresh trigger.
    StageUpdated { stage: Option<Stage> },
    /// An analysis artifact was created. Trigger only.
    OutputCreated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushNotice {
    pub project_id: ProjectId,
    pub event: PushEvent,
}

struct ActiveSubscription {
    project_id: ProjectId,
    handles: Vec<SubscriptionId>,
    forwarder: JoinHandle<()>,
}

/// Holds at most one project subscription (status and output topics).
///
/// Switching projects tears the previous subscription down, acknowledgement
/// included, before the next one is created.
pub struct RealtimePushListener {
    realtime: Arc<dyn RealtimePort>,
    catalog: StageCatalog,
    active: Option<ActiveSubscription>,
}

impl RealtimePushListener {
    pub fn new(realtime: Arc<dyn RealtimePort>, catalog: StageCatalog) -> Self {
        Self {
            realtime,
            catalog,
            active: None,
        }
    }

    pub fn subscribed_project(&self) -> Option<&ProjectId> {
        self.active.as_ref().map(|active| &active.project_id)
    }

    /// Subscribe to the project's status and output topics. `on_change` is
    /// called from a forwarding task for every decoded notice.
    pub async fn subscribe<F>(
        &mut self,
        project_id: &ProjectId,
        on_change: F,
    ) -> Result<(), RealtimeError>
    where
        F: Fn(PushNotice) + Send + Sync + 'static,
    {
        if let Err(err) = self.unsubscribe().await {
            warn!(error = %err, "previous subscription did not acknowledge removal");
        }

        let (tx, mut rx) = mpsc::channel::<RealtimeMessage>(FORWARD_BUFFER);

        let status = self
            .realtime
            .subscribe(RealtimeTopic::ProjectStatus(project_id.clone()), tx.clone())
            .await?;
        let output = match self
            .realtime
            .subscribe(RealtimeTopic::ProjectOutput(project_id.clone()), tx)
            .await
        {
            Ok(handle) => handle,
            Err(err) => {
                let _ = self.realtime.unsubscribe(&status).await;
                return Err(err);
            }
        };

        let catalog = self.catalog.clone();
        let subscribed = project_id.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if message.topic.project_id() != &subscribed {
                    debug!(topic = %message.topic.name(), "dropping message for another project");
                    continue;
                }
                on_change(decode(&catalog, message));
            }
        });

        info!(project_id = %project_id, "realtime subscription active");
        self.active = Some(ActiveSubscription {
            project_id: project_id.clone(),
            handles: vec![status, output],
            forwarder,
        });
        Ok(())
    }

    /// Remove the active subscription, waiting for the transport to
    /// acknowledge. No notice is delivered once this returns.
    pub async fn unsubscribe(&mut self) -> Result<(), RealtimeError> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };

        let mut first_error = None;
        for handle in &active.handles {
            if let Err(err) = self.realtime.unsubscribe(handle).await {
                first_error.get_or_insert(err);
            }
        }
        active.forwarder.abort();
        debug!(project_id = %active.project_id, "realtime subscription removed");

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for RealtimePushListener {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.forwarder.abort();
        }
    }
}

/// Status payloads carry the row either flat (`{"status": "6"}`) or as a
/// change record (`{"new": {"status": 6}}`).
fn decode(catalog: &StageCatalog, message: RealtimeMessage) -> PushNotice {
    let project_id = message.topic.project_id().clone();
    let event = match message.topic {
        RealtimeTopic::ProjectOutput(_) => PushEvent::OutputCreated,
        RealtimeTopic::ProjectStatus(_) => {
            let raw = message
                .payload
                .get("new")
                .and_then(|row| row.get("status"))
                .or_else(|| message.payload.get("status"));
            let stage = raw.and_then(|raw| match catalog.parse_json(raw) {
                Ok(stage) => Some(stage),
                Err(err) => {
                    warn!(error = %err, "ignoring stage carried by push payload");
                    None
                }
            });
            PushEvent::StageUpdated { stage }
        }
    };
    PushNotice { project_id, event }
}
