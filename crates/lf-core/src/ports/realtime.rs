use async_trait::async_trait;
use tokio::sync::mpsc;

use super::RealtimeError;
use crate::ids::{ProjectId, SubscriptionId};

/// Change feed a subscription listens to. The filter is the project id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RealtimeTopic {
    /// Row updates of the project, payload carries the new `status`.
    ProjectStatus(ProjectId),
    /// Inserts of analysis artifacts for the project. No payload needed.
    ProjectOutput(ProjectId),
}

impl RealtimeTopic {
    pub fn project_id(&self) -> &ProjectId {
        match self {
            RealtimeTopic::ProjectStatus(id) | RealtimeTopic::ProjectOutput(id) => id,
        }
    }

    pub fn name(&self) -> String {
        match self {
            RealtimeTopic::ProjectStatus(id) => format!("project-status:{id}"),
            RealtimeTopic::ProjectOutput(id) => format!("project-output:{id}"),
        }
    }
}

/// One change notification as delivered by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeMessage {
    pub topic: RealtimeTopic,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait RealtimePort: Send + Sync {
    /// Start delivering messages for `topic` into `sink`.
    async fn subscribe(
        &self,
        topic: RealtimeTopic,
        sink: mpsc::Sender<RealtimeMessage>,
    ) -> Result<SubscriptionId, RealtimeError>;

    /// Stop delivery. Returns once the transport acknowledged the removal;
    /// no message for this subscription is delivered afterwards.
    async fn unsubscribe(&self, subscription: &SubscriptionId) -> Result<(), RealtimeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_names_embed_project_filter() {
        let id = ProjectId::from("58");
        assert_eq!(RealtimeTopic::ProjectStatus(id.clone()).name(), "project-status:58");
        assert_eq!(RealtimeTopic::ProjectOutput(id).name(), "project-output:58");
    }
}
