use async_trait::async_trait;
use lf_core::ports::{RealtimeError, RealtimeMessage, RealtimePort, RealtimeTopic};
use lf_core::SubscriptionId;
use tokio::sync::mpsc;
use tracing::debug;

/// Acknowledges every handshake and never delivers. Used when the backend
/// has no push channel; polling is then the only refresh path.
#[derive(Debug, Default)]
pub struct DisabledRealtime;

#[async_trait]
impl RealtimePort for DisabledRealtime {
    async fn subscribe(
        &self,
        topic: RealtimeTopic,
        _sink: mpsc::Sender<RealtimeMessage>,
    ) -> Result<SubscriptionId, RealtimeError> {
        debug!(topic = %topic.name(), "realtime disabled, subscription is inert");
        Ok(SubscriptionId::from_string(uuid::Uuid::new_v4().to_string()))
    }

    async fn unsubscribe(&self, _subscription: &SubscriptionId) -> Result<(), RealtimeError> {
        Ok(())
    }
}
