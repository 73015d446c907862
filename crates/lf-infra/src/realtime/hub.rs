//! In-process change feed.
//! 进程内变更推送。

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use lf_core::ports::{RealtimeError, RealtimeMessage, RealtimePort, RealtimeTopic};
use lf_core::SubscriptionId;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

struct Subscriber {
    topic: RealtimeTopic,
    sink: mpsc::Sender<RealtimeMessage>,
}

/// Topic-filtered fan-out to subscribed sinks.
///
/// Delivery and removal happen under one lock, so once `unsubscribe`
/// returns no further message reaches that sink.
#[derive(Default)]
pub struct InMemoryRealtimeHub {
    subscribers: Mutex<HashMap<SubscriptionId, Subscriber>>,
}

impl InMemoryRealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `payload` to every subscriber of `topic`. Returns the number
    /// of sinks that accepted the message.
    pub fn publish(&self, topic: RealtimeTopic, payload: Value) -> usize {
        let Ok(subscribers) = self.subscribers.lock() else {
            warn!("realtime hub lock poisoned, dropping message");
            return 0;
        };

        let mut delivered = 0;
        for (id, subscriber) in subscribers.iter() {
            if subscriber.topic != topic {
                continue;
            }
            let message = RealtimeMessage {
                topic: topic.clone(),
                payload: payload.clone(),
            };
            match subscriber.sink.try_send(message) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    warn!(subscription = %id, error = %err, "subscriber not keeping up, message dropped")
                }
            }
        }
        debug!(topic = %topic.name(), delivered, "published");
        delivered
    }

    pub fn subscriber_count(&self, topic: &RealtimeTopic) -> usize {
        self.subscribers
            .lock()
            .map(|subscribers| subscribers.values().filter(|s| &s.topic == topic).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl RealtimePort for InMemoryRealtimeHub {
    async fn subscribe(
        &self,
        topic: RealtimeTopic,
        sink: mpsc::Sender<RealtimeMessage>,
    ) -> Result<SubscriptionId, RealtimeError> {
        let id = SubscriptionId::from_string(uuid::Uuid::new_v4().to_string());
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|_| RealtimeError::Subscribe("hub lock poisoned".to_string()))?;
        debug!(topic = %topic.name(), subscription = %id, "subscribed");
        subscribers.insert(id.clone(), Subscriber { topic, sink });
        Ok(id)
    }

    async fn unsubscribe(&self, subscription: &SubscriptionId) -> Result<(), RealtimeError> {
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|_| RealtimeError::Unsubscribe("hub lock poisoned".to_string()))?;
        match subscribers.remove(subscription) {
            Some(_) => Ok(()),
            None => Err(RealtimeError::UnknownSubscription(subscription.to_string())),
        }
    }
}
