//! Broker-binding traits used by C2 (publish domain events), C3 (consume
//! domain events), and C4 (publish/consume `wms.forceSync` commands). The
//! actual broker topology — exchanges, queues, the dead-letter exchange — is
//! out of scope (spec §1); this crate only fixes the interfaces so the core
//! engine has something concrete to call, plus a deterministic in-memory
//! adapter for tests.

use std::collections::VecDeque;

use inv_schemas::ForceWmsSync;
use serde_json::Value;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct PublishError(pub String);

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "publish error: {}", self.0)
    }
}

impl std::error::Error for PublishError {}

/// Publishes a domain event to the broker (spec §4.2, §6.3), keyed by
/// `inventory.<eventType>`, JSON, persistent delivery, `messageId` equal to
/// the originating outbox event id.
#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        routing_key: &str,
        message_id: i64,
        payload: Value,
    ) -> Result<(), PublishError>;
}

/// Publishes a `ForceWmsSync` command to the `wms.forceSync` exchange (spec
/// §6.3), used by the admin sync endpoint.
#[async_trait::async_trait]
pub trait CommandPublisher: Send + Sync {
    async fn publish_sync_command(&self, command: ForceWmsSync) -> Result<(), PublishError>;
}

#[derive(Debug, Clone)]
pub struct EventDelivery {
    pub delivery_tag: String,
    pub event_type: String,
    pub payload: Value,
}

/// Consumed by C3 (spec §4.3): `InventoryAllocated`/`InventoryReleased`
/// messages off the domain-event queue, with a prefetch cap.
#[async_trait::async_trait]
pub trait EventConsumer: Send + Sync {
    async fn poll(&self, prefetch: usize) -> Vec<EventDelivery>;
    async fn ack(&self, delivery_tag: &str);
    async fn nack_requeue(&self, delivery_tag: &str);
    async fn nack_dead_letter(&self, delivery_tag: &str);
}

#[derive(Debug, Clone)]
pub struct CommandDelivery {
    pub delivery_tag: String,
    pub command: ForceWmsSync,
}

/// Consumed by C4 (spec §4.4): `ForceWmsSync` commands off its queue.
#[async_trait::async_trait]
pub trait SyncCommandConsumer: Send + Sync {
    async fn poll(&self, prefetch: usize) -> Vec<CommandDelivery>;
    async fn ack(&self, delivery_tag: &str);
    async fn nack_requeue(&self, delivery_tag: &str);
    async fn nack_dead_letter(&self, delivery_tag: &str);
}

#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub routing_key: String,
    pub message_id: i64,
    pub payload: Value,
}

#[derive(Default)]
struct State {
    published: Vec<PublishedEvent>,
    events_pending: VecDeque<(String, String, Value)>,
    events_delivered: Vec<(String, String, Value)>,
    events_dead_letter: Vec<(String, String, Value)>,
    commands_pending: VecDeque<(String, ForceWmsSync)>,
    commands_delivered: Vec<(String, ForceWmsSync)>,
    commands_dead_letter: Vec<(String, ForceWmsSync)>,
    next_tag: u64,
}

/// Deterministic in-memory broker: publishing a domain event also enqueues
/// it for `EventConsumer::poll`, and publishing a sync command enqueues it
/// for `SyncCommandConsumer::poll`. No network I/O, no reordering beyond
/// insertion order — good enough to exercise C2/C3/C4 in tests without a
/// real broker.
pub struct InMemoryBroker {
    state: Mutex<State>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self { state: Mutex::new(State::default()) }
    }

    pub async fn published(&self) -> Vec<PublishedEvent> {
        self.state.lock().await.published.clone()
    }

    pub async fn dead_lettered_events(&self) -> Vec<(String, String, Value)> {
        self.state.lock().await.events_dead_letter.clone()
    }

    pub async fn dead_lettered_commands(&self) -> Vec<(String, ForceWmsSync)> {
        self.state.lock().await.commands_dead_letter.clone()
    }

    async fn next_tag(state: &mut State) -> String {
        state.next_tag += 1;
        format!("delivery-{}", state.next_tag)
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EventPublisher for InMemoryBroker {
    async fn publish(
        &self,
        routing_key: &str,
        message_id: i64,
        payload: Value,
    ) -> Result<(), PublishError> {
        let mut state = self.state.lock().await;
        state.published.push(PublishedEvent {
            routing_key: routing_key.to_string(),
            message_id,
            payload: payload.clone(),
        });
        let event_type = routing_key
            .strip_prefix("inventory.")
            .unwrap_or(routing_key)
            .to_string();
        let tag = Self::next_tag(&mut state).await;
        state.events_pending.push_back((tag, event_type, payload));
        Ok(())
    }
}

#[async_trait::async_trait]
impl CommandPublisher for InMemoryBroker {
    async fn publish_sync_command(&self, command: ForceWmsSync) -> Result<(), PublishError> {
        let mut state = self.state.lock().await;
        let tag = Self::next_tag(&mut state).await;
        state.commands_pending.push_back((tag, command));
        Ok(())
    }
}

#[async_trait::async_trait]
impl EventConsumer for InMemoryBroker {
    async fn poll(&self, prefetch: usize) -> Vec<EventDelivery> {
        let mut state = self.state.lock().await;
        let mut out = Vec::new();
        for _ in 0..prefetch {
            let Some((delivery_tag, event_type, payload)) = state.events_pending.pop_front()
            else {
                break;
            };
            state.events_delivered.push((
                delivery_tag.clone(),
                event_type.clone(),
                payload.clone(),
            ));
            out.push(EventDelivery { delivery_tag, event_type, payload });
        }
        out
    }

    async fn ack(&self, delivery_tag: &str) {
        let mut state = self.state.lock().await;
        state.events_delivered.retain(|(tag, _, _)| tag != delivery_tag);
    }

    async fn nack_requeue(&self, delivery_tag: &str) {
        // Requeued deliveries go to the back so other pending work proceeds first.
        let mut state = self.state.lock().await;
        if let Some(pos) = state
            .events_delivered
            .iter()
            .position(|(tag, _, _)| tag == delivery_tag)
        {
            let item = state.events_delivered.remove(pos);
            state.events_pending.push_back(item);
        }
    }

    async fn nack_dead_letter(&self, delivery_tag: &str) {
        let mut state = self.state.lock().await;
        if let Some(pos) = state
            .events_delivered
            .iter()
            .position(|(tag, _, _)| tag == delivery_tag)
        {
            let item = state.events_delivered.remove(pos);
            state.events_dead_letter.push(item);
        }
    }
}

#[async_trait::async_trait]
impl SyncCommandConsumer for InMemoryBroker {
    async fn poll(&self, prefetch: usize) -> Vec<CommandDelivery> {
        let mut state = self.state.lock().await;
        let mut out = Vec::new();
        for _ in 0..prefetch {
            let Some((delivery_tag, command)) = state.commands_pending.pop_front() else {
                break;
            };
            state.commands_delivered.push((delivery_tag.clone(), command.clone()));
            out.push(CommandDelivery { delivery_tag, command });
        }
        out
    }

    async fn ack(&self, delivery_tag: &str) {
        let mut state = self.state.lock().await;
        state.commands_delivered.retain(|(tag, _)| tag != delivery_tag);
    }

    async fn nack_requeue(&self, delivery_tag: &str) {
        let mut state = self.state.lock().await;
        if let Some(pos) = state
            .commands_delivered
            .iter()
            .position(|(tag, _)| tag == delivery_tag)
        {
            let item = state.commands_delivered.remove(pos);
            state.commands_pending.push_back(item);
        }
    }

    async fn nack_dead_letter(&self, delivery_tag: &str) {
        let mut state = self.state.lock().await;
        if let Some(pos) = state
            .commands_delivered
            .iter()
            .position(|(tag, _)| tag == delivery_tag)
        {
            let item = state.commands_delivered.remove(pos);
            state.commands_dead_letter.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_enqueues_for_consumption_in_order() {
        let broker = InMemoryBroker::new();
        broker
            .publish("inventory.InventoryAllocated", 1, serde_json::json!({"a": 1}))
            .await
            .unwrap();
        broker
            .publish("inventory.InventoryReleased", 2, serde_json::json!({"b": 2}))
            .await
            .unwrap();

        let deliveries = EventConsumer::poll(&broker, 10).await;
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].event_type, "InventoryAllocated");
        assert_eq!(deliveries[1].event_type, "InventoryReleased");
    }

    #[tokio::test]
    async fn nack_dead_letter_removes_from_in_flight_and_records() {
        let broker = InMemoryBroker::new();
        broker
            .publish("inventory.InventoryAllocated", 1, serde_json::json!({}))
            .await
            .unwrap();
        let deliveries = EventConsumer::poll(&broker, 1).await;
        EventConsumer::nack_dead_letter(&broker, &deliveries[0].delivery_tag).await;

        assert!(EventConsumer::poll(&broker, 1).await.is_empty());
        assert_eq!(broker.dead_lettered_events().await.len(), 1);
    }
}
