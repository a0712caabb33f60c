//! In-process fan-out for live message subscriptions.
//!
//! Every stored message is published here; WebSocket subscribers filter the
//! stream down to their own conversation pair. Ordering follows insertion
//! order; there are no delivery acknowledgements.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::message;

#[derive(Clone, Debug, Serialize)]
pub struct ChatEvent {
    pub id: i32,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub body: String,
    pub created_at: String,
}

impl ChatEvent {
    /// True when this event belongs to the unordered pair {a, b}.
    pub fn involves(&self, a: i32, b: i32) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }
}

impl From<message::Model> for ChatEvent {
    fn from(model: message::Model) -> Self {
        Self {
            id: model.id,
            sender_id: model.sender_id,
            receiver_id: model.receiver_id,
            body: model.body,
            created_at: model.created_at,
        }
    }
}

#[derive(Clone)]
pub struct ChatHub {
    tx: broadcast::Sender<ChatEvent>,
}

impl ChatHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a stored message to all live subscribers. A send error only
    /// means nobody is subscribed right now.
    pub fn publish(&self, event: ChatEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new(256)
    }
}
