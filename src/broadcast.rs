//! Room fan-out
//!
//! One broadcast channel per routing key. The engine publishes state-change
//! events here after every committed mutation; each WebSocket connection
//! that created or joined the session holds a receiver. The broadcaster is
//! passed into the engine explicitly so components stay testable - there is
//! no process-wide singleton.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

use crate::protocol::ServerMessage;

const ROOM_CHANNEL_CAPACITY: usize = 100;

/// Capability interface for fanning out events to all members of a room
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Deliver an event to every subscriber of the room. Rooms with no
    /// subscribers swallow the event; that is not an error.
    async fn publish(&self, routing_key: &str, message: ServerMessage);

    /// Subscribe to a room, creating its channel if needed
    async fn subscribe(&self, routing_key: &str) -> broadcast::Receiver<ServerMessage>;

    /// Drop a room's channel once its session is finished
    async fn remove_room(&self, routing_key: &str);
}

/// Broadcaster backed by per-room tokio broadcast channels
#[derive(Default)]
pub struct ChannelBroadcaster {
    rooms: RwLock<HashMap<String, broadcast::Sender<ServerMessage>>>,
}

impl ChannelBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Broadcaster for ChannelBroadcaster {
    async fn publish(&self, routing_key: &str, message: ServerMessage) {
        let rooms = self.rooms.read().await;
        if let Some(tx) = rooms.get(routing_key) {
            // Send errors just mean nobody is listening right now
            let _ = tx.send(message);
        }
    }

    async fn subscribe(&self, routing_key: &str) -> broadcast::Receiver<ServerMessage> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(routing_key.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    async fn remove_room(&self, routing_key: &str) {
        self.rooms.write().await.remove(routing_key);
    }
}
