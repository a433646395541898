use axum::extract::ws::{Message, WebSocket};
use bson::oid::ObjectId;
use dashmap::DashMap;
use futures::stream::SplitSink;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

struct Connection {
    id: String,
    sender: WsSender,
}

/// Open sockets per user. A user may hold several (tabs, devices).
pub struct WsStorage {
    connections: DashMap<ObjectId, Vec<Connection>>,
}

impl WsStorage {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    pub fn add(&self, user_id: ObjectId, connection_id: String, sender: WsSender) {
        self.connections.entry(user_id).or_default().push(Connection {
            id: connection_id,
            sender,
        });
    }

    pub fn remove(&self, user_id: &ObjectId, connection_id: &str) {
        let now_empty = match self.connections.get_mut(user_id) {
            Some(mut conns) => {
                conns.retain(|c| c.id != connection_id);
                conns.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.connections.remove_if(user_id, |_, conns| conns.is_empty());
        }
    }

    /// Forgets every socket of a user, e.g. after the account is deleted.
    /// Returns the dropped senders so the caller can close them.
    pub fn remove_user(&self, user_id: &ObjectId) -> Vec<WsSender> {
        self.connections
            .remove(user_id)
            .map(|(_, conns)| conns.into_iter().map(|c| c.sender).collect())
            .unwrap_or_default()
    }

    pub fn get_senders(&self, user_id: &ObjectId) -> Vec<WsSender> {
        self.connections
            .get(user_id)
            .map(|conns| conns.iter().map(|c| c.sender.clone()).collect())
            .unwrap_or_default()
    }

    pub fn all_user_ids(&self) -> Vec<ObjectId> {
        self.connections.iter().map(|r| *r.key()).collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.iter().map(|r| r.value().len()).sum()
    }
}

impl Default for WsStorage {
    fn default() -> Self {
        Self::new()
    }
}
