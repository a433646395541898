use axum::extract::ws::Message;
use bson::oid::ObjectId;
use futures::SinkExt;
use tracing::{debug, warn};

use super::events::ChangeEvent;
use super::storage::WsStorage;

/// Sends `event` to every open connection of the given users.
pub async fn broadcast(ws_storage: &WsStorage, user_ids: &[ObjectId], event: &ChangeEvent) {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!(%e, "Failed to serialize WS event");
            return;
        }
    };

    for user_id in user_ids {
        for sender in ws_storage.get_senders(user_id) {
            let mut guard = sender.lock().await;
            if let Err(e) = guard.send(Message::text(text.clone())).await {
                warn!(?user_id, %e, "Failed to send WS message");
            } else {
                debug!(?user_id, event = event.kind(), "WS event sent");
            }
        }
    }
}

/// Sends `event` to everyone currently connected.
pub async fn broadcast_all(ws_storage: &WsStorage, event: &ChangeEvent) {
    let user_ids = ws_storage.all_user_ids();
    broadcast(ws_storage, &user_ids, event).await;
}
