//! WebRTC signaling relay
//!
//! Peers join a room with `{"type":"join","room":..,"peer_id":..}`. After
//! that every text frame a peer sends is relayed verbatim to the other
//! peers of the room. Joins and departures are announced with
//! `peer-joined` / `peer-left` messages.

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::api::app_state::AppState;
use crate::error::{AppError, Result};
use crate::websocket::{TokenQuery, WebSocketMessage, authenticate_query};

type PeerSender = mpsc::UnboundedSender<String>;

#[derive(Debug, Deserialize)]
struct JoinMessage {
    r#type: String,
    room: String,
    peer_id: String,
}

/// Rooms and the outbound channel of each peer in them
#[derive(Clone, Default)]
pub struct SignalingHub {
    rooms: Arc<DashMap<String, HashMap<String, PeerSender>>>,
}

impl SignalingHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer and announce it; returns the ids already present
    pub fn join(&self, room: &str, peer_id: &str, sender: PeerSender) -> Result<Vec<String>> {
        let mut peers = self.rooms.entry(room.to_string()).or_default();
        if peers.contains_key(peer_id) {
            return Err(AppError::Validation(format!(
                "peer {} already joined room {}",
                peer_id, room
            )));
        }

        let announcement = WebSocketMessage::new("peer-joined", room, json!({"peer_id": peer_id})).to_text();
        let existing: Vec<String> = peers.keys().cloned().collect();
        for other in peers.values() {
            let _ = other.send(announcement.clone());
        }
        peers.insert(peer_id.to_string(), sender);
        Ok(existing)
    }

    /// Send `text` to everyone in the room except `from`
    pub fn relay(&self, room: &str, from: &str, text: &str) -> usize {
        let Some(peers) = self.rooms.get(room) else {
            return 0;
        };
        peers
            .iter()
            .filter(|(id, _)| id.as_str() != from)
            .filter(|(_, tx)| tx.send(text.to_string()).is_ok())
            .count()
    }

    pub fn leave(&self, room: &str, peer_id: &str) {
        let now_empty = match self.rooms.get_mut(room) {
            Some(mut peers) => {
                peers.remove(peer_id);
                let announcement = WebSocketMessage::new("peer-left", room, json!({"peer_id": peer_id})).to_text();
                for other in peers.values() {
                    let _ = other.send(announcement.clone());
                }
                peers.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.rooms.remove_if(room, |_, peers| peers.is_empty());
        }
    }

    pub fn peer_count(&self, room: &str) -> usize {
        self.rooms.get(room).map(|p| p.len()).unwrap_or(0)
    }
}

/// `GET /functions/v1/webrtc-signaling?access_token=...`
pub async fn signaling_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Response {
    if let Err(e) = authenticate_query(&state.auth, &query) {
        return e.into_response();
    }
    let hub = state.signaling.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: SignalingHub) {
    let (mut sender, mut receiver) = socket.split();

    // The first text frame must be a join
    let join = loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<JoinMessage>(&text) {
                Ok(join) if join.r#type == "join" && !join.room.is_empty() && !join.peer_id.is_empty() => break join,
                _ => {
                    let error = WebSocketMessage::new("error", "signaling", json!({"message": "expected join message"}));
                    if sender.send(Message::Text(error.to_text())).await.is_err() {
                        return;
                    }
                }
            },
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
            Some(Ok(_)) => {}
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let peers = match hub.join(&join.room, &join.peer_id, tx) {
        Ok(peers) => peers,
        Err(e) => {
            let error = WebSocketMessage::new("error", "signaling", json!({"message": e.to_string()}));
            let _ = sender.send(Message::Text(error.to_text())).await;
            return;
        }
    };
    info!(room = %join.room, peer_id = %join.peer_id, "peer joined signaling room");

    let joined = WebSocketMessage::new("joined", &join.room, json!({"peer_id": join.peer_id, "peers": peers}));
    if sender.send(Message::Text(joined.to_text())).await.is_err() {
        hub.leave(&join.room, &join.peer_id);
        return;
    }

    let mut forward = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    hub.relay(&join.room, &join.peer_id, &text);
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
            _ = &mut forward => break,
        }
    }

    hub.leave(&join.room, &join.peer_id);
    forward.abort();
    debug!(room = %join.room, peer_id = %join.peer_id, "peer left signaling room");
}
