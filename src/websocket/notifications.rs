use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::api::app_state::AppState;
use crate::models::Notification;
use crate::websocket::{TokenQuery, WebSocketMessage, authenticate_query};

/// Fan-out of freshly stored notifications
#[derive(Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<Notification>,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns the number of live subscribers
    pub fn publish(&self, notification: &Notification) -> usize {
        self.sender.send(notification.clone()).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(256)
    }
}

/// `GET /realtime/v1/notifications?access_token=...`
pub async fn notifications_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Response {
    let claims = match authenticate_query(&state.auth, &query) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };
    let rx = state.notifier.hub().subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, claims.sub, rx))
}

async fn handle_socket(socket: WebSocket, user_id: String, mut rx: broadcast::Receiver<Notification>) {
    let (mut sender, mut receiver) = socket.split();
    info!(%user_id, "notification feed connected");

    let hello = WebSocketMessage::new("connected", "notifications", serde_json::json!({"user_id": user_id}));
    if sender.send(Message::Text(hello.to_text())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(notification) if notification.user_id == user_id => {
                    let data = serde_json::to_value(&notification).unwrap_or_default();
                    let message = WebSocketMessage::new("notification", "notifications", data);
                    if sender.send(Message::Text(message.to_text())).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%user_id, skipped, "notification feed lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Ping(payload))) => {
                    if sender.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(%user_id, error = %e, "notification socket error");
                    break;
                }
            },
        }
    }

    debug!(%user_id, "notification feed closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationKind;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let hub = NotificationHub::new(8);
        let n = Notification::new("u1", NotificationKind::Info, "t", "m");
        assert_eq!(hub.publish(&n), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_receives() {
        let hub = NotificationHub::new(8);
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        let n = Notification::new("u1", NotificationKind::Warning, "Prazo", "Vence amanhã");
        assert_eq!(hub.publish(&n), 2);
        assert_eq!(a.recv().await.unwrap().id, n.id);
        assert_eq!(b.recv().await.unwrap().id, n.id);
    }
}
