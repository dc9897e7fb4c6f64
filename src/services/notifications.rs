//! Notification delivery
//!
//! Persists a notification and pushes it to the owner's open realtime
//! sockets.

use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::{Notification, NotificationKind};
use crate::storage::factory::Table;
use crate::storage::repository::{Filter, Repository};
use crate::websocket::NotificationHub;

#[derive(Clone)]
pub struct Notifier {
    table: Table<Notification>,
    hub: NotificationHub,
}

impl Notifier {
    pub fn new(table: Table<Notification>, hub: NotificationHub) -> Self {
        Self { table, hub }
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    /// Store and broadcast
    pub async fn send(&self, notification: Notification) -> Result<Notification> {
        let stored = self.table.create(&notification).await?;
        let receivers = self.hub.publish(&stored);
        debug!(user_id = %stored.user_id, receivers, "notification published");
        Ok(stored)
    }

    pub async fn notify(
        &self,
        user_id: &str,
        kind: NotificationKind,
        title: &str,
        message: &str,
    ) -> Result<Notification> {
        self.send(Notification::new(user_id, kind, title, message)).await
    }

    /// Mark one of the user's notifications read
    pub async fn mark_read(&self, user_id: &str, id: &str) -> Result<Notification> {
        let mut notification = self
            .table
            .get_by_id(id)
            .await?
            .filter(|n| n.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("notification {}", id)))?;

        if !notification.read {
            notification.read = true;
            self.table.update(id, &notification).await?;
        }
        Ok(notification)
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<u64> {
        let filter = Filter::new().eq("user_id", user_id).eq("read", false);
        self.table.count(&filter).await
    }
}
