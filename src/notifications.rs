use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use uuid::Uuid;

use crate::state::SharedState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
    Payment,
    File,
    Project,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub priority: Priority,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Everything about a notification except what the centre assigns.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub priority: Priority,
    pub title: String,
    pub message: String,
    pub expires_in: Option<Duration>,
    pub action_url: Option<String>,
    pub metadata: Option<Value>,
}

impl NewNotification {
    pub fn new(kind: NotificationKind, priority: Priority, title: &str, message: &str) -> Self {
        Self {
            kind,
            priority,
            title: title.to_string(),
            message: message.to_string(),
            expires_in: None,
            action_url: None,
            metadata: None,
        }
    }

    pub fn action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn expires_in(mut self, ttl: Duration) -> Self {
        self.expires_in = Some(ttl);
        self
    }
}

/// In-process notification inbox per user, newest first.
pub struct NotificationCenter {
    inboxes: DashMap<String, Vec<Notification>>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self {
            inboxes: DashMap::new(),
        }
    }

    pub fn add(&self, user_id: &str, new: NewNotification) -> Notification {
        let now = Utc::now();
        let notification = Notification {
            id: Uuid::now_v7().to_string(),
            kind: new.kind,
            priority: new.priority,
            title: new.title,
            message: new.message,
            read: false,
            created_at: now,
            expires_at: new.expires_in.map(|ttl| now + ttl),
            action_url: new.action_url,
            metadata: new.metadata,
        };

        if notification.priority >= Priority::High {
            tracing::info!(
                user_id,
                priority = ?notification.priority,
                "{}",
                notification.message
            );
        }

        self.inboxes
            .entry(user_id.to_string())
            .or_default()
            .insert(0, notification.clone());
        notification
    }

    pub fn list(&self, user_id: &str) -> Vec<Notification> {
        self.inboxes
            .get(user_id)
            .map(|inbox| inbox.value().clone())
            .unwrap_or_default()
    }

    pub fn unread_count(&self, user_id: &str) -> usize {
        self.inboxes
            .get(user_id)
            .map(|inbox| inbox.iter().filter(|n| !n.read).count())
            .unwrap_or(0)
    }

    /// Returns false when the notification does not exist.
    pub fn mark_read(&self, user_id: &str, id: &str) -> bool {
        let Some(mut inbox) = self.inboxes.get_mut(user_id) else {
            return false;
        };
        match inbox.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&self, user_id: &str) {
        if let Some(mut inbox) = self.inboxes.get_mut(user_id) {
            inbox.iter_mut().for_each(|n| n.read = true);
        }
    }

    /// Returns false when the notification does not exist.
    pub fn remove(&self, user_id: &str, id: &str) -> bool {
        let Some(mut inbox) = self.inboxes.get_mut(user_id) else {
            return false;
        };
        let before = inbox.len();
        inbox.retain(|n| n.id != id);
        inbox.len() != before
    }

    pub fn clear_all(&self, user_id: &str) {
        self.inboxes.remove(user_id);
    }

    /// Drop expired notifications and empty inboxes. Returns how many were removed.
    pub fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        for mut inbox in self.inboxes.iter_mut() {
            let before = inbox.len();
            inbox.retain(|n| n.expires_at.is_none_or(|at| now < at));
            removed += before - inbox.len();
        }
        self.inboxes.retain(|_, inbox| !inbox.is_empty());
        removed
    }
}

/// Background loop dropping expired notifications every `interval`.
pub async fn run_expiry(
    state: SharedState,
    interval: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::debug!("Notification expiry started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let removed = state.notifications.prune_expired(Utc::now());
        if removed > 0 {
            tracing::debug!("Pruned {removed} expired notifications");
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {}
        }
    }

    tracing::debug!("Notification expiry stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(title: &str) -> NewNotification {
        NewNotification::new(NotificationKind::Info, Priority::Low, title, "body")
    }

    #[test]
    fn newest_first_and_unread_count() {
        let center = NotificationCenter::new();
        center.add("u1", info("first"));
        let second = center.add("u1", info("second"));
        center.add("u2", info("other user"));

        let list = center.list("u1");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second.id);
        assert_eq!(center.unread_count("u1"), 2);

        assert!(center.mark_read("u1", &second.id));
        assert_eq!(center.unread_count("u1"), 1);
        center.mark_all_read("u1");
        assert_eq!(center.unread_count("u1"), 0);
        assert_eq!(center.unread_count("u2"), 1);
    }

    #[test]
    fn remove_and_clear() {
        let center = NotificationCenter::new();
        let n = center.add("u1", info("a"));
        center.add("u1", info("b"));
        assert!(center.remove("u1", &n.id));
        assert!(!center.remove("u1", &n.id));
        assert_eq!(center.list("u1").len(), 1);
        center.clear_all("u1");
        assert!(center.list("u1").is_empty());
    }

    #[test]
    fn prune_drops_only_expired() {
        let center = NotificationCenter::new();
        center.add("u1", info("keep"));
        center.add("u1", info("expire").expires_in(Duration::minutes(5)));

        assert_eq!(center.prune_expired(Utc::now()), 0);
        assert_eq!(center.prune_expired(Utc::now() + Duration::minutes(10)), 1);
        assert_eq!(center.list("u1").len(), 1);
        assert_eq!(center.list("u1")[0].title, "keep");
    }
}
