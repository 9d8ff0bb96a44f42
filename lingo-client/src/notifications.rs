use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::api::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// A transient snackbar-style message
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub severity: Severity,
    pub message: String,
    created_at: Instant,
}

impl Notification {
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.created_at) >= ttl
    }
}

/// Queue of transient notifications, each visible for `ttl`
#[derive(Debug, Clone)]
pub struct Notifier {
    ttl: Duration,
    queue: Vec<Notification>,
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            queue: Vec::new(),
        }
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) -> Uuid {
        self.push_at(severity, message, Instant::now())
    }

    fn push_at(&mut self, severity: Severity, message: impl Into<String>, at: Instant) -> Uuid {
        let id = Uuid::new_v4();
        self.queue.push(Notification {
            id,
            severity,
            message: message.into(),
            created_at: at,
        });
        id
    }

    pub fn info(&mut self, message: impl Into<String>) -> Uuid {
        self.push(Severity::Info, message)
    }

    pub fn success(&mut self, message: impl Into<String>) -> Uuid {
        self.push(Severity::Success, message)
    }

    /// Shows the user-facing form of `error`
    pub fn error(&mut self, error: &ApiError) -> Uuid {
        self.push(Severity::Error, error.user_message())
    }

    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.queue.len();
        self.queue.retain(|n| n.id != id);
        self.queue.len() != before
    }

    /// Drops everything older than the TTL; returns how many were dropped
    pub fn clear_expired(&mut self) -> usize {
        self.clear_expired_at(Instant::now())
    }

    fn clear_expired_at(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let before = self.queue.len();
        self.queue.retain(|n| !n.is_expired(now, ttl));
        before - self.queue.len()
    }

    /// Notifications still visible, oldest first
    pub fn active(&self) -> impl Iterator<Item = &Notification> {
        let now = Instant::now();
        self.queue.iter().filter(move |n| !n.is_expired(now, self.ttl))
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.active().last()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(crate::config::ClientConfig::default().notification_ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_dismiss() {
        let mut notifier = Notifier::new(Duration::from_secs(60));
        let id = notifier.info("Saved");
        notifier.success("Uploaded");
        assert_eq!(notifier.len(), 2);
        assert_eq!(notifier.latest().map(|n| n.message.as_str()), Some("Uploaded"));

        assert!(notifier.dismiss(id));
        assert!(!notifier.dismiss(id));
        assert_eq!(notifier.len(), 1);
    }

    #[test]
    fn test_error_uses_user_message() {
        let mut notifier = Notifier::new(Duration::from_secs(60));
        let err = ApiError::Api {
            status: 500,
            message: "db down".to_string(),
        };
        notifier.error(&err);
        let latest = notifier.latest().unwrap();
        assert_eq!(latest.severity, Severity::Error);
        assert_eq!(latest.message, err.user_message());
    }

    #[test]
    fn test_clear_expired() {
        let mut notifier = Notifier::new(Duration::from_secs(4));
        let start = Instant::now();
        notifier.push_at(Severity::Info, "old", start);
        notifier.push_at(Severity::Info, "new", start + Duration::from_secs(3));

        assert_eq!(notifier.clear_expired_at(start + Duration::from_secs(5)), 1);
        assert_eq!(notifier.len(), 1);
        assert_eq!(notifier.clear_expired_at(start + Duration::from_secs(7)), 1);
        assert!(notifier.is_empty());
    }
}
