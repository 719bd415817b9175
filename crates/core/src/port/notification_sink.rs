// Notification transport port
//
// Push-only and synchronous: implementations must not block the caller and
// nobody waits for delivery.

use crate::domain::{Notification, ProgressRecord};

pub trait NotificationSink: Send + Sync {
    fn emit_progress(&self, record: &ProgressRecord);

    fn emit_notification(&self, user_id: &str, notification: &Notification);

    fn emit_development_update(&self, business_id: &str, payload: &serde_json::Value);
}

/// Sink that only logs (used when no transport is configured)
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn emit_progress(&self, record: &ProgressRecord) {
        tracing::debug!(
            subject_id = %record.subject_id,
            stage = %record.stage,
            percent = record.percent,
            "Progress"
        );
    }

    fn emit_notification(&self, user_id: &str, notification: &Notification) {
        tracing::info!(
            user_id = %user_id,
            kind = ?notification.kind,
            title = %notification.title,
            "Notification"
        );
    }

    fn emit_development_update(&self, business_id: &str, _payload: &serde_json::Value) {
        tracing::debug!(business_id = %business_id, "Development update");
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::NotificationKind;
    use std::sync::Mutex;

    /// Records everything pushed through it
    #[derive(Default)]
    pub struct RecordingNotificationSink {
        progress: Mutex<Vec<ProgressRecord>>,
        notifications: Mutex<Vec<(String, Notification)>>,
        updates: Mutex<Vec<(String, serde_json::Value)>>,
    }

    impl RecordingNotificationSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn progress(&self) -> Vec<ProgressRecord> {
            self.progress.lock().unwrap().clone()
        }

        pub fn notifications(&self) -> Vec<(String, Notification)> {
            self.notifications.lock().unwrap().clone()
        }

        pub fn notifications_of(&self, kind: NotificationKind) -> Vec<Notification> {
            self.notifications
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, n)| n.kind == kind)
                .map(|(_, n)| n.clone())
                .collect()
        }

        pub fn development_updates(&self) -> Vec<(String, serde_json::Value)> {
            self.updates.lock().unwrap().clone()
        }
    }

    impl NotificationSink for RecordingNotificationSink {
        fn emit_progress(&self, record: &ProgressRecord) {
            self.progress.lock().unwrap().push(record.clone());
        }

        fn emit_notification(&self, user_id: &str, notification: &Notification) {
            self.notifications
                .lock()
                .unwrap()
                .push((user_id.to_string(), notification.clone()));
        }

        fn emit_development_update(&self, business_id: &str, payload: &serde_json::Value) {
            self.updates
                .lock()
                .unwrap()
                .push((business_id.to_string(), payload.clone()));
        }
    }
}
