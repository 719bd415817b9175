// Progress reporting for one workflow run

use crate::domain::ProgressRecord;
use crate::port::{NotificationSink, TimeProvider};
use std::sync::Arc;

/// Emits progress records whose percent never goes backwards
pub struct ProgressTracker {
    subject_id: String,
    sink: Arc<dyn NotificationSink>,
    time_provider: Arc<dyn TimeProvider>,
    last_percent: u8,
}

impl ProgressTracker {
    pub fn new(
        subject_id: impl Into<String>,
        sink: Arc<dyn NotificationSink>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            sink,
            time_provider,
            last_percent: 0,
        }
    }

    pub fn percent(&self) -> u8 {
        self.last_percent
    }

    /// Push a record; regressions are clamped to the last percent
    pub fn report(&mut self, stage: &str, percent: u8, message: impl Into<String>) -> ProgressRecord {
        let percent = percent.min(100).max(self.last_percent);
        self.last_percent = percent;
        let record = ProgressRecord {
            subject_id: self.subject_id.clone(),
            stage: stage.to_string(),
            percent,
            message: message.into(),
            timestamp: self.time_provider.now_millis(),
        };
        self.sink.emit_progress(&record);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::notification_sink::mocks::RecordingNotificationSink;
    use crate::port::time_provider::mocks::ManualClock;

    #[test]
    fn test_percent_never_decreases() {
        let sink = Arc::new(RecordingNotificationSink::new());
        let mut tracker = ProgressTracker::new("req-1", sink.clone(), Arc::new(ManualClock::new(5)));

        tracker.report("setup", 5, "starting");
        tracker.report("plan", 50, "planning");
        let regressed = tracker.report("plan", 45, "retrying plan");
        tracker.report("done", 250, "finished");

        assert_eq!(regressed.percent, 50);
        let percents: Vec<u8> = sink.progress().iter().map(|r| r.percent).collect();
        assert_eq!(percents, vec![5, 50, 50, 100]);
    }
}
