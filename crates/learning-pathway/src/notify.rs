/// Seam for user-facing notifications raised by the core (the toast layer of a UI).
use std::sync::{Mutex, MutexGuard};

use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotificationLevel, message: &str);
}

/// Default notifier for headless use: notifications go to the log.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        match level {
            NotificationLevel::Info | NotificationLevel::Success => info!(text = message, "notification"),
            NotificationLevel::Warning => warn!(text = message, "notification"),
            NotificationLevel::Error => error!(text = message, "notification"),
        }
    }
}

/// Keeps every notification in memory so callers can render or inspect them later.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    entries: Mutex<Vec<(NotificationLevel, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(NotificationLevel, String)> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(NotificationLevel, String)>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        self.lock().push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn recording_survives_a_poisoned_lock() {
        let notifier = Arc::new(RecordingNotifier::new());
        notifier.notify(NotificationLevel::Info, "before");

        let holder = Arc::clone(&notifier);
        let joined = std::thread::spawn(move || {
            let _entries = holder.entries.lock().unwrap();
            panic!("panicked while recording");
        })
        .join();
        assert!(joined.is_err());
        assert!(notifier.entries.is_poisoned());

        notifier.notify(NotificationLevel::Error, "after");
        assert_eq!(
            notifier.entries(),
            vec![
                (NotificationLevel::Info, "before".to_string()),
                (NotificationLevel::Error, "after".to_string()),
            ]
        );
    }
}
