/// Observable load state of the content loader.
///
/// Subscribers are called synchronously on every transition and after every module
/// completes. Callbacks run outside the internal lock, so a subscriber may read
/// `current()` or unsubscribe itself.
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Complete,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadingState {
    pub state: LoadState,
    pub progress: usize,
    pub total: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoadingState {
    pub fn loading(progress: usize, total: usize, message: impl Into<String>) -> Self {
        Self {
            state: LoadState::Loading,
            progress,
            total,
            message: message.into(),
            error: None,
        }
    }

    pub fn complete(total: usize, message: impl Into<String>) -> Self {
        Self {
            state: LoadState::Complete,
            progress: total,
            total,
            message: message.into(),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            state: LoadState::Error,
            progress: 0,
            total: 0,
            message: message.into(),
            error: Some(error.into()),
        }
    }

    /// Completion percentage, 0 when nothing is known yet.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.progress.min(self.total) * 100) / self.total) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&LoadingState) + Send + Sync>;

#[derive(Default)]
pub struct LoadingStatePublisher {
    current: Mutex<LoadingState>,
    subscribers: Mutex<BTreeMap<SubscriptionId, Callback>>,
    next_id: AtomicU64,
}

impl LoadingStatePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LoadingState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.subscribers).insert(id, Arc::new(callback));
        id
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        lock(&self.subscribers).remove(&id).is_some()
    }

    pub fn current(&self) -> LoadingState {
        lock(&self.current).clone()
    }

    pub fn publish(&self, state: LoadingState) {
        *lock(&self.current) = state.clone();
        let callbacks: Vec<Callback> = lock(&self.subscribers).values().cloned().collect();
        for callback in callbacks {
            callback(&state);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let publisher = LoadingStatePublisher::new();
        let state = publisher.current();
        assert_eq!(state.state, LoadState::Idle);
        assert_eq!(state.percent(), 0);
    }

    #[test]
    fn subscribers_see_every_publish_until_unsubscribed() {
        let publisher = LoadingStatePublisher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = publisher.subscribe(move |s| sink.lock().unwrap().push((s.state, s.progress)));

        publisher.publish(LoadingState::loading(0, 4, "Loading modules..."));
        publisher.publish(LoadingState::loading(1, 4, "Loaded 1 of 4 modules..."));
        assert!(publisher.unsubscribe(id));
        assert!(!publisher.unsubscribe(id));
        publisher.publish(LoadingState::complete(4, "Content loaded successfully"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(LoadState::Loading, 0), (LoadState::Loading, 1)]
        );
        let current = publisher.current();
        assert_eq!(current.state, LoadState::Complete);
        assert_eq!(current.percent(), 100);
    }

    #[test]
    fn subscriber_can_read_current_state() {
        let publisher = Arc::new(LoadingStatePublisher::new());
        let inner = Arc::clone(&publisher);
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        publisher.subscribe(move |_| *sink.lock().unwrap() = Some(inner.current().message));

        publisher.publish(LoadingState::loading(0, 1, "Loading content structure..."));
        assert_eq!(
            seen.lock().unwrap().as_deref(),
            Some("Loading content structure...")
        );
    }

    #[test]
    fn serializes_like_the_event_payload() {
        let value = serde_json::to_value(LoadingState::error("Failed to load content", "status 500"))
            .unwrap();
        assert_eq!(value["state"], "error");
        assert_eq!(value["error"], "status 500");
        let value = serde_json::to_value(LoadingState::loading(2, 5, "x")).unwrap();
        assert!(value.get("error").is_none());
        assert_eq!(LoadingState::loading(2, 5, "x").percent(), 40);
    }
}
