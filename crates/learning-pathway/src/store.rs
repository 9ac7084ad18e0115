/// Persistence of the learner's progress, bookmarks, notes, activity and settings.
///
/// The whole `UserData` document lives under one key and is re-serialized on every
/// write. Mutators take the document by value and hand back the updated one. A failed
/// write never loses the in-memory state: the caller keeps the returned value, and
/// the failure is surfaced through the `Notifier`.
use std::sync::Arc;

use pathway_common::kv::KeyValueStore;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::migrate::migrate_user_data;
use crate::model::{now_millis, Activity, Bookmark, ItemKind, Settings, SettingsPatch, UserData};
use crate::notify::{NotificationLevel, Notifier};

const SAVE_FAILED_MESSAGE: &str = "Failed to save your progress";

pub struct ProgressStore {
    storage: Box<dyn KeyValueStore>,
    key: String,
    default_settings: Settings,
    max_recent_activities: usize,
    notifier: Arc<dyn Notifier>,
}

impl ProgressStore {
    pub fn new(
        storage: Box<dyn KeyValueStore>,
        config: &Config,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            storage,
            key: config.storage.user_data_key.clone(),
            default_settings: config.storage.default_settings.clone(),
            max_recent_activities: config.performance.max_recent_activities,
            notifier,
        }
    }

    /// A fresh document with the configured default settings.
    pub fn defaults(&self) -> UserData {
        UserData::new(self.default_settings.clone())
    }

    /// Load the stored document, bringing it up to the current shape.
    ///
    /// Never fails. Missing, unreadable or corrupt data is replaced by defaults, which
    /// are written back immediately.
    pub fn init(&self) -> UserData {
        match self.load() {
            Ok(Some(data)) => {
                debug!(key = %self.key, "user data loaded");
                data
            }
            Ok(None) => {
                info!(key = %self.key, "no stored user data, starting fresh");
                self.reset_user_data()
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "stored user data unusable, resetting to defaults");
                self.reset_user_data()
            }
        }
    }

    fn load(&self) -> Result<Option<UserData>, AppError> {
        let Some(raw) = self.storage.get(&self.key)? else {
            return Ok(None);
        };
        let invalid = |source| AppError::InvalidJson {
            location: self.key.clone(),
            source,
        };
        let value: serde_json::Value = serde_json::from_str(&raw).map_err(invalid)?;
        let data = migrate_user_data(&self.defaults(), value).map_err(invalid)?;
        Ok(Some(data))
    }

    /// Stamp `last_updated` and write the whole document. Returns false when the write
    /// failed; the learner is notified and `data` stays authoritative.
    pub fn save_user_data(&self, data: &mut UserData) -> bool {
        data.last_updated = now_millis();
        let result = serde_json::to_string(&*data)
            .map_err(|source| AppError::InvalidJson {
                location: self.key.clone(),
                source,
            })
            .and_then(|json| Ok(self.storage.set(&self.key, &json)?));

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to save user data");
                self.notifier.notify(NotificationLevel::Error, SAVE_FAILED_MESSAGE);
                false
            }
        }
    }

    pub fn reset_user_data(&self) -> UserData {
        let mut data = self.defaults();
        self.save_user_data(&mut data);
        data
    }

    fn persist(&self, mut data: UserData) -> UserData {
        self.save_user_data(&mut data);
        data
    }

    // --- Completion ---

    pub fn complete_module(&self, mut data: UserData, module_id: &str) -> UserData {
        if data.is_module_completed(module_id) {
            return data;
        }
        data.completed_modules.push(module_id.to_string());
        self.persist(data)
    }

    pub fn uncomplete_module(&self, mut data: UserData, module_id: &str) -> UserData {
        data.completed_modules.retain(|id| id != module_id);
        self.persist(data)
    }

    /// Completion is tracked per subtopic id.
    pub fn complete_topic(&self, mut data: UserData, subtopic_id: &str) -> UserData {
        if data.is_subtopic_completed(subtopic_id) {
            return data;
        }
        data.completed_topics.push(subtopic_id.to_string());
        self.persist(data)
    }

    pub fn uncomplete_topic(&self, mut data: UserData, subtopic_id: &str) -> UserData {
        data.completed_topics.retain(|id| id != subtopic_id);
        self.persist(data)
    }

    pub fn complete_multiple_topics<S: AsRef<str>>(
        &self,
        mut data: UserData,
        subtopic_ids: &[S],
    ) -> UserData {
        for id in subtopic_ids {
            let id = id.as_ref();
            if !data.is_subtopic_completed(id) {
                data.completed_topics.push(id.to_string());
            }
        }
        self.persist(data)
    }

    pub fn uncomplete_multiple_topics<S: AsRef<str>>(
        &self,
        mut data: UserData,
        subtopic_ids: &[S],
    ) -> UserData {
        data.completed_topics
            .retain(|id| !subtopic_ids.iter().any(|s| s.as_ref() == id));
        self.persist(data)
    }

    // --- Bookmarks ---

    /// No-op when a bookmark of the same kind and id exists.
    pub fn add_bookmark(&self, mut data: UserData, mut bookmark: Bookmark) -> UserData {
        if data.is_bookmarked(bookmark.kind, &bookmark.id) {
            return data;
        }
        bookmark.timestamp = now_millis();
        data.bookmarks.push(bookmark);
        self.persist(data)
    }

    pub fn remove_bookmark(&self, mut data: UserData, kind: ItemKind, id: &str) -> UserData {
        data.bookmarks.retain(|b| !(b.kind == kind && b.id == id));
        self.persist(data)
    }

    // --- Notes ---

    pub fn save_note(&self, mut data: UserData, topic_id: &str, content: &str) -> UserData {
        data.notes.insert(topic_id.to_string(), content.to_string());
        self.persist(data)
    }

    pub fn delete_note(&self, mut data: UserData, topic_id: &str) -> UserData {
        if data.notes.remove(topic_id).is_none() {
            return data;
        }
        self.persist(data)
    }

    // --- Activity and settings ---

    /// Prepend `activity`, keeping at most the configured number of recent entries.
    pub fn add_activity(&self, mut data: UserData, mut activity: Activity) -> UserData {
        activity.timestamp.get_or_insert_with(now_millis);
        data.activities.insert(0, activity);
        data.activities.truncate(self.max_recent_activities);
        self.persist(data)
    }

    pub fn update_settings(&self, mut data: UserData, patch: &SettingsPatch) -> UserData {
        data.settings.apply(patch);
        self.persist(data)
    }
}
