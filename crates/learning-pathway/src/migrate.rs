/// Structural migration of persisted learner state.
///
/// There is no schema version. Loading backfills every key the current defaults define
/// but the stored document lacks, recursing into nested objects. Arrays and scalars are
/// atomic: a stored value always replaces the default wholesale. Only additive schema
/// changes are handled; renamed or removed fields need an explicit step here.
use serde_json::Value;

use crate::model::UserData;

/// Merge `loaded` over `defaults`.
///
/// When both sides are objects, keys from `loaded` override or recurse into the
/// matching default and keys only present in `defaults` are kept. Otherwise `loaded`
/// wins as-is.
pub fn deep_merge(defaults: &Value, loaded: Value) -> Value {
    match (defaults, loaded) {
        (Value::Object(target), Value::Object(source)) => {
            let mut output = target.clone();
            for (key, value) in source {
                let merged = match (target.get(&key), value) {
                    (Some(default), value @ Value::Object(_)) => deep_merge(default, value),
                    (_, value) => value,
                };
                output.insert(key, merged);
            }
            Value::Object(output)
        }
        (_, loaded) => loaded,
    }
}

/// Bring a stored document up to the current `UserData` shape.
pub fn migrate_user_data(defaults: &UserData, loaded: Value) -> Result<UserData, serde_json::Error> {
    let defaults = serde_json::to_value(defaults)?;
    serde_json::from_value(deep_merge(&defaults, loaded))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{FontSize, Settings};

    #[test]
    fn fills_missing_nested_keys() {
        let defaults = json!({"settings": {"darkMode": false, "fontSize": "medium", "autoSaveNotes": true}});
        let loaded = json!({"settings": {"darkMode": true, "fontSize": "large"}});
        let merged = deep_merge(&defaults, loaded);
        assert_eq!(
            merged,
            json!({"settings": {"darkMode": true, "fontSize": "large", "autoSaveNotes": true}})
        );
    }

    #[test]
    fn arrays_are_replaced_not_merged() {
        let defaults = json!({"completedModules": ["module-1", "module-2"], "bookmarks": []});
        let loaded = json!({"completedModules": ["module-3"]});
        let merged = deep_merge(&defaults, loaded);
        assert_eq!(merged["completedModules"], json!(["module-3"]));
        assert_eq!(merged["bookmarks"], json!([]));
    }

    #[test]
    fn loaded_object_without_default_is_taken_whole() {
        let defaults = json!({"notes": {}});
        let loaded = json!({"notes": {"t1": "a"}, "flags": {"beta": true}});
        let merged = deep_merge(&defaults, loaded);
        assert_eq!(merged["notes"], json!({"t1": "a"}));
        assert_eq!(merged["flags"], json!({"beta": true}));
    }

    #[test]
    fn type_mismatch_keeps_loaded_value() {
        let defaults = json!({"settings": {"darkMode": false}});
        assert_eq!(deep_merge(&defaults, json!([1, 2])), json!([1, 2]));
        let merged = deep_merge(&defaults, json!({"settings": "legacy"}));
        assert_eq!(merged["settings"], json!("legacy"));
    }

    #[test]
    fn migrate_backfills_settings_and_keeps_progress() {
        let defaults = UserData::new(Settings {
            dark_mode: false,
            font_size: FontSize::Medium,
            auto_save_notes: true,
        });
        let stored = json!({
            "completedModules": ["module-2"],
            "completedTopics": ["s1", "s2"],
            "bookmarks": [],
            "notes": {"t1": "hi"},
            "activities": [],
            "settings": {"darkMode": true, "fontSize": "small"},
            "lastUpdated": 1000
        });
        let data = migrate_user_data(&defaults, stored).expect("migrates");
        assert!(data.settings.auto_save_notes);
        assert!(data.settings.dark_mode);
        assert_eq!(data.settings.font_size, FontSize::Small);
        assert_eq!(data.completed_topics, vec!["s1", "s2"]);
        assert_eq!(data.last_updated, 1000);
    }

    #[test]
    fn migrate_fills_missing_top_level_collections() {
        let defaults = UserData::new(Settings::default());
        let stored = json!({"completedModules": ["module-1"]});
        let data = migrate_user_data(&defaults, stored).expect("migrates");
        assert_eq!(data.completed_modules, vec!["module-1"]);
        assert!(data.bookmarks.is_empty());
        assert!(data.notes.is_empty());
        assert_eq!(data.settings, Settings::default());
    }

    #[test]
    fn migrate_rejects_wrongly_typed_fields() {
        let defaults = UserData::new(Settings::default());
        let stored = json!({"completedModules": "module-1"});
        assert!(migrate_user_data(&defaults, stored).is_err());
    }
}
