use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// --- Curriculum content ---

/// Top-level manifest: phases and specialized areas, each listing module ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Structure {
    pub phases: Vec<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialized_areas: Option<Vec<Phase>>,
}

impl Structure {
    /// Every module id in list order, phases before specialized areas. Duplicates are kept.
    pub fn module_ids(&self) -> Vec<String> {
        self.all_groups()
            .flat_map(|group| group.modules.iter().cloned())
            .collect()
    }

    pub fn module_count(&self) -> usize {
        self.all_groups().map(|group| group.modules.len()).sum()
    }

    pub fn specialized_areas(&self) -> &[Phase] {
        self.specialized_areas.as_deref().unwrap_or(&[])
    }

    /// Phases followed by specialized areas.
    pub fn all_groups(&self) -> impl Iterator<Item = &Phase> {
        self.phases.iter().chain(self.specialized_areas())
    }
}

/// A phase or specialized area. Modules are referenced by id, not embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub estimated_time: String,
    /// Global sequencing key. Not guaranteed unique or contiguous.
    pub order: i64,
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    /// Containing phase id; only filled in for placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip)]
    pub placeholder: bool,
}

impl Module {
    /// Stand-in for a module whose document is missing or unreadable.
    ///
    /// Ids of the form `module-N` produce "Module N (Coming Soon)" with order N;
    /// anything else gets `?` and order 999.
    pub fn placeholder(id: &str, phase: Option<String>) -> Self {
        let number = id.split('-').nth(1).filter(|s| !s.is_empty()).unwrap_or("?");
        let order = leading_integer(number).unwrap_or(999);

        Self {
            id: id.to_string(),
            title: format!("Module {number} (Coming Soon)"),
            description: "This module is currently under development. Check back soon for new content."
                .to_string(),
            estimated_time: "TBD".to_string(),
            order,
            topics: Vec::new(),
            resources: Vec::new(),
            phase,
            placeholder: true,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn subtopic_ids(&self) -> impl Iterator<Item = &str> {
        self.topics
            .iter()
            .flat_map(|t| t.subtopics.iter().map(|s| s.id.as_str()))
    }
}

/// Parses the leading run of ASCII digits, so "3b" yields 3 and "x3" yields nothing.
fn leading_integer(s: &str) -> Option<i64> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Path of the topic body relative to the content base path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_path: Option<String>,
    #[serde(default)]
    pub subtopics: Vec<Subtopic>,
}

/// Finest-grained completable unit. Ids are globally unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtopic {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type", default)]
    pub kind: ResourceKind,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Documentation,
    Video,
    Guide,
    Tool,
    Project,
    #[default]
    #[serde(other)]
    Other,
}

// --- Learner state ---

/// Everything persisted for one learner. Serialized whole on every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub completed_modules: Vec<String>,
    /// Completed subtopic ids.
    pub completed_topics: Vec<String>,
    pub bookmarks: Vec<Bookmark>,
    /// Keyed by topic id.
    pub notes: BTreeMap<String, String>,
    /// Most recent first.
    pub activities: Vec<Activity>,
    pub settings: Settings,
    /// Milliseconds since the Unix epoch.
    pub last_updated: i64,
    /// Keys written by other versions of the client, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserData {
    pub fn new(settings: Settings) -> Self {
        Self {
            completed_modules: Vec::new(),
            completed_topics: Vec::new(),
            bookmarks: Vec::new(),
            notes: BTreeMap::new(),
            activities: Vec::new(),
            settings,
            last_updated: now_millis(),
            extra: Map::new(),
        }
    }

    pub fn is_module_completed(&self, module_id: &str) -> bool {
        self.completed_modules.iter().any(|id| id == module_id)
    }

    pub fn is_subtopic_completed(&self, subtopic_id: &str) -> bool {
        self.completed_topics.iter().any(|id| id == subtopic_id)
    }

    pub fn is_bookmarked(&self, kind: ItemKind, id: &str) -> bool {
        self.bookmarks.iter().any(|b| b.kind == kind && b.id == id)
    }

    pub fn note(&self, topic_id: &str) -> Option<&str> {
        self.notes.get(topic_id).map(String::as_str)
    }
}

/// What a bookmark or activity points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Module,
    Topic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_title: Option<String>,
    /// Set by the store when the bookmark is added.
    #[serde(default)]
    pub timestamp: i64,
}

impl Bookmark {
    pub fn new(kind: ItemKind, id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            title: title.into(),
            module_id: None,
            module_title: None,
            timestamp: 0,
        }
    }

    pub fn in_module(mut self, module_id: impl Into<String>, module_title: impl Into<String>) -> Self {
        self.module_id = Some(module_id.into());
        self.module_title = Some(module_title.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    /// Filled in by the store when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Activity {
    pub fn new(kind: ItemKind, id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            title: title.into(),
            module_id: None,
            timestamp: None,
        }
    }

    pub fn in_module(mut self, module_id: impl Into<String>) -> Self {
        self.module_id = Some(module_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub dark_mode: bool,
    pub font_size: FontSize,
    pub auto_save_notes: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dark_mode: false,
            font_size: FontSize::Medium,
            auto_save_notes: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl std::str::FromStr for FontSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            other => Err(format!("unknown font size: {other}")),
        }
    }
}

/// Partial settings update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<FontSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_save_notes: Option<bool>,
}

impl Settings {
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(dark_mode) = patch.dark_mode {
            self.dark_mode = dark_mode;
        }
        if let Some(font_size) = patch.font_size {
            self.font_size = font_size;
        }
        if let Some(auto_save_notes) = patch.auto_save_notes {
            self.auto_save_notes = auto_save_notes;
        }
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
