use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::model::Settings;

/// Application configuration, read from `PATHWAY_*` environment variables.
///
/// Every option has a default; a variable that is set but cannot be parsed is an error
/// rather than being silently ignored.
#[derive(Debug, Clone)]
pub struct Config {
    pub content: ContentConfig,
    pub performance: PerformanceConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct ContentConfig {
    /// Prefix for every content location: a directory path or an http(s) URL ending in `/`.
    pub base_path: String,
    pub structure_file: String,
    pub modules_path: String,
    pub loading: LoadingConfig,
}

#[derive(Debug, Clone)]
pub struct LoadingConfig {
    /// Per-attempt limit; an attempt running longer is cancelled and counts as failed.
    pub timeout: Duration,
    /// Extra attempts after the first failure.
    pub retries: u32,
}

#[derive(Debug, Clone)]
pub struct PerformanceConfig {
    pub max_recent_activities: usize,
    pub max_search_results: usize,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Key the learner's state is stored under.
    pub user_data_key: String,
    /// Directory backing the file store.
    pub dir: PathBuf,
    pub default_settings: Settings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content: ContentConfig {
                base_path: "./docs/content/".to_string(),
                structure_file: "structure.json".to_string(),
                modules_path: "modules/".to_string(),
                loading: LoadingConfig {
                    timeout: Duration::from_millis(10_000),
                    retries: 2,
                },
            },
            performance: PerformanceConfig {
                max_recent_activities: 10,
                max_search_results: 50,
            },
            storage: StorageConfig {
                user_data_key: "learningPathway_userData".to_string(),
                dir: default_storage_dir(),
                default_settings: Settings::default(),
            },
        }
    }
}

impl Config {
    /// Optional:
    /// - `PATHWAY_CONTENT_BASE_PATH`, `PATHWAY_STRUCTURE_FILE`, `PATHWAY_MODULES_PATH`
    /// - `PATHWAY_LOAD_TIMEOUT_MS`, `PATHWAY_LOAD_RETRIES`
    /// - `PATHWAY_MAX_RECENT_ACTIVITIES`, `PATHWAY_MAX_SEARCH_RESULTS`
    /// - `PATHWAY_USER_DATA_KEY`, `PATHWAY_STORAGE_DIR`
    /// - `PATHWAY_DEFAULT_DARK_MODE`, `PATHWAY_DEFAULT_FONT_SIZE`, `PATHWAY_DEFAULT_AUTO_SAVE_NOTES`
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Some(base_path) = lookup("PATHWAY_CONTENT_BASE_PATH") {
            config.content.base_path = base_path;
        }
        if let Some(structure_file) = lookup("PATHWAY_STRUCTURE_FILE") {
            config.content.structure_file = structure_file;
        }
        if let Some(modules_path) = lookup("PATHWAY_MODULES_PATH") {
            config.content.modules_path = modules_path;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "PATHWAY_LOAD_TIMEOUT_MS")? {
            if ms == 0 {
                return Err(AppError::Config(
                    "PATHWAY_LOAD_TIMEOUT_MS must be greater than zero".to_string(),
                ));
            }
            config.content.loading.timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = parse_var(&lookup, "PATHWAY_LOAD_RETRIES")? {
            config.content.loading.retries = retries;
        }
        if let Some(max) = parse_var(&lookup, "PATHWAY_MAX_RECENT_ACTIVITIES")? {
            config.performance.max_recent_activities = max;
        }
        if let Some(max) = parse_var(&lookup, "PATHWAY_MAX_SEARCH_RESULTS")? {
            config.performance.max_search_results = max;
        }
        if let Some(key) = lookup("PATHWAY_USER_DATA_KEY") {
            pathway_common::kv::validate_key(&key)
                .map_err(|e| AppError::Config(format!("PATHWAY_USER_DATA_KEY: {e}")))?;
            config.storage.user_data_key = key;
        }
        if let Some(dir) = lookup("PATHWAY_STORAGE_DIR") {
            config.storage.dir = PathBuf::from(dir);
        }
        if let Some(dark_mode) = parse_var(&lookup, "PATHWAY_DEFAULT_DARK_MODE")? {
            config.storage.default_settings.dark_mode = dark_mode;
        }
        if let Some(font_size) = parse_var(&lookup, "PATHWAY_DEFAULT_FONT_SIZE")? {
            config.storage.default_settings.font_size = font_size;
        }
        if let Some(auto_save) = parse_var(&lookup, "PATHWAY_DEFAULT_AUTO_SAVE_NOTES")? {
            config.storage.default_settings.auto_save_notes = auto_save;
        }

        Ok(config)
    }

    pub fn structure_url(&self) -> String {
        format!("{}{}", self.content.base_path, self.content.structure_file)
    }

    pub fn module_url(&self, module_id: &str) -> String {
        format!(
            "{}{}{}.json",
            self.content.base_path, self.content.modules_path, module_id
        )
    }

    pub fn content_url(&self, content_path: &str) -> String {
        format!("{}{}", self.content.base_path, content_path)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| AppError::Config(format!("{name}={raw:?} is invalid: {e}")))
        })
        .transpose()
}

fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("learning-pathway")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::model::FontSize;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(|_| None).expect("defaults are valid");
        assert_eq!(config.content.base_path, "./docs/content/");
        assert_eq!(config.content.loading.timeout, Duration::from_millis(10_000));
        assert_eq!(config.content.loading.retries, 2);
        assert_eq!(config.performance.max_recent_activities, 10);
        assert_eq!(config.performance.max_search_results, 50);
        assert_eq!(config.storage.user_data_key, "learningPathway_userData");
        assert_eq!(config.storage.default_settings, Settings::default());
        assert_eq!(config.structure_url(), "./docs/content/structure.json");
        assert_eq!(config.module_url("module-3"), "./docs/content/modules/module-3.json");
        assert_eq!(config.content_url("topics/a.md"), "./docs/content/topics/a.md");
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("PATHWAY_CONTENT_BASE_PATH", "https://cdn.example.org/pathway/"),
            ("PATHWAY_LOAD_TIMEOUT_MS", "2500"),
            ("PATHWAY_LOAD_RETRIES", "0"),
            ("PATHWAY_MAX_RECENT_ACTIVITIES", "3"),
            ("PATHWAY_DEFAULT_FONT_SIZE", "large"),
            ("PATHWAY_DEFAULT_AUTO_SAVE_NOTES", "false"),
            ("PATHWAY_STORAGE_DIR", "/tmp/pathway"),
        ]))
        .expect("valid overrides");
        assert_eq!(
            config.module_url("module-1"),
            "https://cdn.example.org/pathway/modules/module-1.json"
        );
        assert_eq!(config.content.loading.timeout, Duration::from_millis(2500));
        assert_eq!(config.content.loading.retries, 0);
        assert_eq!(config.performance.max_recent_activities, 3);
        assert_eq!(config.storage.default_settings.font_size, FontSize::Large);
        assert!(!config.storage.default_settings.auto_save_notes);
        assert_eq!(config.storage.dir, PathBuf::from("/tmp/pathway"));
    }

    #[test]
    fn invalid_values_are_errors() {
        for (name, value) in [
            ("PATHWAY_LOAD_TIMEOUT_MS", "soon"),
            ("PATHWAY_LOAD_TIMEOUT_MS", "0"),
            ("PATHWAY_LOAD_RETRIES", "-1"),
            ("PATHWAY_DEFAULT_DARK_MODE", "yes please"),
            ("PATHWAY_DEFAULT_FONT_SIZE", "huge"),
            ("PATHWAY_USER_DATA_KEY", "../data"),
        ] {
            let err = Config::from_lookup(lookup_from(&[(name, value)])).unwrap_err();
            assert!(
                matches!(err, AppError::Config(_)),
                "{name}={value} should be a config error"
            );
        }
    }
}
