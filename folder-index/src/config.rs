//! Settings read by the folder index.
//!
//! The host owns the configuration store; the index only reads it through
//! [`ConfigProvider`]. Every accessor may come back empty, in which case the
//! documented default applies.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{FolderIndexError, Result};

/// Glob pattern to enabled flag.
pub type ExclusionRules = BTreeMap<String, bool>;

pub const CACHE_TTL_KEY: &str = "folderIndex.cacheTtlMinutes";
pub const FILES_EXCLUDE_KEY: &str = "files.exclude";
pub const SEARCH_EXCLUDE_KEY: &str = "search.exclude";
pub const VERBOSE_LOGGING_KEY: &str = "folderIndex.verboseLogging";
pub const IO_TIMEOUT_KEY: &str = "folderIndex.ioTimeoutMs";

/// Cache lifetime used when the host supplies none.
pub const DEFAULT_CACHE_TTL_MINUTES: i64 = 60;

/// Read access to the host's configuration store.
pub trait ConfigProvider: Send + Sync {
    /// Snapshot lifetime in minutes. Zero or negative disables caching.
    fn cache_ttl_minutes(&self) -> Option<i64>;

    /// General file-exclusion rules.
    fn files_exclude(&self) -> Option<ExclusionRules>;

    /// Search-exclusion rules; these win over `files_exclude` per pattern.
    fn search_exclude(&self) -> Option<ExclusionRules>;

    /// Whether per-directory diagnostics are logged.
    fn verbose_logging(&self) -> Option<bool>;

    /// Upper bound for a single directory listing or ignore query.
    fn io_timeout_ms(&self) -> Option<u64> {
        None
    }
}

/// Resolved settings with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FolderIndexSettings {
    /// Snapshot lifetime in minutes.
    pub cache_ttl_minutes: i64,

    /// General exclusion rules.
    pub files_exclude: ExclusionRules,

    /// Search exclusion rules.
    pub search_exclude: ExclusionRules,

    /// Log per-directory diagnostics.
    pub verbose_logging: bool,

    /// Per-call timeout for host I/O, in milliseconds.
    pub io_timeout_ms: Option<u64>,
}

impl Default for FolderIndexSettings {
    fn default() -> Self {
        Self {
            cache_ttl_minutes: DEFAULT_CACHE_TTL_MINUTES,
            files_exclude: ExclusionRules::new(),
            search_exclude: ExclusionRules::new(),
            verbose_logging: false,
            io_timeout_ms: None,
        }
    }
}

impl FolderIndexSettings {
    /// Read every setting from `provider`, falling back to defaults.
    pub fn resolve(provider: &dyn ConfigProvider) -> Self {
        let defaults = Self::default();
        Self {
            cache_ttl_minutes: provider
                .cache_ttl_minutes()
                .unwrap_or(defaults.cache_ttl_minutes),
            files_exclude: provider.files_exclude().unwrap_or_default(),
            search_exclude: provider.search_exclude().unwrap_or_default(),
            verbose_logging: provider
                .verbose_logging()
                .unwrap_or(defaults.verbose_logging),
            io_timeout_ms: provider.io_timeout_ms().or(defaults.io_timeout_ms),
        }
    }

    /// Set the cache lifetime.
    pub fn with_ttl_minutes(mut self, minutes: i64) -> Self {
        self.cache_ttl_minutes = minutes;
        self
    }

    /// Add a general exclusion rule.
    pub fn exclude(mut self, pattern: impl Into<String>, enabled: bool) -> Self {
        self.files_exclude.insert(pattern.into(), enabled);
        self
    }

    /// Add a search exclusion rule.
    pub fn search_exclude(mut self, pattern: impl Into<String>, enabled: bool) -> Self {
        self.search_exclude.insert(pattern.into(), enabled);
        self
    }

    /// Enable per-directory diagnostics.
    pub fn verbose(mut self) -> Self {
        self.verbose_logging = true;
        self
    }

    /// Set the per-call I/O timeout.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Both rule sources merged; search rules override on the same pattern.
    pub fn exclusion_rules(&self) -> ExclusionRules {
        let mut rules = self.files_exclude.clone();
        rules.extend(
            self.search_exclude
                .iter()
                .map(|(pattern, enabled)| (pattern.clone(), *enabled)),
        );
        rules
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout_ms.map(Duration::from_millis)
    }

    pub fn caching_enabled(&self) -> bool {
        self.cache_ttl_minutes > 0
    }
}

impl ConfigProvider for FolderIndexSettings {
    fn cache_ttl_minutes(&self) -> Option<i64> {
        Some(self.cache_ttl_minutes)
    }

    fn files_exclude(&self) -> Option<ExclusionRules> {
        Some(self.files_exclude.clone())
    }

    fn search_exclude(&self) -> Option<ExclusionRules> {
        Some(self.search_exclude.clone())
    }

    fn verbose_logging(&self) -> Option<bool> {
        Some(self.verbose_logging)
    }

    fn io_timeout_ms(&self) -> Option<u64> {
        self.io_timeout_ms
    }
}

/// Keys whose values changed in a configuration update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigChange {
    keys: BTreeSet<String>,
}

impl ConfigChange {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `key`, or any setting nested below it, changed.
    ///
    /// `affects("files")` is true when `files.exclude` changed.
    pub fn affects(&self, key: &str) -> bool {
        self.keys.iter().any(|changed| {
            changed == key
                || changed
                    .strip_prefix(key)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

/// A [`ConfigProvider`] over a JSON settings document.
///
/// Keys are looked up verbatim first (`"files.exclude": {..}`, the flat
/// layout editors write) and then as a nested path
/// (`{"files": {"exclude": {..}}}`). A value of the wrong type is logged and
/// treated as absent.
#[derive(Debug, Default)]
pub struct JsonSettings {
    document: RwLock<Value>,
}

impl JsonSettings {
    pub fn new(document: Value) -> Result<Self> {
        if !document.is_object() {
            return Err(FolderIndexError::Settings(
                "settings document must be a JSON object".to_string(),
            ));
        }
        Ok(Self {
            document: RwLock::new(document),
        })
    }

    /// Parse a settings document.
    pub fn from_json_str(content: &str) -> Result<Self> {
        Self::new(serde_json::from_str(content)?)
    }

    /// Replace the document, reporting which known settings changed.
    pub fn replace(&self, document: Value) -> Result<ConfigChange> {
        if !document.is_object() {
            return Err(FolderIndexError::Settings(
                "settings document must be a JSON object".to_string(),
            ));
        }

        let mut guard = self
            .document
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let changed: Vec<&str> = [
            CACHE_TTL_KEY,
            FILES_EXCLUDE_KEY,
            SEARCH_EXCLUDE_KEY,
            VERBOSE_LOGGING_KEY,
            IO_TIMEOUT_KEY,
        ]
        .into_iter()
        .filter(|key| lookup(&guard, key) != lookup(&document, key))
        .collect();

        *guard = document;
        Ok(ConfigChange::new(changed))
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let guard = self.document.read().unwrap_or_else(PoisonError::into_inner);
        let value = lookup(&guard, key)?;
        match serde_json::from_value(value.clone()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring setting {key}: {e}");
                None
            }
        }
    }
}

fn lookup<'a>(document: &'a Value, key: &str) -> Option<&'a Value> {
    if let Some(value) = document.get(key) {
        return Some(value);
    }
    key.split('.')
        .try_fold(document, |value, segment| value.get(segment))
}

impl ConfigProvider for JsonSettings {
    fn cache_ttl_minutes(&self) -> Option<i64> {
        self.get(CACHE_TTL_KEY)
    }

    fn files_exclude(&self) -> Option<ExclusionRules> {
        self.get(FILES_EXCLUDE_KEY)
    }

    fn search_exclude(&self) -> Option<ExclusionRules> {
        self.get(SEARCH_EXCLUDE_KEY)
    }

    fn verbose_logging(&self) -> Option<bool> {
        self.get(VERBOSE_LOGGING_KEY)
    }

    fn io_timeout_ms(&self) -> Option<u64> {
        self.get(IO_TIMEOUT_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_defaults_when_provider_is_empty() {
        let settings = FolderIndexSettings::resolve(&JsonSettings::new(json!({})).unwrap());

        assert_eq!(settings, FolderIndexSettings::default());
        assert_eq!(settings.cache_ttl_minutes, 60);
        assert!(settings.caching_enabled());
    }

    #[test]
    fn test_search_rules_override_file_rules() {
        let settings = FolderIndexSettings::default()
            .exclude("**/node_modules", true)
            .exclude("**/dist", true)
            .search_exclude("**/dist", false)
            .search_exclude("**/coverage", true);

        let rules = settings.exclusion_rules();

        assert_eq!(rules.get("**/node_modules"), Some(&true));
        assert_eq!(rules.get("**/dist"), Some(&false));
        assert_eq!(rules.get("**/coverage"), Some(&true));
    }

    #[test]
    fn test_json_settings_flat_and_nested_keys() {
        let flat = JsonSettings::from_json_str(
            r#"{
                "folderIndex.cacheTtlMinutes": 5,
                "files.exclude": { "**/.git": true, "**/out": false },
                "folderIndex.verboseLogging": true
            }"#,
        )
        .unwrap();
        let nested = JsonSettings::new(json!({
            "folderIndex": { "cacheTtlMinutes": 5, "verboseLogging": true },
            "files": { "exclude": { "**/.git": true, "**/out": false } }
        }))
        .unwrap();

        for provider in [&flat, &nested] {
            let settings = FolderIndexSettings::resolve(provider);
            assert_eq!(settings.cache_ttl_minutes, 5);
            assert!(settings.verbose_logging);
            assert_eq!(settings.files_exclude.len(), 2);
        }
    }

    #[test]
    fn test_wrong_type_falls_back_to_default() {
        let settings = JsonSettings::new(json!({
            "folderIndex.cacheTtlMinutes": "soon",
            "search.exclude": ["not", "a", "map"]
        }))
        .unwrap();

        let resolved = FolderIndexSettings::resolve(&settings);

        assert_eq!(resolved.cache_ttl_minutes, DEFAULT_CACHE_TTL_MINUTES);
        assert!(resolved.search_exclude.is_empty());
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        assert!(JsonSettings::new(json!([1, 2, 3])).is_err());
        assert!(JsonSettings::from_json_str("not json").is_err());
    }

    #[test]
    fn test_replace_reports_changed_keys() {
        let settings = JsonSettings::new(json!({
            "folderIndex.cacheTtlMinutes": 60,
            "files.exclude": { "**/out": true }
        }))
        .unwrap();

        let change = settings
            .replace(json!({
                "folderIndex.cacheTtlMinutes": 0,
                "files.exclude": { "**/out": true }
            }))
            .unwrap();

        assert!(change.affects(CACHE_TTL_KEY));
        assert!(change.affects("folderIndex"));
        assert!(!change.affects(FILES_EXCLUDE_KEY));
        assert_eq!(settings.cache_ttl_minutes(), Some(0));
    }

    #[test]
    fn test_affects_requires_segment_boundary() {
        let change = ConfigChange::new(["files.excludeGitIgnore"]);

        assert!(change.affects("files"));
        assert!(!change.affects(FILES_EXCLUDE_KEY));
    }
}
