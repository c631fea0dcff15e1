//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`SeqthinkSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply environment variable overrides
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{LogFormat, SeqthinkSettings};

/// Resolve the path to the settings file (`~/.seqthink/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".seqthink").join("settings.json")
}

/// An environment override that was set but could not be applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedOverride {
    /// Variable name.
    pub key: &'static str,
    /// Raw value as found in the environment.
    pub value: String,
}

/// Load settings from `path` with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or an out-of-range file value
/// is an error. Unusable env values are skipped and returned so the caller
/// can report them once logging is up.
pub fn load_settings_from_path(path: &Path) -> Result<(SeqthinkSettings, Vec<RejectedOverride>)> {
    let mut settings = read_file_layer(path)?;
    let rejected = apply_overrides(&mut settings, |name| std::env::var(name).ok());
    settings.validate()?;
    Ok((settings, rejected))
}

fn read_file_layer(path: &Path) -> Result<SeqthinkSettings> {
    let defaults = serde_json::to_value(SeqthinkSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment overrides read through `lookup`.
///
/// Recognized variables: `PORT`, `SEQTHINK_HOST`, `SEQTHINK_SUBSCRIBER_BUFFER`,
/// `SEQTHINK_LOG_LEVEL`, `SEQTHINK_LOG_FORMAT`. Empty values are ignored.
/// Unparseable ones keep the file/default value and are returned.
pub fn apply_overrides(
    settings: &mut SeqthinkSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<RejectedOverride> {
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let mut rejected = Vec::new();
    let mut reject = |key: &'static str, value: String| {
        debug!(key, value = %value, "ignoring invalid env override");
        rejected.push(RejectedOverride { key, value });
    };

    if let Some(v) = read("PORT") {
        match parse_u16_range(&v, 1, 65535) {
            Some(port) => settings.server.port = port,
            None => reject("PORT", v),
        }
    }
    if let Some(v) = read("SEQTHINK_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("SEQTHINK_SUBSCRIBER_BUFFER") {
        match parse_usize_range(&v, 1, 65_536) {
            Some(n) => settings.server.subscriber_buffer = n,
            None => reject("SEQTHINK_SUBSCRIBER_BUFFER", v),
        }
    }
    if let Some(v) = read("SEQTHINK_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("SEQTHINK_LOG_FORMAT") {
        match parse_log_format(&v) {
            Some(format) => settings.logging.format = format,
            None => reject("SEQTHINK_LOG_FORMAT", v),
        }
    }
    rejected
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a log format name (case-insensitive).
pub fn parse_log_format(val: &str) -> Option<LogFormat> {
    match val.trim().to_lowercase().as_str() {
        "compact" | "text" => Some(LogFormat::Compact),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = json!({"server": {"port": 8080, "host": "localhost"}});
        let merged = deep_merge(target, json!({"server": {"port": 9090}}));
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "localhost");
    }

    #[test]
    fn merge_null_preserves_target() {
        let merged = deep_merge(json!({"a": 1, "b": 2}), json!({"a": null}));
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_array_replace() {
        let merged = deep_merge(json!({"items": [1, 2, 3]}), json!({"items": [4]}));
        assert_eq!(merged["items"], json!([4]));
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let merged = deep_merge(json!({"a": {"nested": true}}), json!({"a": 42}));
        assert_eq!(merged["a"], 42);
    }

    #[test]
    fn merge_new_keys_added() {
        let merged = deep_merge(json!({"a": 1}), json!({"b": 2}));
        assert_eq!(merged, json!({"a": 1, "b": 2}));
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = read_file_layer(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, SeqthinkSettings::default());
    }

    #[test]
    fn partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"port": 9090}, "logging": {"format": "json"}}"#)
            .unwrap();

        let settings = read_file_layer(&path).unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();
        assert_matches!(load_settings_from_path(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn wrong_type_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"port": "high"}}"#).unwrap();
        assert_matches!(load_settings_from_path(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn zero_buffer_in_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"subscriberBuffer": 0}}"#).unwrap();
        let mut settings = read_file_layer(&path).unwrap();
        assert!(apply_overrides(&mut settings, env(&[])).is_empty());
        assert_matches!(settings.validate(), Err(SettingsError::InvalidValue(_)));
    }

    // ── apply_overrides ─────────────────────────────────────────────

    #[test]
    fn env_overrides_apply() {
        let mut s = SeqthinkSettings::default();
        let rejected = apply_overrides(
            &mut s,
            env(&[
                ("PORT", "3000"),
                ("SEQTHINK_HOST", "127.0.0.1"),
                ("SEQTHINK_SUBSCRIBER_BUFFER", "64"),
                ("SEQTHINK_LOG_LEVEL", "debug"),
                ("SEQTHINK_LOG_FORMAT", "JSON"),
            ]),
        );
        assert_eq!(s.server.port, 3000);
        assert_eq!(s.server.host, "127.0.0.1");
        assert_eq!(s.server.subscriber_buffer, 64);
        assert_eq!(s.logging.level, "debug");
        assert_eq!(s.logging.format, LogFormat::Json);
        assert!(rejected.is_empty());
    }

    #[test]
    fn invalid_env_values_ignored() {
        let mut s = SeqthinkSettings::default();
        let rejected = apply_overrides(
            &mut s,
            env(&[
                ("PORT", "0"),
                ("SEQTHINK_HOST", ""),
                ("SEQTHINK_SUBSCRIBER_BUFFER", "lots"),
                ("SEQTHINK_LOG_FORMAT", "xml"),
            ]),
        );
        assert_eq!(s, SeqthinkSettings::default());
        let keys: Vec<&str> = rejected.iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["PORT", "SEQTHINK_SUBSCRIBER_BUFFER", "SEQTHINK_LOG_FORMAT"]);
        assert_eq!(rejected[0].value, "0");
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u16_range("8080", 1, 65535), Some(8080));
        assert_eq!(parse_u16_range("70000", 1, 65535), None);
        assert_eq!(parse_u16_range(" 42 ", 1, 65535), Some(42));
        assert_eq!(parse_usize_range("0", 1, 10), None);
        assert_eq!(parse_usize_range("-1", 1, 10), None);
    }

    #[test]
    fn parse_formats() {
        assert_eq!(parse_log_format("compact"), Some(LogFormat::Compact));
        assert_eq!(parse_log_format("Json"), Some(LogFormat::Json));
        assert_eq!(parse_log_format("yaml"), None);
    }

    #[test]
    fn settings_path_under_home() {
        let path = settings_path();
        assert!(path.ends_with(".seqthink/settings.json"));
    }
}
