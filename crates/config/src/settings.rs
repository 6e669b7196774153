// Editor settings
// Loaded from ~/.config/tagcalc/settings.json

use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tagcalc_engine::token::{Operator, DEFAULT_TAG_PREFIX};
use tagcalc_engine::EditorOptions;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Formula
    #[serde(rename = "formula.tagPrefix")]
    pub tag_prefix: char,

    // Autocomplete
    #[serde(rename = "autocomplete.debounceMs")]
    pub debounce_ms: u64,

    #[serde(rename = "autocomplete.maxCandidates")]
    pub max_candidates: Option<usize>, // None = show every match
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tag_prefix: DEFAULT_TAG_PREFIX,
            debounce_ms: 0,
            max_candidates: None,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tagcalc");
        config_dir.join("settings.json")
    }

    /// Load settings from the default location, creating the file if missing
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return settings;
        }
        Self::load_from(&path)
    }

    /// Load settings from `path`, falling back to defaults on any problem
    pub fn load_from(path: &Path) -> Self {
        match Self::read(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    /// Strict variant of [`Settings::load_from`].
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let settings = Self::parse(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        serde_json::from_str(&cleaned).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = self.tag_prefix;
        if p.is_whitespace() || p.is_ascii_digit() || p == '.' || Operator::from_char(p).is_some() {
            return Err(ConfigError::Validation(format!(
                "formula.tagPrefix '{p}' would be ambiguous with numbers or operators"
            )));
        }
        if self.max_candidates == Some(0) {
            return Err(ConfigError::Validation(
                "autocomplete.maxCandidates must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn editor_options(&self) -> EditorOptions {
        EditorOptions {
            tag_prefix: self.tag_prefix,
            max_candidates: self.max_candidates,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Create default settings file with comments
    fn create_default_file(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Error creating config directory: {}", e);
                return;
            }
        }

        let default_config = r#"{
    // Character that marks a tag reference in typed text
    "formula.tagPrefix": "@",

    // Suggestion lookups
    // debounceMs: wait this long after the last keystroke before querying
    // maxCandidates: null = show every match
    "autocomplete.debounceMs": 0,
    "autocomplete.maxCandidates": null
}
"#;

        if let Err(e) = fs::write(path, default_config) {
            warn!("Error writing default settings.json: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.tag_prefix, '@');
        assert_eq!(s.debounce_ms, 0);
        assert_eq!(s.max_candidates, None);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_parse_with_comments() {
        let s = Settings::parse(
            r#"{
    // prefix
    "formula.tagPrefix": "$",
    "autocomplete.debounceMs": 120,
    "autocomplete.maxCandidates": 5
}"#,
        )
        .unwrap();
        assert_eq!(s.tag_prefix, '$');
        assert_eq!(s.debounce(), Duration::from_millis(120));
        assert_eq!(s.editor_options().max_candidates, Some(5));
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let s = Settings::parse(r#"{ "autocomplete.debounceMs": 50 }"#).unwrap();
        assert_eq!(s.tag_prefix, '@');
        assert_eq!(s.debounce_ms, 50);
    }

    #[test]
    fn test_validate_rejects_ambiguous_prefix() {
        for p in [' ', '7', '.', '+', '-', '*', '/', '^', '(', ')'] {
            let s = Settings { tag_prefix: p, ..Settings::default() };
            assert!(
                matches!(s.validate(), Err(ConfigError::Validation(_))),
                "prefix {p:?} should be rejected"
            );
        }
        let s = Settings { tag_prefix: '#', ..Settings::default() };
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_load_from_malformed_falls_back() {
        let file = write_temp("{ not json");
        assert_eq!(Settings::load_from(file.path()), Settings::default());
        assert!(matches!(Settings::read(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_invalid_prefix_falls_back() {
        let file = write_temp(r#"{ "formula.tagPrefix": "+" }"#);
        assert_eq!(Settings::load_from(file.path()), Settings::default());
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(matches!(Settings::read(&path), Err(ConfigError::Io { .. })));
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_default_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        Settings::default().create_default_file(&path);
        assert_eq!(Settings::read(&path).unwrap(), Settings::default());
    }
}
