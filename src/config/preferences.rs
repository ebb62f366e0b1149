//! Persisted user preferences (`config.json`).
//!
//! A flat JSON object of string keys. The launcher itself reads three of
//! them ([`LANGUAGE`], [`THEME`], [`MINECRAFT_PATH`]) but any key may be
//! stored; unknown keys are preserved. A corrupt file is treated as empty so
//! a bad edit never keeps the launcher from starting.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::warn;

use super::settings::app_config_dir;
use crate::core::{LauncherError, Result};
use crate::utils::fs::atomic_write;

/// UI language code.
pub const LANGUAGE: &str = "language";
/// UI theme name.
pub const THEME: &str = "theme";
/// Game root directory.
pub const MINECRAFT_PATH: &str = "minecraft_path";

/// Theme used when none is stored.
pub const DEFAULT_THEME: &str = "System";

/// JSON-backed key/value store.
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    path: PathBuf,
    values: Map<String, Value>,
}

impl Preferences {
    /// Load from the default location.
    pub fn load() -> Result<Self> {
        Ok(Self::load_from(&Self::default_path()?))
    }

    /// `<config dir>/ZombieRoolLauncher/config.json`.
    pub fn default_path() -> Result<PathBuf> {
        Ok(app_config_dir()?.join("config.json"))
    }

    /// Load from `path`; missing or corrupt files yield an empty store.
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        let values = match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<Map<String, Value>>(&text) {
                Ok(values) => values,
                Err(e) => {
                    warn!("Ignoring corrupt preferences file {}: {}", path.display(), e);
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                warn!("Cannot read preferences file {}: {}", path.display(), e);
                Map::new()
            }
        };
        Self {
            path: path.to_path_buf(),
            values,
        }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String value for `key`.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Store `value` under `key` and persist immediately.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Result<()> {
        self.values.insert(key.into(), value);
        self.save()
    }

    /// Remove `key` and persist. Returns the previous value.
    pub fn remove(&mut self, key: &str) -> Result<Option<Value>> {
        let previous = self.values.remove(key);
        if previous.is_some() {
            self.save()?;
        }
        Ok(previous)
    }

    /// All entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Stored theme or [`DEFAULT_THEME`].
    #[must_use]
    pub fn theme(&self) -> &str {
        self.get_str(THEME).unwrap_or(DEFAULT_THEME)
    }

    /// Stored language, if any.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.get_str(LANGUAGE)
    }

    /// Stored game root, with `~` expanded.
    #[must_use]
    pub fn minecraft_path(&self) -> Option<PathBuf> {
        self.get_str(MINECRAFT_PATH)
            .filter(|p| !p.trim().is_empty())
            .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
    }

    fn save(&self) -> Result<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        serde::Serialize::serialize(&self.values, &mut serializer).map_err(|e| LauncherError::Config {
            message: format!("failed to serialize preferences: {e}"),
        })?;
        atomic_write(&self.path, &buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ZombieRoolLauncher").join("config.json");

        let mut prefs = Preferences::load_from(&path);
        assert_eq!(prefs.theme(), DEFAULT_THEME);
        assert!(prefs.language().is_none());

        prefs.set(LANGUAGE, json!("fr")).unwrap();
        prefs.set(THEME, json!("Dark")).unwrap();
        prefs.set("window_width", json!(1024)).unwrap();

        let reloaded = Preferences::load_from(&path);
        assert_eq!(reloaded.language(), Some("fr"));
        assert_eq!(reloaded.theme(), "Dark");
        assert_eq!(reloaded.get("window_width"), Some(&json!(1024)));
        assert_eq!(reloaded, prefs);
    }

    #[test]
    fn test_corrupt_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();

        let mut prefs = Preferences::load_from(&path);
        assert_eq!(prefs.entries().count(), 0);
        prefs.set(THEME, json!("Default")).unwrap();
        assert_eq!(Preferences::load_from(&path).theme(), "Default");
    }

    #[test]
    fn test_minecraft_path_expands_tilde() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = Preferences::load_from(&dir.path().join("config.json"));
        assert!(prefs.minecraft_path().is_none());

        prefs.set(MINECRAFT_PATH, json!("~/games/.minecraft")).unwrap();
        let path = prefs.minecraft_path().unwrap();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("games/.minecraft"));
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut prefs = Preferences::load_from(&path);
        prefs.set(THEME, json!("Dark")).unwrap();
        assert_eq!(prefs.remove(THEME).unwrap(), Some(json!("Dark")));
        assert_eq!(prefs.remove(THEME).unwrap(), None);
        assert_eq!(Preferences::load_from(&path).theme(), DEFAULT_THEME);
    }
}
