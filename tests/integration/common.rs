//! Shared helpers for the integration tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use assert_cmd::Command;
use tempfile::TempDir;
use zrl_launcher::catalog::{CatalogDocument, MapEntry};
use zrl_launcher::publish::StatusFn;

/// Isolated directories for one CLI run.
pub struct CliEnv {
    pub dir: TempDir,
}

impl CliEnv {
    /// Fresh environment with a game directory and settings pointing at `catalog_url`.
    pub fn new(catalog_url: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("game")).unwrap();
        std::fs::write(
            dir.path().join("settings.toml"),
            format!("catalog_url = \"{catalog_url}\"\napi_base = \"http://127.0.0.1:9\"\n"),
        )
        .unwrap();
        Self { dir }
    }

    pub fn game_dir(&self) -> PathBuf {
        self.dir.path().join("game")
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.dir.path().join("config.json")
    }

    /// `zrl` with settings, preferences and game directory confined to the temp dir.
    pub fn zrl(&self) -> Command {
        let mut cmd = Command::cargo_bin("zrl").unwrap();
        cmd.env("ZRL_CONFIG_PATH", self.dir.path().join("settings.toml"))
            .env("ZRL_PREFERENCES_PATH", self.preferences_path())
            .env("ZRL_NO_PROGRESS", "1")
            .env("NO_COLOR", "1")
            .env_remove("GITHUB_TOKEN")
            .env_remove("RUST_LOG")
            .arg("--game-dir")
            .arg(self.game_dir());
        cmd
    }
}

/// Catalog with one map `winter` v1.0.0 authored by alice; `admin` is the only admin.
pub fn winter_catalog() -> CatalogDocument {
    let mut catalog = CatalogDocument::skeleton("admin");
    catalog.maps.push(MapEntry {
        id: "winter".to_string(),
        name: "Winter".to_string(),
        latest_version: "1.0.0".to_string(),
        description: "Snowbound bunker".to_string(),
        download_url: "https://example.invalid/winter.zip".to_string(),
        author: Some("alice".to_string()),
        ..MapEntry::default()
    });
    catalog
}

/// Status callback recording every line.
pub fn recorder() -> (StatusFn, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);
    let status: StatusFn = Arc::new(move |line: &str| sink.lock().unwrap().push(line.to_string()));
    (status, lines)
}

/// Write a dummy resource pack.
pub fn resource_pack(dir: &Path) -> PathBuf {
    let path = dir.join("winter-rp.zip");
    std::fs::write(&path, b"resource pack bytes").unwrap();
    path
}
