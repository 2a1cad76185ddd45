use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_SETTINGS_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub background_color: String,
    pub output_folder: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            background_color: "white".to_string(),
            output_folder: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct PartialSettings {
    background_color: Option<String>,
    output_folder: Option<PathBuf>,
}

impl PartialSettings {
    fn apply_defaults(self) -> (Settings, bool) {
        let defaults = Settings::default();
        let mut changed = false;

        let background_color = match self.background_color {
            Some(v) => v,
            None => {
                changed = true;
                defaults.background_color
            }
        };
        let output_folder = match self.output_folder {
            Some(v) => v,
            None => {
                changed = true;
                defaults.output_folder
            }
        };

        (
            Settings {
                background_color,
                output_folder,
            },
            changed,
        )
    }
}

/// Reads and writes the settings file. Last write wins.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Relative output folders sit next to the settings file.
    pub fn resolve_output_folder(&self, folder: &Path) -> PathBuf {
        match self.path.parent() {
            Some(parent) if folder.is_relative() && !parent.as_os_str().is_empty() => {
                parent.join(folder)
            }
            _ => folder.to_path_buf(),
        }
    }

    /// Loads the settings file, writing the defaults first when it does not exist.
    pub fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            let settings = Settings::default();
            self.save(&settings)?;
            tracing::info!(path = %self.path.display(), "wrote default settings");
            return Ok(settings);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let partial: PartialSettings = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        let (settings, changed) = partial.apply_defaults();
        if changed {
            self.save(&settings)?;
        }
        Ok(settings)
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        ensure_parent_dir(&self.path)?;
        let text = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
        fs::write(&self.path, text)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}

pub fn open_settings_in_editor(store: &SettingsStore) -> Result<()> {
    if !store.path().exists() {
        store.save(&Settings::default())?;
    }

    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let mut parts = match shell_words::split(&editor) {
        Ok(p) if !p.is_empty() => p,
        _ => vec![editor],
    };
    let cmd = parts.remove(0);
    let status = Command::new(cmd)
        .args(parts)
        .arg(store.path())
        .status()
        .with_context(|| format!("Failed to launch editor for {}", store.path().display()))?;
    if !status.success() {
        anyhow::bail!("Editor exited with status {}", status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join(DEFAULT_SETTINGS_FILE))
    }

    #[test]
    fn missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let settings = store.load().unwrap();
        assert_eq!(settings.background_color, "white");
        assert_eq!(settings.output_folder, PathBuf::from("output"));

        let raw = fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["background_color"], "white");
        assert_eq!(json["output_folder"], "output");
    }

    #[test]
    fn save_then_load_in_fresh_store_round_trips() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            background_color: "#1e1e2e".to_string(),
            output_folder: dir.path().join("scripts"),
        };
        store_in(&dir).save(&settings).unwrap();

        let loaded = store_in(&dir).load().unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn partial_file_is_completed_and_rewritten() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), r#"{"background_color": "black"}"#).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.background_color, "black");
        assert_eq!(loaded.output_folder, PathBuf::from("output"));

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("output_folder"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "not json").unwrap();

        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn relative_output_folder_resolves_next_to_settings_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.resolve_output_folder(Path::new("output")), dir.path().join("output"));

        let absolute = dir.path().join("elsewhere");
        assert_eq!(store.resolve_output_folder(&absolute), absolute);

        let bare = SettingsStore::new(DEFAULT_SETTINGS_FILE);
        assert_eq!(bare.resolve_output_folder(Path::new("output")), PathBuf::from("output"));
    }
}
