use crate::error::SettingsError;
use crate::model::{PlayMode, Settings};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "tunedeck";
const SETTINGS_FILE: &str = "settings.json";
const LOG_FILE: &str = "tunedeck.log";

pub fn config_root() -> Result<PathBuf, SettingsError> {
    if let Some(override_dir) = env::var_os("TUNEDECK_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    if let Some(xdg) = env::var_os("XDG_CONFIG_HOME").filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(xdg).join(APP_DIR));
    }

    home_dir()
        .map(|home| home.join(".config").join(APP_DIR))
        .ok_or(SettingsError::NoConfigDir)
}

pub fn settings_path() -> Result<PathBuf, SettingsError> {
    Ok(config_root()?.join(SETTINGS_FILE))
}

pub fn log_path() -> Result<PathBuf, SettingsError> {
    Ok(config_root()?.join(LOG_FILE))
}

pub fn ensure_config_dir() -> Result<PathBuf, SettingsError> {
    let root = config_root()?;
    fs::create_dir_all(&root).map_err(|source| SettingsError::Io {
        path: root.clone(),
        source,
    })?;
    Ok(root)
}

/// The user's music folder, or a relative `Music` when no home is known.
pub fn default_music_dir() -> PathBuf {
    home_dir()
        .map(|home| home.join("Music"))
        .unwrap_or_else(|| PathBuf::from("Music"))
}

fn home_dir() -> Option<PathBuf> {
    let key = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Reads settings from `path`. A missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Key-value access to the persisted player settings.
///
/// Setters return `true` when the stored value actually changed.
pub trait SettingsStore {
    fn settings(&self) -> &Settings;
    fn set_directories(&mut self, directories: Vec<PathBuf>) -> bool;
    fn set_mode(&mut self, mode: PlayMode) -> bool;

    fn directories(&self) -> &[PathBuf] {
        &self.settings().directories
    }

    fn mode(&self) -> PlayMode {
        self.settings().mode
    }
}

/// Settings backed by a JSON file, written through on every change.
#[derive(Debug)]
pub struct SettingsFile {
    path: PathBuf,
    settings: Settings,
}

impl SettingsFile {
    /// Opens the store, falling back to defaults when the file is unreadable.
    pub fn open(path: PathBuf) -> Self {
        let settings = match load_settings(&path) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!("using default settings: {err}");
                Settings::default()
            }
        };
        Self { path, settings }
    }

    fn persist(&self) {
        if let Err(err) = save_settings(&self.path, &self.settings) {
            tracing::warn!("failed to store settings: {err}");
        }
    }
}

impl SettingsStore for SettingsFile {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn set_directories(&mut self, directories: Vec<PathBuf>) -> bool {
        if self.settings.directories == directories {
            return false;
        }
        self.settings.directories = directories;
        self.persist();
        true
    }

    fn set_mode(&mut self, mode: PlayMode) -> bool {
        if self.settings.mode == mode {
            return false;
        }
        self.settings.mode = mode;
        self.persist();
        true
    }
}

/// Settings that live only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    settings: Settings,
}

impl MemorySettings {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl SettingsStore for MemorySettings {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn set_directories(&mut self, directories: Vec<PathBuf>) -> bool {
        let changed = self.settings.directories != directories;
        self.settings.directories = directories;
        changed
    }

    fn set_mode(&mut self, mode: PlayMode) -> bool {
        let changed = self.settings.mode != mode;
        self.settings.mode = mode;
        changed
    }
}
