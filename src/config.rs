/// User settings
///
/// Loaded from `settings.toml` in the user's config directory:
/// - Linux: ~/.config/pinboard/settings.toml
/// - macOS: ~/Library/Application Support/pinboard/settings.toml
/// - Windows: %APPDATA%\pinboard\settings.toml
///
/// A missing file gives the defaults, and so does a file that is not valid TOML.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::data::DEFAULT_POSITION;
use crate::state::Position;

const CONFIG_FILE: &str = "settings.toml";
const APP_DIR: &str = "pinboard";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not write settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file; the data directory is used when unset
    pub database_path: Option<PathBuf>,
    /// Grabbing an image also raises it to the top of the drawing order
    pub promote_on_select: bool,
    /// Where new images are placed
    pub default_x: f64,
    pub default_y: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            promote_on_select: false,
            default_x: DEFAULT_POSITION.x,
            default_y: DEFAULT_POSITION.y,
        }
    }
}

impl Config {
    pub fn default_position(&self) -> Position {
        Position::new(self.default_x, self.default_y)
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push(APP_DIR);
        path.push(CONFIG_FILE);
        path
    })
}

/// Load settings from the default location.
///
/// On first run the defaults are written out so they can be edited.
pub fn load() -> Result<Config, ConfigError> {
    let Some(path) = default_config_path() else {
        return Ok(Config::default());
    };

    if path.exists() {
        return load_from_path(&path);
    }

    let config = Config::default();
    if let Err(e) = save_to_path(&config, &path) {
        log::warn!("⚠️  Could not write default settings to {}: {}", path.display(), e);
    }
    Ok(config)
}

pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    match toml::from_str(&content) {
        Ok(config) => Ok(config),
        Err(e) => {
            log::warn!("⚠️  Ignoring invalid settings in {}: {}", path.display(), e);
            Ok(Config::default())
        }
    }
}

pub fn save_to_path(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
