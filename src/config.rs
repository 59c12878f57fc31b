// Config persistence: a tiny JSON file holding the API key. It is read once at
// startup and overwritten wholesale on save.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const APP_DIR: &str = "hc-uploader";
const CONFIG_FILENAME: &str = "config.json";

/// On-disk configuration. An empty key means "no key configured".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_key: String,
}

impl Config {
    /// The stored key, or `None` when it is blank.
    pub fn api_key(&self) -> Option<&str> {
        let key = self.api_key.trim();
        (!key.is_empty()).then_some(key)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store rooted in the platform config directory, falling back to the
    /// working directory when the platform has none.
    pub fn default_location() -> Self {
        let dir = dirs::config_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(dir.join(CONFIG_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files yield an empty config.
    pub fn load(&self) -> Config {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Config::default(),
            Err(err) => {
                warn!("Failed to read config from {:?}: {}", self.path, err);
                return Config::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(config) => {
                info!("Loaded config from {:?}", self.path);
                config
            }
            Err(err) => {
                warn!("Failed to parse config from {:?}: {}", self.path, err);
                Config::default()
            }
        }
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let content =
            serde_json::to_string_pretty(config).map_err(|e| Error::Config(e.to_string()))?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content).map_err(|e| Error::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| Error::io(&self.path, e))?;

        info!("Saved config to {:?}", self.path);
        Ok(())
    }
}
