use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default = "default_time_limit_secs")]
    pub time_limit_secs: u32,
    #[serde(default = "default_warning_threshold_secs")]
    pub warning_threshold_secs: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://localhost:5000".to_string()
}
fn default_time_limit_secs() -> u32 {
    15 * 60
}
fn default_warning_threshold_secs() -> u32 {
    60
}
fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            time_limit_secs: default_time_limit_secs(),
            warning_threshold_secs: default_warning_threshold_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.normalize();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("weeklab")
            .join("config.toml")
    }

    /// Clamp out-of-range values from hand-edited or stale config files.
    /// The warning threshold must leave room before the limit or the
    /// warning flag would be on from the first tick.
    pub fn normalize(&mut self) {
        self.time_limit_secs = self.time_limit_secs.max(60);
        if self.warning_threshold_secs >= self.time_limit_secs {
            self.warning_threshold_secs =
                default_warning_threshold_secs().min(self.time_limit_secs - 1);
        }
        self.request_timeout_secs = self.request_timeout_secs.clamp(1, 120);
    }
}
