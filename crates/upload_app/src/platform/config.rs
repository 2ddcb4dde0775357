//! Loads `AppConfig` from a RON file, falling back to defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use upload_engine::{EngineConfig, UploadSettings};
use upload_logging::upload_info;

pub const CONFIG_FILENAME: &str = "phase_upload.ron";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub endpoint: String,
    pub output_dir: PathBuf,
    pub connect_timeout_secs: u64,
    /// `None` waits for the server indefinitely.
    pub request_timeout_secs: Option<u64>,
    pub max_response_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let settings = UploadSettings::default();
        Self {
            endpoint: settings.endpoint,
            output_dir: PathBuf::from("output"),
            connect_timeout_secs: settings.connect_timeout.as_secs(),
            request_timeout_secs: settings.request_timeout.map(|timeout| timeout.as_secs()),
            max_response_bytes: settings.max_bytes,
        }
    }
}

impl AppConfig {
    /// An explicit path must exist. Without one, `./phase_upload.ron` is used if present.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILENAME);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))?;
        upload_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(text)?)
    }

    pub fn with_overrides(mut self, endpoint: Option<String>, output_dir: Option<PathBuf>) -> Self {
        if let Some(endpoint) = endpoint {
            self.endpoint = endpoint;
        }
        if let Some(output_dir) = output_dir {
            self.output_dir = output_dir;
        }
        self
    }

    pub fn upload_settings(&self) -> UploadSettings {
        UploadSettings {
            endpoint: self.endpoint.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
            max_bytes: self.max_response_bytes,
        }
    }

    /// Engine config with an absolute output directory, so stored results can be referenced by URL.
    pub fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let output_dir = std::path::absolute(&self.output_dir)
            .with_context(|| format!("resolving output dir {}", self.output_dir.display()))?;
        Ok(EngineConfig {
            settings: self.upload_settings(),
            output_dir,
        })
    }
}
