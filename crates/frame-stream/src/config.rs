use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_STREAM_NAME: &str = "frame-stream";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Device index or path, passed to the backend as-is.
    pub device: String,
    /// Capture thread name; diagnostic only.
    pub name: Option<String>,
    /// Stop capturing after this many failed reads in a row. `None` keeps
    /// retrying forever.
    pub max_consecutive_failures: Option<u32>,
    /// Frame rate of the mock backend.
    pub mock_fps: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            device: "0".to_string(),
            name: None,
            max_consecutive_failures: None,
            mock_fps: 60,
        }
    }
}

impl StreamConfig {
    /// Load a YAML config. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config not found, using defaults");
            return Ok(Self::default());
        }
        let s = fs::read_to_string(path).map_err(|e| Error::Io(e.to_string()))?;
        let config: Self = serde_yaml::from_str(&s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let s = serde_yaml::to_string(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path.as_ref(), s).map_err(|e| Error::Io(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.device.trim().is_empty() {
            return Err(Error::Config("device must not be empty".into()));
        }
        if self.max_consecutive_failures == Some(0) {
            return Err(Error::Config(
                "max_consecutive_failures must be at least 1".into(),
            ));
        }
        if self.mock_fps == 0 {
            return Err(Error::Config("mock_fps must be at least 1".into()));
        }
        Ok(())
    }

    pub fn thread_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_STREAM_NAME)
    }
}
