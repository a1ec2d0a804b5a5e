use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceConfig {
    /// Directory receiving `unitd.log`
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.log_dir.as_os_str().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "service.log_dir path cannot be empty".into(),
            )));
        }
        Ok(())
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/tmp/unitd/logs")
}
