use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// How `attach` allocates a unit id.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttachMode {
    /// Scan-for-max and insert happen in one critical section.
    #[default]
    Atomic,

    /// Scan and insert take the lock separately, so concurrent attaches may
    /// observe the same maximum. Demonstration only.
    Split,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RegistryConfig {
    /// Upper bound on simultaneously attached units; attach beyond it is
    /// reported as resource exhaustion.
    #[serde(default = "default_max_units")]
    pub max_units: usize,

    #[serde(default)]
    pub attach_mode: AttachMode,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_units: default_max_units(),
            attach_mode: AttachMode::default(),
        }
    }
}

impl RegistryConfig {
    /// Validates registry configuration
    /// # Errors
    /// Returns `Error::Config` when `max_units` is 0 or exceeds the id space
    pub fn validate(&self) -> Result<()> {
        if self.max_units == 0 {
            return Err(Error::Config(ConfigError::Message(
                "registry.max_units must be greater than 0".into(),
            )));
        }

        if self.max_units > i32::MAX as usize {
            return Err(Error::Config(ConfigError::Message(format!(
                "registry.max_units {} exceeds the unit id space ({})",
                self.max_units,
                i32::MAX
            ))));
        }

        if self.attach_mode == AttachMode::Split {
            tracing::warn!("registry.attach_mode = split: concurrent attaches may be assigned duplicate ids");
        }

        Ok(())
    }
}

fn default_max_units() -> usize {
    1024
}
