//! Configuration management for the unit registry service.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Section-wise validation
mod control;
mod monitoring;
mod registry;
mod service;
pub use control::*;
pub use monitoring::*;
pub use registry::*;
pub use service::*;

use std::env;
use std::fmt::Debug;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Response;
use crate::Result;
use crate::UnitId;

/// Environment variable prefix; `UNITD__REGISTRY__MAX_UNITS=8` sets `registry.max_units`.
pub const ENV_PREFIX: &str = "UNITD";

/// Main configuration container for the registry service
///
/// Combines all section configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct UnitdConfig {
    /// Process-level settings (log location)
    #[serde(default)]
    pub service: ServiceConfig,
    /// Unit registry capacity and allocation discipline
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Control channel listener and framing limits
    #[serde(default)]
    pub control: ControlConfig,
    /// Metrics and monitoring settings
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl Debug for UnitdConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("UnitdConfig")
            .field("registry", &self.registry)
            .field("control", &self.control)
            .finish()
    }
}

impl UnitdConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `UNITD__` prefix (highest priority)
    ///
    /// # Note
    /// Validation is deferred so that `with_override_config()` can still be
    /// applied. Callers MUST call `validate()` before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("UNITD__REGISTRY__MAX_UNITS", "16");
    /// let cfg = UnitdConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(environment());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated instance.
    ///
    /// # Example
    /// ```ignore
    /// let config = UnitdConfig::new()?
    ///     .with_override_config("unitd.toml")?
    ///     .validate()?;
    /// ```
    pub fn validate(self) -> Result<Self> {
        self.service.validate()?;
        self.registry.validate()?;
        self.control.validate()?;
        self.monitoring.validate()?;
        self.validate_list_fits_frame()?;
        Ok(self)
    }

    /// A LIST reply carrying `registry.max_units` ids must fit in one frame.
    fn validate_list_fits_frame(&self) -> Result<()> {
        let required = max_list_reply_bytes(self.registry.max_units)?;
        if required > self.control.max_frame_bytes as u64 {
            return Err(Error::Config(ConfigError::Message(format!(
                "control.max_frame_bytes {} cannot carry a LIST reply of {} units ({} bytes)",
                self.control.max_frame_bytes, self.registry.max_units, required
            ))));
        }
        Ok(())
    }
}

/// Encoded size of `Response::Units` holding `units` ids.
pub(crate) fn max_list_reply_bytes(units: usize) -> Result<u64> {
    let envelope = bincode::serialized_size(&Response::Units(Vec::new()))?;
    let per_unit = bincode::serialized_size(&UnitId::MAX)?;
    Ok(envelope.saturating_add(per_unit.saturating_mul(units as u64)))
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
