use std::net::SocketAddr;
use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

const MIN_FRAME_BYTES: usize = 64;
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ControlConfig {
    /// Address the control channel listens on. Port 0 binds an ephemeral port.
    #[serde(default = "default_listen_addr")]
    pub listen_address: SocketAddr,

    /// Largest accepted frame payload (both directions)
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Client-side bound on one request/response round trip
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_addr(),
            max_frame_bytes: default_max_frame_bytes(),
            request_timeout_in_ms: default_request_timeout(),
        }
    }
}

impl ControlConfig {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_FRAME_BYTES..=MAX_FRAME_BYTES).contains(&self.max_frame_bytes) {
            return Err(Error::Config(ConfigError::Message(format!(
                "control.max_frame_bytes {} out of range [{}, {}]",
                self.max_frame_bytes, MIN_FRAME_BYTES, MAX_FRAME_BYTES
            ))));
        }

        if self.request_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "control.request_timeout_in_ms cannot be 0".into(),
            )));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_in_ms)
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9470))
}
fn default_max_frame_bytes() -> usize {
    64 * 1024
}
// in ms
fn default_request_timeout() -> u64 {
    3000
}
