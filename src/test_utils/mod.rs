use std::net::SocketAddr;
use std::time::Duration;

use crate::ControlClient;
use crate::UnitdConfig;

/// Defaults with the control channel on an ephemeral loopback port and
/// metrics disabled.
pub fn test_config() -> UnitdConfig {
    let mut config = UnitdConfig::default();
    config.control.listen_address = SocketAddr::from(([127, 0, 0, 1], 0));
    config.monitoring.prometheus_enabled = false;
    config
}

pub async fn connect(addr: SocketAddr) -> ControlClient {
    ControlClient::connect(addr, Duration::from_secs(3))
        .await
        .expect("control channel reachable")
}
