use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use unitd::ControlClient;
use unitd::Node;
use unitd::NodeBuilder;
use unitd::Result;
use unitd::UnitRegistry;
use unitd::UnitdConfig;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// A running service on an ephemeral loopback port.
pub struct TestService {
    pub node: Arc<Node<UnitRegistry>>,
    pub addr: SocketAddr,
    pub shutdown_tx: watch::Sender<()>,
    pub handle: JoinHandle<Result<()>>,
}

impl TestService {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(customize: impl FnOnce(&mut UnitdConfig)) -> Self {
        let mut config = UnitdConfig::default();
        config.control.listen_address = SocketAddr::from(([127, 0, 0, 1], 0));
        customize(&mut config);
        let config = config.validate().expect("valid test config");

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let node = NodeBuilder::init(config, shutdown_rx)
            .build()
            .start_control_server()
            .await
            .expect("control server bound")
            .ready()
            .expect("node built");
        let addr = node.local_addr().expect("listener bound");

        let runner = node.clone();
        let handle = tokio::spawn(async move { runner.run().await });

        Self {
            node,
            addr,
            shutdown_tx,
            handle,
        }
    }

    pub async fn client(&self) -> ControlClient {
        ControlClient::connect(self.addr, REQUEST_TIMEOUT)
            .await
            .expect("control channel reachable")
    }

    /// Waits for `run()` to return.
    pub async fn stopped(self) -> Result<()> {
        tokio::time::timeout(STOP_TIMEOUT, self.handle)
            .await
            .expect("node stops in time")
            .expect("node task not panicked")
    }
}
