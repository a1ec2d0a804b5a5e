//! Fluent assembly of a registry [`Node`].
//!
//! ## Lifecycle
//! - `build()`: creates the unit registry and the command dispatcher around it.
//! - `start_metrics_server()` / `start_control_server()`: launch the auxiliary
//!   Prometheus endpoint and bind the control channel listener.
//! - `ready()`: returns the assembled node, ready for [`Node::run`].
//!
//! ## Example
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(());
//! let node = NodeBuilder::init(config, shutdown_rx)
//!     .build()
//!     .start_metrics_server(metrics_rx)
//!     .start_control_server()
//!     .await?
//!     .ready()?;
//! node.run().await?;
//! ```

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;

use super::Node;
use crate::metrics;
use crate::CommandDispatcher;
use crate::Result;
use crate::SystemError;
use crate::UnitRegistry;
use crate::UnitdConfig;

pub struct NodeBuilder {
    pub(super) config: UnitdConfig,
    pub(super) registry: Option<Arc<UnitRegistry>>,
    pub(super) shutdown_signal: watch::Receiver<()>,

    pub(super) node: Option<Arc<Node<UnitRegistry>>>,
}

impl NodeBuilder {
    /// Loads configuration from the environment (and an optional override
    /// file), validates it, then initializes the builder.
    pub fn new(
        config_path: Option<&str>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Result<Self> {
        let mut config = UnitdConfig::new()?;
        if let Some(p) = config_path {
            info!("with_override_config from: {}", p);
            config = config.with_override_config(p)?;
        }
        Ok(Self::init(config.validate()?, shutdown_signal))
    }

    /// Initializes from an already validated configuration.
    pub fn init(
        config: UnitdConfig,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            config,
            registry: None,
            shutdown_signal,
            node: None,
        }
    }

    /// Uses a caller-provided registry instead of a fresh one.
    pub fn registry(
        mut self,
        registry: Arc<UnitRegistry>,
    ) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(mut self) -> Self {
        let registry = self
            .registry
            .take()
            .unwrap_or_else(|| Arc::new(UnitRegistry::new(&self.config.registry)));

        let dispatcher = Arc::new(CommandDispatcher::new(registry));
        let node = Node::new(Arc::new(self.config.clone()), dispatcher, self.shutdown_signal.clone());

        self.node = Some(Arc::new(node));
        self
    }

    /// Spawns the Prometheus endpoint when monitoring is enabled.
    pub fn start_metrics_server(
        self,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        if !self.config.monitoring.prometheus_enabled {
            debug!("prometheus disabled, metrics server not started");
            return self;
        }

        let port = self.config.monitoring.prometheus_port;
        tokio::spawn(async move {
            metrics::start_server(port, shutdown_signal).await;
        });
        self
    }

    /// Binds the control channel listener. Connections are accepted once
    /// [`Node::run`] is called.
    pub async fn start_control_server(self) -> Result<Self> {
        let node = self
            .node
            .as_ref()
            .ok_or_else(|| SystemError::NodeStartFailed("control server started before build".to_string()))?;

        let addr = self.config.control.listen_address;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| SystemError::NodeStartFailed(format!("cannot bind control channel on {addr}: {e}")))?;
        let local_addr = listener.local_addr()?;
        node.set_listener(listener, local_addr);

        info!("Control channel listening on {}", local_addr);
        Ok(self)
    }

    /// Returns the built node instance.
    ///
    /// # Errors
    /// Returns `NodeStartFailed` if `build()` has not been called.
    pub fn ready(self) -> Result<Arc<Node<UnitRegistry>>> {
        self.node
            .ok_or_else(|| SystemError::NodeStartFailed("check node ready failed".to_string()).into())
    }
}
