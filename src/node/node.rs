//! The running registry service.
//!
//! ## Key Responsibilities
//! - Accepts control connections and hands each one to its own task
//! - Turns shutdown signals into drain attempts
//! - Stops serving once the registry has been drained, whether by signal or
//!   by a SHUTDOWN command

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::control;
use crate::CommandDispatcher;
use crate::Error;
use crate::RegistryError;
use crate::Result;
use crate::SystemError;
use crate::UnitStore;
use crate::UnitdConfig;

pub struct Node<S: UnitStore> {
    pub config: Arc<UnitdConfig>,
    pub(crate) dispatcher: Arc<CommandDispatcher<S>>,

    listener: Mutex<Option<TcpListener>>,
    local_addr: Mutex<Option<SocketAddr>>,
    shutdown_signal: watch::Receiver<()>,
    pub(crate) ready: AtomicBool,
}

impl<S: UnitStore> Node<S> {
    pub(crate) fn new(
        config: Arc<UnitdConfig>,
        dispatcher: Arc<CommandDispatcher<S>>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Self {
            config,
            dispatcher,
            listener: Mutex::new(None),
            local_addr: Mutex::new(None),
            shutdown_signal,
            ready: AtomicBool::new(false),
        }
    }

    pub(crate) fn set_listener(
        &self,
        listener: TcpListener,
        local_addr: SocketAddr,
    ) {
        *self.listener.lock() = Some(listener);
        *self.local_addr.lock() = Some(local_addr);
    }

    /// Address the control channel is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher<S>> {
        &self.dispatcher
    }

    /// Serves control connections until the registry is drained.
    ///
    /// Every shutdown signal triggers one drain attempt. A refused attempt is
    /// logged and the node keeps serving; the next signal tries again.
    pub async fn run(&self) -> Result<()> {
        let listener = self
            .listener
            .lock()
            .take()
            .ok_or_else(|| SystemError::NodeStartFailed("control server not started".to_string()))?;

        let drain = self.dispatcher.drain();
        let mut drained = drain.subscribe();
        let mut shutdown = self.shutdown_signal.clone();
        let mut signal_closed = false;
        let max_frame_bytes = self.config.control.max_frame_bytes;

        self.set_ready(true);
        info!("Node is serving");

        while !drain.is_drained() {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!(%peer, "set_nodelay failed: {}", e);
                        }
                        let dispatcher = self.dispatcher.clone();
                        tokio::spawn(control::serve_connection(stream, peer, dispatcher, max_frame_bytes));
                    }
                    Err(e) => warn!("failed to accept control connection: {}", e),
                },

                changed = shutdown.changed(), if !signal_closed => match changed {
                    Ok(()) => {
                        info!("Shutdown requested, attempting drain");
                        match drain.quiesce() {
                            Ok(()) => {}
                            Err(Error::Registry(RegistryError::Busy { .. })) => {
                                info!("Node keeps serving until every unit is detached");
                            }
                            Err(e) => {
                                self.set_ready(false);
                                return Err(e);
                            }
                        }
                    }
                    Err(_) => {
                        debug!("shutdown signal sender dropped");
                        signal_closed = true;
                    }
                },

                _ = drained.changed() => {
                    debug!("drain observed");
                }
            }
        }

        self.set_ready(false);
        info!("Registry drained, node stopped");
        Ok(())
    }

    pub fn set_ready(
        &self,
        is_ready: bool,
    ) {
        self.ready.store(is_ready, Ordering::SeqCst);
    }

    pub fn server_is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}
