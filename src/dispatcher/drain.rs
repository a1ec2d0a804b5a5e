use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;
use tracing::warn;

use crate::metrics;
use crate::Error;
use crate::RegistryError;
use crate::Result;
use crate::UnitStore;

/// Decides whether the service may tear down.
///
/// Teardown is only allowed once no unit is attached. The emptiness check and
/// the release happen inside [`UnitStore::close`], under the registry lock, so
/// an attach can never slip in between them. Subscribers are told once the
/// registry is gone.
pub struct DrainCoordinator<S: UnitStore> {
    store: Arc<S>,
    drained_tx: watch::Sender<bool>,
}

impl<S: UnitStore> DrainCoordinator<S> {
    pub fn new(store: Arc<S>) -> Self {
        let (drained_tx, _) = watch::channel(false);
        Self { store, drained_tx }
    }

    /// One drain attempt. Refused with `Busy` while units remain; the
    /// registry keeps serving in that case.
    pub fn quiesce(&self) -> Result<()> {
        match self.store.close() {
            Ok(()) => {
                if !*self.drained_tx.borrow() {
                    info!("Drain accepted: registry is empty and released");
                }
                self.drained_tx.send_replace(true);
                Ok(())
            }
            Err(Error::Registry(RegistryError::Busy { attached })) => {
                metrics::DRAIN_REFUSED.inc();
                warn!("Drain refused: {} unit(s) still attached", attached);
                Err(RegistryError::Busy { attached }.into())
            }
            Err(e) => Err(e),
        }
    }

    pub fn is_drained(&self) -> bool {
        *self.drained_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.drained_tx.subscribe()
    }
}
