use std::sync::Arc;
use std::time::Instant;

use tracing::debug;
use tracing::warn;

use super::DrainCoordinator;
use crate::metrics;
use crate::RawCommand;
use crate::Request;
use crate::Response;
use crate::Result;
use crate::UnitStore;

/// Routes control requests to the unit store.
///
/// Every request gets exactly one [`Response`]; store failures and malformed
/// commands are folded into `Response::Failed`, never dropped.
pub struct CommandDispatcher<S: UnitStore> {
    store: Arc<S>,
    drain: DrainCoordinator<S>,
}

impl<S: UnitStore> CommandDispatcher<S> {
    pub fn new(store: Arc<S>) -> Self {
        let drain = DrainCoordinator::new(store.clone());
        Self { store, drain }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn drain(&self) -> &DrainCoordinator<S> {
        &self.drain
    }

    pub fn dispatch(
        &self,
        command: RawCommand,
    ) -> Response {
        let start = Instant::now();

        let (name, response) = match Request::try_from(command) {
            Ok(request) => {
                let response = self.handle(request).unwrap_or_else(|e| Response::from_error(&e));
                (request.name(), response)
            }
            Err(e) => {
                warn!("rejecting command {:?}: {}", command, e);
                ("INVALID", Response::from_error(&e.into()))
            }
        };

        metrics::COMMANDS_TOTAL
            .with_label_values(&[name, response.outcome()])
            .inc();
        metrics::COMMAND_DURATION
            .with_label_values(&[name])
            .observe(start.elapsed().as_secs_f64());

        debug!("{} -> {:?}", name, response);
        response
    }

    pub fn handle(
        &self,
        request: Request,
    ) -> Result<Response> {
        match request {
            Request::Attach => {
                let unit = self.store.attach()?;
                metrics::UNITS_ATTACHED.inc();
                Ok(Response::Attached(unit))
            }
            Request::Detach(unit) => {
                self.store.detach(unit)?;
                metrics::UNITS_ATTACHED.dec();
                Ok(Response::Done)
            }
            Request::Query(unit) => self.store.query(unit).map(|_| Response::Done),
            Request::List => self.store.enumerate().map(Response::Units),
            Request::Shutdown => self.drain.quiesce().map(|_| Response::Done),
        }
    }
}
