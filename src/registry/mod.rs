//! The unit registry: the only owner of attached units and of the id
//! allocation policy.
//!
//! Ids are recomputed from the live maximum on every attach (`max + 1`, or
//! `0` when empty), so draining the registry resets allocation to zero.

mod unit;
mod unit_registry;
pub use unit::*;
pub use unit_registry::*;

#[cfg(test)]
use mockall::automock;

use crate::Result;

/// Operations the dispatcher and drain coordinator need from a registry.
///
/// Every method runs as one critical section: implementations must never
/// release their lock between reading shared state and acting on it.
#[cfg_attr(test, automock)]
pub trait UnitStore: Send + Sync + 'static {
    /// Allocates the next id and records a new unit under it.
    fn attach(&self) -> Result<UnitId>;

    /// Removes the unit, failing with `NotFound` if it is not attached.
    fn detach(
        &self,
        unit_id: UnitId,
    ) -> Result<()>;

    /// Read-only existence check.
    fn query(
        &self,
        unit_id: UnitId,
    ) -> Result<()>;

    /// Snapshot of attached ids, most recently attached first.
    fn enumerate(&self) -> Result<Vec<UnitId>>;

    fn is_empty(&self) -> bool;

    /// Releases the backing storage if no unit is attached, otherwise fails
    /// with `Busy` and leaves the registry untouched.
    fn close(&self) -> Result<()>;
}
