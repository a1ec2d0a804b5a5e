use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::Unit;
use super::UnitId;
use super::UnitStore;
use crate::metrics;
use crate::AttachMode;
use crate::RegistryConfig;
use crate::RegistryError;
use crate::Result;

/// Attached units, indexed by id and by attach recency.
///
/// `by_id` gives the live maximum in O(log n); `recency` keeps the
/// enumeration order (front = most recently attached). Both are only ever
/// touched while holding the registry lock.
#[derive(Debug, Default)]
pub struct Units {
    by_id: BTreeMap<UnitId, Unit>,
    recency: VecDeque<UnitId>,
}

impl Units {
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn contains(
        &self,
        unit_id: UnitId,
    ) -> bool {
        self.by_id.contains_key(&unit_id)
    }

    /// `max + 1` over attached ids, or 0 when empty.
    fn next_id(&self) -> Result<UnitId> {
        match self.by_id.last_key_value() {
            None => Ok(0),
            Some((&max, _)) => max.checked_add(1).ok_or_else(|| {
                RegistryError::ResourceExhausted(format!("unit id space exhausted at {max}")).into()
            }),
        }
    }

    /// Inserts at the head of the recency order. Returns the unit previously
    /// stored under the same id, which only happens in split mode.
    pub(super) fn insert(
        &mut self,
        unit: Unit,
    ) -> Result<Option<Unit>> {
        self.recency
            .try_reserve(1)
            .map_err(|e| RegistryError::ResourceExhausted(format!("cannot grow unit index: {e}")))?;

        let unit_id = unit.id;
        let replaced = self.by_id.insert(unit_id, unit);
        if replaced.is_some() {
            self.recency.retain(|id| *id != unit_id);
        }
        self.recency.push_front(unit_id);
        Ok(replaced)
    }

    fn remove(
        &mut self,
        unit_id: UnitId,
    ) -> Option<Unit> {
        let unit = self.by_id.remove(&unit_id)?;
        if let Some(pos) = self.recency.iter().position(|id| *id == unit_id) {
            self.recency.remove(pos);
        }
        Some(unit)
    }

    fn snapshot(&self) -> Vec<UnitId> {
        self.recency.iter().copied().collect()
    }
}

/// In-memory registry guarded by one exclusive lock.
///
/// The state is an `Option` so that a successful [`UnitStore::close`] drops
/// the backing storage; every later operation reports `Closed`.
pub struct UnitRegistry {
    inner: Mutex<Option<Units>>,
    max_units: usize,
    attach_mode: AttachMode,
    collisions: AtomicU64,
}

impl UnitRegistry {
    pub fn new(config: &RegistryConfig) -> Self {
        info!(
            "Initializing unit registry: max_units={}, attach_mode={:?}",
            config.max_units, config.attach_mode
        );
        Self {
            inner: Mutex::new(Some(Units::default())),
            max_units: config.max_units,
            attach_mode: config.attach_mode,
            collisions: AtomicU64::new(0),
        }
    }

    /// Runs `f` with exclusive access to the live units.
    ///
    /// The whole closure executes under one lock acquisition.
    pub fn with_units<R>(
        &self,
        f: impl FnOnce(&mut Units) -> Result<R>,
    ) -> Result<R> {
        let mut guard = self.inner.lock();
        match guard.as_mut() {
            Some(units) => f(units),
            None => Err(RegistryError::Closed.into()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().as_ref().map_or(0, Units::len)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().is_none()
    }

    pub fn attach_mode(&self) -> AttachMode {
        self.attach_mode
    }

    /// Number of split-mode attaches that reused an id already handed out.
    pub fn collisions(&self) -> u64 {
        self.collisions.load(Ordering::Acquire)
    }

    fn check_capacity(
        &self,
        units: &Units,
    ) -> Result<()> {
        if units.len() >= self.max_units {
            return Err(RegistryError::ResourceExhausted(format!(
                "registry holds the maximum of {} units",
                self.max_units
            ))
            .into());
        }
        Ok(())
    }

    fn attach_atomic(&self) -> Result<UnitId> {
        self.with_units(|units| {
            self.check_capacity(units)?;
            let unit_id = units.next_id()?;
            units.insert(Unit::new(unit_id))?;
            Ok(unit_id)
        })
    }

    /// Scan and insert in two separate critical sections.
    fn attach_split(&self) -> Result<UnitId> {
        let unit_id = self.with_units(|units| {
            self.check_capacity(units)?;
            units.next_id()
        })?;

        std::thread::yield_now();

        self.with_units(|units| {
            if !units.contains(unit_id) {
                self.check_capacity(units)?;
            }
            if units.insert(Unit::new(unit_id))?.is_some() {
                self.collisions.fetch_add(1, Ordering::AcqRel);
                metrics::ATTACH_COLLISIONS.inc();
                warn!(unit_id, "split attach collision: id handed out twice");
            }
            Ok(unit_id)
        })
    }
}

impl UnitStore for UnitRegistry {
    fn attach(&self) -> Result<UnitId> {
        let unit_id = match self.attach_mode {
            AttachMode::Atomic => self.attach_atomic()?,
            AttachMode::Split => self.attach_split()?,
        };
        debug!(unit_id, "unit attached");
        Ok(unit_id)
    }

    fn detach(
        &self,
        unit_id: UnitId,
    ) -> Result<()> {
        let unit = self.with_units(|units| {
            units
                .remove(unit_id)
                .ok_or_else(|| RegistryError::NotFound { unit_id }.into())
        })?;
        debug!(unit_id, "unit detached after {:?}", unit.attached_at.elapsed());
        Ok(())
    }

    fn query(
        &self,
        unit_id: UnitId,
    ) -> Result<()> {
        self.with_units(|units| {
            if units.contains(unit_id) {
                Ok(())
            } else {
                Err(RegistryError::NotFound { unit_id }.into())
            }
        })
    }

    fn enumerate(&self) -> Result<Vec<UnitId>> {
        self.with_units(|units| Ok(units.snapshot()))
    }

    fn is_empty(&self) -> bool {
        self.inner.lock().as_ref().map_or(true, Units::is_empty)
    }

    fn close(&self) -> Result<()> {
        let mut guard = self.inner.lock();
        match guard.as_ref() {
            None => {
                debug!("registry already closed");
                Ok(())
            }
            Some(units) if !units.is_empty() => Err(RegistryError::Busy { attached: units.len() }.into()),
            Some(_) => {
                *guard = None;
                info!("Registry drained, storage released");
                Ok(())
            }
        }
    }
}
