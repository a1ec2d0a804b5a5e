use std::time::Instant;

/// Wire representation of a unit id. Allocated ids are never negative.
pub type UnitId = i32;

/// One attached unit. Lives from a successful attach until its detach.
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: UnitId,
    pub attached_at: Instant,
}

impl Unit {
    pub(crate) fn new(id: UnitId) -> Self {
        Self {
            id,
            attached_at: Instant::now(),
        }
    }
}
