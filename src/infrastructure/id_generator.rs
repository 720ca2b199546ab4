// Local ID Generator - wall-clock ids for optimistic records
// Events, discussions and replies created on the client get an id before any
// network round trip; ids are millisecond timestamps, bumped when needed so
// that they stay strictly increasing.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use crate::models::EventId;

#[derive(Debug, Default)]
pub struct LocalIdGenerator {
    last: AtomicI64,
}

impl LocalIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id: the current millisecond, or one past the previous id if the
    /// clock has not moved forward since.
    pub fn next_id(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut previous = self.last.load(Ordering::Relaxed);

        loop {
            let candidate = if now > previous { now } else { previous + 1 };
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => previous = actual,
            }
        }
    }

    /// Temporary event id, replaced once the server assigns a permanent one.
    pub fn next_event_id(&self) -> EventId {
        EventId::temporary(self.next_id())
    }
}
