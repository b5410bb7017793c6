//! Process-wide identifier allocation.
//!
//! Scene objects and instances draw from one monotonically increasing counter,
//! so object IDs and instance IDs never collide. Identifiers are rendered into
//! the pick buffer as base-255 colors (see [`crate::codec`]), which bounds the
//! addressable space to [`MAX_PICK_ID`]. The counter is not reset and does not
//! wrap around that bound; exceeding it is logged and otherwise left alone.

use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Identifier written by the clear color of the pick pass. Never allocated.
pub const BACKGROUND_ID: u32 = 0;

/// Largest identifier the pick buffer can represent (`255³ - 1`).
pub const MAX_PICK_ID: u32 = 255 * 255 * 255 - 1;

/// Next identifier to hand out. Starts at 1 so 0 stays the background.
static NEXT_ID: AtomicU32 = AtomicU32::new(BACKGROUND_ID + 1);

/// Identifier of a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Allocates a fresh identifier from the global counter.
    #[must_use]
    pub fn next() -> Self {
        Self(next_ids(1).start)
    }

    /// Wraps a raw identifier, e.g. one decoded from the pick buffer.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reserves `count` consecutive identifiers and returns them as a range.
pub fn next_ids(count: u32) -> Range<u32> {
    let start = NEXT_ID.fetch_add(count, Ordering::Relaxed);
    let end = start.saturating_add(count);
    if end > MAX_PICK_ID + 1 && start <= MAX_PICK_ID + 1 {
        log::warn!(
            "identifier counter passed the addressable pick range ({MAX_PICK_ID}); \
             picking may confuse objects from now on"
        );
    }
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic_and_nonzero() {
        let a = ObjectId::next();
        let b = ObjectId::next();
        assert!(a.get() > BACKGROUND_ID);
        assert!(b > a);
    }

    #[test]
    fn test_block_reservation_is_contiguous() {
        let before = ObjectId::next();
        let block = next_ids(16);
        let after = ObjectId::next();
        assert_eq!(block.len(), 16);
        assert!(block.start > before.get());
        assert!(after.get() >= block.end);
    }

    #[test]
    fn test_display() {
        assert_eq!(ObjectId::from_raw(42).to_string(), "#42");
    }
}
