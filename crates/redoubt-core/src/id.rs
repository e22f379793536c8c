//! Item identifiers.
//!
//! Every [`FightItem`](crate::item::FightItem) and
//! [`CraftItem`](crate::item::CraftItem) draws its id from one process-wide
//! monotonic counter. Ids are never recycled, so a `BTreeMap<ItemId, _>`
//! iterates in insertion order -- the ordering the frame loop and the event
//! dispatch rely on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

// ---------------------------------------------------------------------------
// ItemId
// ---------------------------------------------------------------------------

/// A battle item identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u32);

impl ItemId {
    /// Raw `u32` representation.
    #[inline]
    pub fn to_raw(self) -> u32 {
        self.0
    }

    /// Reconstruct from a raw `u32` (e.g. an id received over the wire).
    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

static ITEMS_COUNT: AtomicU32 = AtomicU32::new(0);

/// Allocate the next item id.
///
/// The counter is shared by fight items and crafts and is monotonic across
/// every match in the process; the first id handed out is 1.
pub fn next_item_id() -> ItemId {
    ItemId(ITEMS_COUNT.fetch_add(1, Ordering::Relaxed) + 1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
