//! The initial battle descriptor.
//!
//! The referee consumes an already-loaded descriptor; how it reaches the
//! process (editor transport, file, fixture) is someone else's problem.

use redoubt_core::item::ItemDescriptor;
use redoubt_core::player::Player;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// CodeEntry
// ---------------------------------------------------------------------------

/// One program in the code table. Items reference entries by id through
/// their `operating_code`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeEntry {
    pub id: i64,
    pub code: String,
}

// ---------------------------------------------------------------------------
// BattleDescriptor
// ---------------------------------------------------------------------------

/// Everything a match starts from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleDescriptor {
    /// Whether to emit a streaming frame payload every tick.
    #[serde(default = "default_is_stream")]
    pub is_stream: bool,
    /// The real players; the neutral owner is registered implicitly.
    pub players: Vec<Player>,
    #[serde(default)]
    pub codes: Vec<CodeEntry>,
    /// `[height, width]` in tiles.
    pub map_size: [usize; 2],
    /// Opaque reward schedule, echoed into the result section.
    #[serde(default)]
    pub rewards: Value,
    /// Simulated seconds until the `time` defeat predicate can fire.
    #[serde(default)]
    pub time_limit: Option<f64>,
    /// Buildings, obstacles, and crafts placed at match start.
    #[serde(default)]
    pub map_elements: Vec<ItemDescriptor>,
}

fn default_is_stream() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
