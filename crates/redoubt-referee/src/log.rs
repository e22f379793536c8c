//! Battle log assembly and the editor-facing payloads.
//!
//! The log has three sections: `initial` (what stood where at spawn),
//! `frames` (one snapshot per tick), and `result` (filled once at
//! termination). Streaming frames duplicate snapshot data on purpose --
//! the editor transport consumes both shapes.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use redoubt_core::item::{CraftItem, FightItem, Fighters, ItemState};
use redoubt_core::player::{DefeatReason, Role};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// EditorClient
// ---------------------------------------------------------------------------

/// The sink streaming frames and the final log are pushed into.
pub trait EditorClient {
    fn send_battle(&mut self, payload: Value);
}

/// An [`EditorClient`] that captures payloads in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingClient {
    inner: Rc<RefCell<Vec<Value>>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every payload sent so far, in order.
    pub fn payloads(&self) -> Vec<Value> {
        self.inner.borrow().clone()
    }

    /// The most recent payload, if any.
    pub fn last(&self) -> Option<Value> {
        self.inner.borrow().last().cloned()
    }
}

impl EditorClient for RecordingClient {
    fn send_battle(&mut self, payload: Value) {
        self.inner.borrow_mut().push(payload);
    }
}

// ---------------------------------------------------------------------------
// BattleLog
// ---------------------------------------------------------------------------

/// The accumulating record of one match.
#[derive(Debug, Default)]
pub struct BattleLog {
    buildings: Vec<Value>,
    units: Vec<Value>,
    crafts: Vec<Value>,
    frames: Vec<Value>,
    result: Value,
}

impl BattleLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a unit's spawn entry.
    pub fn log_initial_unit(&mut self, unit: &FightItem) {
        self.units.push(json!({
            "item_id": unit.id,
            "tile_position": unit.tile_position,
            "item_type": unit.item_type,
        }));
    }

    /// Record a building's spawn entry.
    pub fn log_initial_building(&mut self, building: &FightItem) {
        self.buildings.push(json!({
            "item_id": building.id,
            "tile_position": building.tile_position,
            "item_type": building.item_type,
            "alias": building.alias,
            "item_status": building.item_status,
            "item_level": building.level,
        }));
    }

    /// Record a craft's spawn entry.
    pub fn log_initial_craft(&mut self, craft: &CraftItem) {
        self.crafts.push(json!({
            "item_id": craft.id,
            "tile_position": craft.tile_position,
            "item_type": craft.item_type,
            "alias": craft.alias,
            "item_level": craft.level,
        }));
    }

    /// Append one per-frame snapshot.
    pub fn push_frame(&mut self, snapshot: Value) {
        self.frames.push(snapshot);
    }

    /// Number of frames recorded so far.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Fill the result section; the last write wins, but in practice this
    /// happens exactly once.
    pub fn set_result(
        &mut self,
        winner: i32,
        rewards: &Value,
        casualties: BTreeMap<String, u32>,
        defeat_reason: Option<DefeatReason>,
    ) {
        self.result = json!({
            "winner": winner,
            "rewards": rewards,
            "casualties": casualties,
            "defeat_reason": defeat_reason.map(DefeatReason::as_str),
        });
    }

    /// The full log payload.
    pub fn to_wire(&self) -> Value {
        json!({
            "initial": {
                "buildings": self.buildings,
                "units": self.units,
                "crafts": self.crafts,
            },
            "frames": self.frames,
            "result": self.result,
        })
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// The per-frame snapshot: one entry per non-obstacle item, with a
/// `firing_point` added on attack frames. Units report their live
/// coordinates; static items their anchor tile.
pub fn battle_snapshot(fighters: &Fighters) -> Value {
    let mut snapshot = Vec::new();
    for item in fighters.values() {
        if item.is_obstacle() {
            continue;
        }
        let tile_position = if item.role == Role::Unit {
            json!(item.coordinates)
        } else {
            json!(item.tile_position)
        };
        let mut entry = json!({
            "item_id": item.id,
            "tile_position": tile_position,
            "hit_points_percentage": item.hit_points_percentage(),
            "item_status": item.status(),
        });
        if let ItemState::Attack { firing_point } = &item.state {
            entry["firing_point"] = json!(firing_point);
        }
        snapshot.push(entry);
    }
    Value::Array(snapshot)
}

/// The streaming payload emitted every tick when `is_stream` is set.
#[allow(clippy::too_many_arguments)]
pub fn streaming_frame(
    status: Value,
    fighters: &Fighters,
    crafts: &BTreeMap<redoubt_core::id::ItemId, CraftItem>,
    map_size: [usize; 2],
    map_grid: &[Vec<u8>],
    current_frame: u64,
    current_game_time: f64,
) -> Value {
    let fight_items: Vec<Value> = fighters.values().map(FightItem::info).collect();
    let craft_items: Vec<Value> = crafts.values().map(CraftItem::info).collect();
    json!({
        "is_stream": true,
        "status": status,
        "fight_items": fight_items,
        "craft_items": craft_items,
        "map_size": map_size,
        "map_grid": map_grid,
        "current_frame": current_frame,
        "current_game_time": current_game_time,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
