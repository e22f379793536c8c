//! Fight items, crafts, and their wire representations.
//!
//! A [`FightItem`] is any in-combat entity: a unit, a command center, a
//! tower, a generic building, or a neutral obstacle. A [`CraftItem`] is the
//! carrier that lands a player's units at match start and then survives
//! only as a log entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::actions::ParsedAction;
use crate::id::ItemId;
use crate::player::{Role, NEUTRAL_PLAYER_ID};

/// The item table: every fight item keyed by id. Ids are monotonic, so
/// iteration order is insertion order.
pub type Fighters = BTreeMap<ItemId, FightItem>;

/// Tiles removed from a building's footprint to get its collision size.
pub const CUT_FROM_BUILDING: f64 = 1.0;

// ---------------------------------------------------------------------------
// ItemState
// ---------------------------------------------------------------------------

/// The per-frame status of an item, produced by action steps.
///
/// Serializes to the `{"action": ...}` dict the wire protocol expects;
/// `attack` additionally carries the point the shot was fired at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ItemState {
    /// No action pending.
    Idle,
    /// Hit points exhausted; skipped by every future frame and event match.
    Dead,
    /// Traveling toward a destination.
    Move,
    /// Standing ground.
    Hold,
    /// A move action just completed.
    Stopped,
    /// Fired this frame.
    Attack {
        /// Where the shot landed.
        firing_point: [f64; 2],
    },
}

impl ItemState {
    /// The status string recorded in frame snapshots.
    pub fn status(&self) -> &'static str {
        match self {
            ItemState::Idle => "idle",
            ItemState::Dead => "dead",
            ItemState::Move => "move",
            ItemState::Hold => "hold",
            ItemState::Stopped => "stopped",
            ItemState::Attack { .. } => "attack",
        }
    }
}

// ---------------------------------------------------------------------------
// ItemDescriptor
// ---------------------------------------------------------------------------

/// One map element of the initial battle descriptor.
///
/// Also used for the unit template a craft carries
/// (`in_unit_description`); absent attributes take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDescriptor {
    /// Owning player; defaults to the neutral owner.
    #[serde(default = "default_player_id")]
    pub player_id: i32,
    pub role: Role,
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub level: Option<i64>,
    #[serde(default)]
    pub tile_position: Option<[f64; 2]>,
    #[serde(default)]
    pub item_status: Option<String>,
    #[serde(default)]
    pub hit_points: f64,
    /// Tile footprint; the collision size is derived from it at spawn.
    #[serde(default)]
    pub size: f64,
    #[serde(default)]
    pub base_size: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub coordinates: Option<[f64; 2]>,
    #[serde(default)]
    pub rate_of_fire: Option<f64>,
    #[serde(default)]
    pub damage_per_shot: Option<f64>,
    #[serde(default)]
    pub firing_range: Option<f64>,
    #[serde(default)]
    pub area_damage_per_shot: f64,
    #[serde(default)]
    pub area_damage_radius: f64,
    /// Index into the code table; items without one run no program.
    #[serde(default)]
    pub operating_code: Option<i64>,
    /// Craft only: how many units the carrier holds.
    #[serde(default)]
    pub unit_quantity: Option<usize>,
    /// Craft only: the template its landed units are cloned from.
    #[serde(default)]
    pub in_unit_description: Option<Box<ItemDescriptor>>,
}

fn default_player_id() -> i32 {
    NEUTRAL_PLAYER_ID
}

// ---------------------------------------------------------------------------
// FightItem
// ---------------------------------------------------------------------------

/// A single combatant or obstacle on the battle field.
#[derive(Debug)]
pub struct FightItem {
    pub id: ItemId,
    pub player_id: i32,
    pub role: Role,
    pub item_type: Option<String>,
    pub alias: Option<String>,
    pub level: Option<i64>,
    /// Integer anchor tile of the item's footprint.
    pub tile_position: Option<[f64; 2]>,
    pub item_status: Option<String>,
    pub start_hit_points: f64,
    pub hit_points: f64,
    /// Collision footprint in tiles; `base_size` minus the building cut.
    pub size: f64,
    /// Original tile footprint.
    pub base_size: f64,
    pub speed: Option<f64>,
    /// Floating-point center; anchor plus half the footprint.
    pub coordinates: Option<[f64; 2]>,
    pub rate_of_fire: Option<f64>,
    pub damage_per_shot: Option<f64>,
    pub firing_range: Option<f64>,
    pub area_damage_per_shot: f64,
    pub area_damage_radius: f64,
    /// Frames left until the next shot is ready.
    pub charging: f64,
    pub operating_code: Option<i64>,
    /// The currently pending parsed command, if any.
    pub action: Option<ParsedAction>,
    /// Current frame status.
    pub state: ItemState,
}

impl FightItem {
    /// Construct an item from its (spawn-adjusted) descriptor.
    pub fn new(id: ItemId, desc: &ItemDescriptor) -> Self {
        Self {
            id,
            player_id: desc.player_id,
            role: desc.role,
            item_type: desc.item_type.clone(),
            alias: desc.alias.clone(),
            level: desc.level,
            tile_position: desc.tile_position,
            item_status: desc.item_status.clone(),
            start_hit_points: desc.hit_points,
            hit_points: desc.hit_points,
            size: desc.size,
            base_size: desc.base_size,
            speed: desc.speed,
            coordinates: desc.coordinates,
            rate_of_fire: desc.rate_of_fire,
            damage_per_shot: desc.damage_per_shot,
            firing_range: desc.firing_range,
            area_damage_per_shot: desc.area_damage_per_shot,
            area_damage_radius: desc.area_damage_radius,
            charging: 0.0,
            operating_code: desc.operating_code,
            action: None,
            state: ItemState::Idle,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.hit_points <= 0.0
    }

    pub fn is_obstacle(&self) -> bool {
        self.role == Role::Obstacle
    }

    /// Remaining hit points as a whole percentage, floored at zero.
    pub fn hit_points_percentage(&self) -> i64 {
        if self.start_hit_points <= 0.0 {
            return 0;
        }
        let pct = (100.0 * self.hit_points / self.start_hit_points).round();
        pct.max(0.0) as i64
    }

    /// The status string of the current state.
    pub fn status(&self) -> &'static str {
        self.state.status()
    }

    /// The public info dict delivered to select queries.
    pub fn info(&self) -> Value {
        json!({
            "id": self.id,
            "player_id": self.player_id,
            "role": self.role,
            "hit_points": self.hit_points,
            "size": self.size,
            "speed": self.speed,
            "coordinates": self.coordinates,
            "rate_of_fire": self.rate_of_fire,
            "damage_per_shot": self.damage_per_shot,
            "area_damage_per_shot": self.area_damage_per_shot,
            "area_damage_radius": self.area_damage_radius,
            "firing_range": self.firing_range,
            "action": self.action,
            "state": self.state,
        })
    }
}

// ---------------------------------------------------------------------------
// CraftItem
// ---------------------------------------------------------------------------

/// The carrier a player's units land from. Not a combatant; it appears in
/// the log but takes no further part in the match.
#[derive(Debug, Clone)]
pub struct CraftItem {
    pub id: ItemId,
    pub player_id: i32,
    pub coordinates: [f64; 2],
    pub tile_position: [f64; 2],
    pub level: Option<i64>,
    pub alias: Option<String>,
    pub item_type: Option<String>,
}

impl CraftItem {
    /// Construct a craft from its descriptor and landing coordinates.
    pub fn new(id: ItemId, desc: &ItemDescriptor, coordinates: [f64; 2]) -> Self {
        Self {
            id,
            player_id: desc.player_id,
            coordinates,
            tile_position: coordinates,
            level: desc.level,
            alias: desc.alias.clone(),
            item_type: desc.item_type.clone(),
        }
    }

    /// The public info dict included in streaming frames.
    pub fn info(&self) -> Value {
        json!({
            "id": self.id,
            "player_id": self.player_id,
            "role": Role::Craft,
            "coordinates": self.coordinates,
            "level": self.level,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
