//! Players and the categorical vocabulary of the battle.
//!
//! The wire protocol speaks in strings (`"unit"`, `"enemy"`, `"center"`,
//! ...); this module pins each family down as a closed enum so unknown
//! values are rejected at the serde boundary instead of leaking into the
//! simulation.

use serde::{Deserialize, Serialize};

/// Owner id of map obstacles and other unowned elements.
pub const NEUTRAL_PLAYER_ID: i32 = -1;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// What kind of battle entity an item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A mobile combatant.
    Unit,
    /// A player's command center; losing it can end the match.
    Center,
    /// A static defence building.
    Tower,
    /// Any other player building.
    Building,
    /// A neutral map obstacle.
    Obstacle,
    /// A carrier that lands units at match start.
    Craft,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Unit => "unit",
            Role::Center => "center",
            Role::Tower => "tower",
            Role::Building => "building",
            Role::Obstacle => "obstacle",
            Role::Craft => "craft",
        }
    }

    /// Player-owned static structures -- the roles logged as buildings.
    pub fn is_player_static(self) -> bool {
        matches!(self, Role::Center | Role::Tower | Role::Building)
    }
}

// ---------------------------------------------------------------------------
// Party
// ---------------------------------------------------------------------------

/// Side filter used by the `players` and `items` select queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    /// Items and players opposing the requester.
    Enemy,
    /// The requester's own items and player entry.
    My,
}

// ---------------------------------------------------------------------------
// DefeatReason
// ---------------------------------------------------------------------------

/// How a player can lose. Each player opts into a subset of these; the
/// predicates are evaluated in declaration order and the first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefeatReason {
    /// No living item with role `unit` remains.
    Units,
    /// No living item with role `center` remains.
    Center,
    /// The simulated clock reached the time limit.
    Time,
}

impl DefeatReason {
    /// Wire name of the reason.
    pub fn as_str(self) -> &'static str {
        match self {
            DefeatReason::Units => "units",
            DefeatReason::Center => "center",
            DefeatReason::Time => "time",
        }
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A participant in the battle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Non-negative for real players; [`NEUTRAL_PLAYER_ID`] for the owner
    /// of obstacles.
    pub id: i32,
    /// Which sandbox environment runs this player's code.
    #[serde(default)]
    pub env_name: String,
    /// The defeat predicates that apply to this player. Empty means the
    /// player cannot be defeated (the neutral owner).
    #[serde(default)]
    pub defeat_reasons: Vec<DefeatReason>,
}

impl Player {
    /// The built-in owner of obstacles; registered in every match.
    pub fn neutral() -> Self {
        Self {
            id: NEUTRAL_PLAYER_ID,
            env_name: String::new(),
            defeat_reasons: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
