//! Redoubt Referee -- the frame loop that runs a battle.
//!
//! The [`FightHandler`](handler::FightHandler) owns the item table, the
//! world map, the event registry, and the battle log. It spawns one
//! [`ItemAgent`](agent::ItemAgent) per executable item, advances the
//! simulation one frame at a time, dispatches one-shot events, and
//! finishes the match when a victory condition is met.
//!
//! # Frame anatomy
//!
//! 1. Drain every agent's mailbox in item insertion order, handling each
//!    message synchronously (`select` / `set_action` / `subscribe`).
//! 2. Emit a frame snapshot to the editor sink and the battle log.
//! 3. Advance the simulated clock (`frame * GAME_FRAME_TIME`, computed
//!    rather than accumulated so the time-limit predicate is exact).
//! 4. Step every live item's pending action in insertion order, applying
//!    outcomes (movement, damage, state) and firing the events they cause.
//! 5. Apply the defeat predicates; if exactly one real player remains,
//!    fill the result section and emit the full log.

#![deny(unsafe_code)]

pub mod agent;
pub mod descriptor;
pub mod events;
pub mod handler;
pub mod log;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::agent::ItemAgent;
    pub use crate::descriptor::{BattleDescriptor, CodeEntry};
    pub use crate::events::{Delivery, EventKind, EventRegistry, Subscription};
    pub use crate::handler::{BattleError, FightConfig, FightHandler};
    pub use crate::log::{BattleLog, EditorClient, RecordingClient};
    pub use redoubt_core::prelude::*;
}
