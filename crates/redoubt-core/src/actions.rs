//! Action parsing and the per-frame step machinery.
//!
//! Player programs submit commands as `(action name, data dict)` pairs.
//! Parsing rejects unknown kinds and malformed data up front and yields a
//! [`ParsedAction`]; each frame the referee runs the pending action through
//! [`ActionSet::step`], which reads the battlefield via an
//! [`ActionContext`] and returns a [`StepOutcome`] describing the item's
//! new state and any deferred effects (movement, damage). The referee
//! applies outcomes itself, so steps never touch shared state directly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::ItemId;
use crate::item::{FightItem, Fighters, ItemState};
use crate::map::{euclidean_distance, round6, WorldMap};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a command could not be parsed or stepped.
///
/// On the `set_action` path this becomes a `bad_action` reply to the
/// program; on the frame path it silently reverts the item to idle.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The action name is not in the action set.
    #[error("unknown action '{0}'")]
    Unknown(String),

    /// The data dict is missing or malformed.
    #[error("malformed action data: {0}")]
    Malformed(String),

    /// The action is well-formed but currently illegal for this item.
    #[error("action cannot run: {0}")]
    NotRunnable(String),
}

// ---------------------------------------------------------------------------
// ParsedAction
// ---------------------------------------------------------------------------

/// A validated command, ready to be stepped each frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ParsedAction {
    /// Travel to a point on the map.
    Move {
        coordinates: [f64; 2],
    },
    /// Engage a specific item, chasing it if necessary.
    Attack {
        id: ItemId,
    },
    /// Stand ground, firing on enemies that come into range.
    Hold,
}

// ---------------------------------------------------------------------------
// ActionContext
// ---------------------------------------------------------------------------

/// Read-only view of the battlefield handed to parse and step calls.
pub struct ActionContext<'a> {
    /// All fight items, keyed by id; key order is insertion order.
    pub fighters: &'a Fighters,
    /// The occupancy grid and its pathing graph.
    pub map: &'a WorldMap,
    /// Simulated seconds per frame.
    pub frame_time: f64,
}

impl<'a> ActionContext<'a> {
    /// Living, non-obstacle items owned by anyone but `player_id`.
    pub fn living_enemies(&self, player_id: i32) -> impl Iterator<Item = &'a FightItem> + '_ {
        self.fighters
            .values()
            .filter(move |it| !it.is_dead() && !it.is_obstacle() && it.player_id != player_id)
    }

    /// The closest living enemy of `seeker`, ties broken by insertion
    /// order. `None` when the battlefield holds no enemy.
    pub fn nearest_enemy(&self, seeker: &FightItem) -> Option<&'a FightItem> {
        let from = seeker.coordinates?;
        let mut best: Option<(&'a FightItem, f64)> = None;
        for enemy in self.living_enemies(seeker.player_id) {
            let Some(position) = enemy.coordinates else {
                continue;
            };
            let length = euclidean_distance(from, position);
            if best.map_or(true, |(_, shortest)| length < shortest) {
                best = Some((enemy, length));
            }
        }
        best.map(|(enemy, _)| enemy)
    }

    /// Living enemies whose edge lies within `seeker`'s firing range.
    pub fn enemies_in_firing_range(&self, seeker: &FightItem) -> Vec<&'a FightItem> {
        let Some(from) = seeker.coordinates else {
            return Vec::new();
        };
        let range = seeker.firing_range.unwrap_or(0.0);
        self.living_enemies(seeker.player_id)
            .filter(|enemy| {
                enemy
                    .coordinates
                    .map_or(false, |p| euclidean_distance(from, p) - enemy.size / 2.0 <= range)
            })
            .collect()
    }

    /// The closest enemy within firing range, ties broken by insertion order.
    pub fn nearest_enemy_in_firing_range(&self, seeker: &FightItem) -> Option<&'a FightItem> {
        let from = seeker.coordinates?;
        let mut best: Option<(&'a FightItem, f64)> = None;
        for enemy in self.enemies_in_firing_range(seeker) {
            let Some(position) = enemy.coordinates else {
                continue;
            };
            let length = euclidean_distance(from, position);
            if best.map_or(true, |(_, shortest)| length < shortest) {
                best = Some((enemy, length));
            }
        }
        best.map(|(enemy, _)| enemy)
    }
}

// ---------------------------------------------------------------------------
// StepOutcome
// ---------------------------------------------------------------------------

/// What one frame of an action produced. The referee applies the fields in
/// order: coordinates, charging, damage, then the new state.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// The item's state for this frame.
    pub state: ItemState,
    /// New center coordinates, when the item moved.
    pub coordinates: Option<[f64; 2]>,
    /// New value of the item's shot-cooldown counter.
    pub charging: Option<f64>,
    /// Damage to apply, as `(target, amount)` pairs in firing order.
    pub damage: Vec<(ItemId, f64)>,
}

impl StepOutcome {
    fn state(state: ItemState) -> Self {
        Self {
            state,
            coordinates: None,
            charging: None,
            damage: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionSet
// ---------------------------------------------------------------------------

/// The seam between the referee and the per-action algorithms.
pub trait ActionSet {
    /// Validate a raw `(name, data)` command into a [`ParsedAction`].
    fn parse(
        &self,
        action: &str,
        data: &Value,
        ctx: &ActionContext<'_>,
    ) -> Result<ParsedAction, ActionError>;

    /// Run one frame of a pending action for `item`.
    fn step(
        &self,
        item: &FightItem,
        ctx: &ActionContext<'_>,
        action: &ParsedAction,
    ) -> Result<StepOutcome, ActionError>;
}

// ---------------------------------------------------------------------------
// StandardActions
// ---------------------------------------------------------------------------

/// The built-in move / attack / hold set.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardActions;

impl ActionSet for StandardActions {
    fn parse(
        &self,
        action: &str,
        data: &Value,
        ctx: &ActionContext<'_>,
    ) -> Result<ParsedAction, ActionError> {
        match action {
            "move" => {
                let coordinates = point_from(data.get("coordinates")).ok_or_else(|| {
                    ActionError::Malformed("move needs a coordinates pair".to_owned())
                })?;
                if !ctx.map.is_point_on_map(coordinates[0], coordinates[1]) {
                    return Err(ActionError::NotRunnable(
                        "destination is off the map".to_owned(),
                    ));
                }
                Ok(ParsedAction::Move { coordinates })
            }
            "attack" => {
                let raw = data
                    .get("id")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| ActionError::Malformed("attack needs a target id".to_owned()))?;
                let id = ItemId::from_raw(raw as u32);
                if !ctx.fighters.contains_key(&id) {
                    return Err(ActionError::NotRunnable(format!("no item with id {id}")));
                }
                Ok(ParsedAction::Attack { id })
            }
            "hold" => Ok(ParsedAction::Hold),
            other => Err(ActionError::Unknown(other.to_owned())),
        }
    }

    fn step(
        &self,
        item: &FightItem,
        ctx: &ActionContext<'_>,
        action: &ParsedAction,
    ) -> Result<StepOutcome, ActionError> {
        match action {
            ParsedAction::Move { coordinates } => step_move(item, ctx, *coordinates),
            ParsedAction::Attack { id } => step_attack(item, ctx, *id),
            ParsedAction::Hold => Ok(step_hold(item, ctx)),
        }
    }
}

/// One frame of travel toward `destination`.
fn step_move(
    item: &FightItem,
    ctx: &ActionContext<'_>,
    destination: [f64; 2],
) -> Result<StepOutcome, ActionError> {
    let position = item
        .coordinates
        .ok_or_else(|| ActionError::NotRunnable("item has no coordinates".to_owned()))?;
    let speed = item
        .speed
        .filter(|s| *s > 0.0)
        .ok_or_else(|| ActionError::NotRunnable("item cannot move".to_owned()))?;

    let step_length = speed * ctx.frame_time;
    let remaining = euclidean_distance(position, destination);
    if remaining <= step_length {
        let mut outcome = StepOutcome::state(ItemState::Stopped);
        outcome.coordinates = Some(destination);
        return Ok(outcome);
    }

    let scale = step_length / remaining;
    let next = [
        round6(position[0] + (destination[0] - position[0]) * scale),
        round6(position[1] + (destination[1] - position[1]) * scale),
    ];
    let mut outcome = StepOutcome::state(ItemState::Move);
    outcome.coordinates = Some(next);
    Ok(outcome)
}

/// One frame of engaging a specific target: fire when charged and in
/// range, chase when mobile and out of range, hold otherwise.
fn step_attack(
    item: &FightItem,
    ctx: &ActionContext<'_>,
    target_id: ItemId,
) -> Result<StepOutcome, ActionError> {
    let target = ctx
        .fighters
        .get(&target_id)
        .filter(|t| !t.is_dead())
        .ok_or_else(|| ActionError::NotRunnable(format!("target {target_id} is gone")))?;
    let position = item
        .coordinates
        .ok_or_else(|| ActionError::NotRunnable("item has no coordinates".to_owned()))?;
    let aim = target
        .coordinates
        .ok_or_else(|| ActionError::NotRunnable("target has no coordinates".to_owned()))?;

    let range = item.firing_range.unwrap_or(0.0);
    let gap = euclidean_distance(position, aim) - target.size / 2.0;
    if gap > range {
        // Out of range: mobile items close in, static ones wait.
        if item.speed.map_or(false, |s| s > 0.0) {
            let mut outcome = step_move(item, ctx, aim)?;
            outcome.charging = Some(cooled(item));
            return Ok(outcome);
        }
        let mut outcome = StepOutcome::state(ItemState::Hold);
        outcome.charging = Some(cooled(item));
        return Ok(outcome);
    }

    Ok(engage(item, target, ctx))
}

/// One frame of standing ground, firing on the nearest enemy in range.
fn step_hold(item: &FightItem, ctx: &ActionContext<'_>) -> StepOutcome {
    match ctx.nearest_enemy_in_firing_range(item) {
        Some(enemy) => engage(item, enemy, ctx),
        None => {
            let mut outcome = StepOutcome::state(ItemState::Hold);
            outcome.charging = Some(cooled(item));
            outcome
        }
    }
}

/// Fire on `target` if the cooldown allows, otherwise keep charging.
///
/// A shot deals `damage_per_shot` to the target and splashes
/// `area_damage_per_shot` onto every other living non-obstacle item
/// within `area_damage_radius` of the firing point.
fn engage(item: &FightItem, target: &FightItem, ctx: &ActionContext<'_>) -> StepOutcome {
    if item.charging > 0.0 {
        let mut outcome = StepOutcome::state(ItemState::Hold);
        outcome.charging = Some(cooled(item));
        return outcome;
    }

    let firing_point = target.coordinates.unwrap_or_default();
    let mut outcome = StepOutcome::state(ItemState::Attack { firing_point });
    outcome.charging = Some(item.rate_of_fire.unwrap_or(0.0));
    outcome
        .damage
        .push((target.id, item.damage_per_shot.unwrap_or(0.0)));

    if item.area_damage_per_shot > 0.0 && item.area_damage_radius > 0.0 {
        for other in ctx.fighters.values() {
            if other.id == target.id || other.is_dead() || other.is_obstacle() {
                continue;
            }
            let Some(position) = other.coordinates else {
                continue;
            };
            if euclidean_distance(firing_point, position) <= item.area_damage_radius {
                outcome.damage.push((other.id, item.area_damage_per_shot));
            }
        }
    }
    outcome
}

/// The cooldown counter after one more frame of charging.
fn cooled(item: &FightItem) -> f64 {
    (item.charging - 1.0).max(0.0)
}

fn point_from(value: Option<&Value>) -> Option<[f64; 2]> {
    let list = value?.as_array()?;
    if list.len() != 2 {
        return None;
    }
    Some([list[0].as_f64()?, list[1].as_f64()?])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
