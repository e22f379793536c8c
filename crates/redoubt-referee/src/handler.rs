//! The fight handler: owns the battle and advances it frame by frame.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde_json::{json, Value};

use redoubt_core::actions::{ActionContext, ActionSet, ParsedAction, StandardActions};
use redoubt_core::id::{next_item_id, ItemId};
use redoubt_core::item::{CraftItem, FightItem, Fighters, ItemDescriptor, ItemState, CUT_FROM_BUILDING};
use redoubt_core::map::{round6, WorldMap};
use redoubt_core::player::{DefeatReason, Party, Player, Role};
use redoubt_env::{
    Command, CommandError, EnvError, Environment, EnvironmentsController, Message, STATUS_SUCCESS,
};

use crate::agent::{is_executable, parse_select_field, ItemAgent, SelectQuery};
use crate::descriptor::BattleDescriptor;
use crate::events::{Delivery, EventKind, EventRegistry};
use crate::log::{battle_snapshot, streaming_frame, BattleLog, EditorClient};

/// Landing slots around a craft, in fill order. A craft never lands more
/// units than there are slots.
const LAND_POSITION_SHIFTS: [[f64; 2]; 12] = [
    [-1.0, 0.0],
    [-1.0, -1.0],
    [-1.0, 1.0],
    [-2.0, 0.0],
    [-2.0, -1.0],
    [-2.0, 1.0],
    [-2.0, -2.0],
    [-2.0, 2.0],
    [-3.0, 0.0],
    [-3.0, -1.0],
    [-3.0, 1.0],
    [-3.0, -2.0],
];

/// Maximum units a single craft can land.
pub const MAX_LAND_POSITIONS: usize = LAND_POSITION_SHIFTS.len();

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while setting up a battle.
#[derive(Debug, thiserror::Error)]
pub enum BattleError {
    /// The descriptor is missing something the battle cannot start without.
    #[error("invalid battle descriptor: {0}")]
    BadDescriptor(String),

    /// An environment could not be acquired or started.
    #[error(transparent)]
    Env(#[from] EnvError),
}

// ---------------------------------------------------------------------------
// FightConfig
// ---------------------------------------------------------------------------

/// Timing and determinism knobs for one battle.
#[derive(Debug, Clone)]
pub struct FightConfig {
    /// Real seconds between frames when running in real time.
    pub frame_time: f64,
    /// Simulated seconds each frame advances the clock by.
    pub game_frame_time: f64,
    /// Tick as fast as possible instead of sleeping between frames.
    pub headless: bool,
    /// Seed for the craft-placement draw; same seed, same columns.
    pub seed: u64,
}

impl Default for FightConfig {
    fn default() -> Self {
        Self {
            frame_time: 0.1,
            game_frame_time: 0.1,
            headless: false,
            seed: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// FightHandler
// ---------------------------------------------------------------------------

/// Owns the item table, world map, event registry, agents, and battle log;
/// drives the match to its result.
pub struct FightHandler {
    config: FightConfig,
    is_stream: bool,
    players: BTreeMap<i32, Player>,
    codes: HashMap<i64, String>,
    map_size: [usize; 2],
    rewards: Value,
    time_limit: f64,
    map: WorldMap,
    fighters: Fighters,
    crafts: BTreeMap<ItemId, CraftItem>,
    agents: BTreeMap<ItemId, ItemAgent>,
    events: EventRegistry,
    actions: Box<dyn ActionSet>,
    log: BattleLog,
    editor: Box<dyn EditorClient>,
    environments: Box<dyn EnvironmentsController>,
    current_frame: u64,
    current_game_time: f64,
    defeat_reason: Option<DefeatReason>,
    winner: Option<i32>,
    stopped: bool,
    log_flushed: bool,
    rng: Pcg64,
}

impl FightHandler {
    /// Set up a battle from its descriptor: register players and codes,
    /// spawn crafts and items, build the map, log the initial state, and
    /// start every executable item's program.
    pub fn start(
        descriptor: BattleDescriptor,
        config: FightConfig,
        environments: Box<dyn EnvironmentsController>,
        editor: Box<dyn EditorClient>,
    ) -> Result<Self, BattleError> {
        let mut players: BTreeMap<i32, Player> =
            descriptor.players.iter().map(|p| (p.id, p.clone())).collect();
        players.insert(Player::neutral().id, Player::neutral());

        let codes: HashMap<i64, String> = descriptor
            .codes
            .iter()
            .map(|entry| (entry.id, entry.code.clone()))
            .collect();

        let mut handler = Self {
            rng: Pcg64::seed_from_u64(config.seed),
            config,
            is_stream: descriptor.is_stream,
            players,
            codes,
            map_size: descriptor.map_size,
            rewards: descriptor.rewards.clone(),
            time_limit: descriptor.time_limit.unwrap_or(f64::INFINITY),
            map: WorldMap::new(descriptor.map_size, []),
            fighters: Fighters::new(),
            crafts: BTreeMap::new(),
            agents: BTreeMap::new(),
            events: EventRegistry::new(),
            actions: Box::new(StandardActions),
            log: BattleLog::new(),
            editor,
            environments,
            current_frame: 0,
            current_game_time: 0.0,
            defeat_reason: None,
            winner: None,
            stopped: false,
            log_flushed: false,
        };

        for element in &descriptor.map_elements {
            if !handler.players.contains_key(&element.player_id) {
                return Err(BattleError::BadDescriptor(format!(
                    "map element owned by unknown player {}",
                    element.player_id
                )));
            }
            let members = if element.role == Role::Craft {
                handler.spawn_craft(element)?
            } else {
                vec![element.clone()]
            };
            for member in members {
                handler.add_fight_item(member)?;
            }
        }

        handler.log_initial_state();
        handler.map = WorldMap::new(
            handler.map_size,
            handler
                .fighters
                .values()
                .filter(|it| it.size > 0.0)
                .filter_map(|it| it.coordinates.map(|c| (c, it.size))),
        );
        handler.launch_agents()?;

        tracing::info!(
            players = handler.players.len() - 1,
            items = handler.fighters.len(),
            crafts = handler.crafts.len(),
            "battle started"
        );
        Ok(handler)
    }

    // -- accessors ----------------------------------------------------------

    pub fn fighters(&self) -> &Fighters {
        &self.fighters
    }

    pub fn crafts(&self) -> &BTreeMap<ItemId, CraftItem> {
        &self.crafts
    }

    pub fn map(&self) -> &WorldMap {
        &self.map
    }

    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    /// Ids of players still standing, the neutral owner included.
    pub fn player_ids(&self) -> Vec<i32> {
        self.players.keys().copied().collect()
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    /// The simulated clock, computed as `frame * game_frame_time`.
    pub fn current_game_time(&self) -> f64 {
        self.current_game_time
    }

    pub fn winner(&self) -> Option<i32> {
        self.winner
    }

    pub fn defeat_reason(&self) -> Option<DefeatReason> {
        self.defeat_reason
    }

    // -- setup --------------------------------------------------------------

    /// Place a craft on the landing edge and clone out its unit
    /// descriptors. A craft with no free column is abandoned: it is not
    /// registered and lands nothing.
    fn spawn_craft(&mut self, craft: &ItemDescriptor) -> Result<Vec<ItemDescriptor>, BattleError> {
        let Some(column) = self.pick_craft_column() else {
            tracing::warn!("no free landing column; craft abandoned");
            return Ok(Vec::new());
        };
        let coordinates = [self.map_size[0] as f64, column as f64];
        let quantity = craft.unit_quantity.unwrap_or(0).min(MAX_LAND_POSITIONS);
        let template = match (&craft.in_unit_description, quantity) {
            (_, 0) => None,
            (Some(template), _) => Some(template.as_ref()),
            (None, _) => {
                return Err(BattleError::BadDescriptor(
                    "craft carries units but no unit description".to_owned(),
                ))
            }
        };

        let mut members = Vec::with_capacity(quantity);
        if let Some(template) = template {
            for shift in &LAND_POSITION_SHIFTS[..quantity] {
                let mut unit = template.clone();
                unit.player_id = craft.player_id;
                unit.operating_code = craft.operating_code;
                unit.role = Role::Unit;
                let position = [coordinates[0] + shift[0], coordinates[1] + shift[1]];
                unit.tile_position = Some(position);
                unit.coordinates = Some(position);
                members.push(unit);
            }
        }

        let item = CraftItem::new(next_item_id(), craft, coordinates);
        self.crafts.insert(item.id, item);
        Ok(members)
    }

    /// A free landing column in `[1, width)`, at least 3 away from every
    /// existing craft. `None` when no column qualifies.
    fn pick_craft_column(&mut self) -> Option<usize> {
        let width = self.map_size[1];
        let taken: Vec<f64> = self.crafts.values().map(|c| c.coordinates[1]).collect();
        let available: Vec<usize> = (1..width)
            .filter(|&column| {
                let column = column as f64;
                !taken.iter().any(|&pos| pos - 2.0 <= column && column <= pos + 2.0)
            })
            .collect();
        available.choose(&mut self.rng).copied()
    }

    /// Derive the item's center and collision size, construct it, and add
    /// it to the table.
    fn add_fight_item(&mut self, mut desc: ItemDescriptor) -> Result<ItemId, BattleError> {
        let tile = desc.tile_position.ok_or_else(|| {
            BattleError::BadDescriptor(format!("{} item has no tile position", desc.role.as_str()))
        })?;
        let size = desc.size;
        desc.coordinates = Some([round6(tile[0] + size / 2.0), round6(tile[1] + size / 2.0)]);
        desc.base_size = size;
        desc.size = (size - CUT_FROM_BUILDING).max(0.0);

        let item = FightItem::new(next_item_id(), &desc);
        let id = item.id;
        self.fighters.insert(id, item);
        Ok(id)
    }

    fn log_initial_state(&mut self) {
        for item in self.fighters.values() {
            if item.role == Role::Unit {
                self.log.log_initial_unit(item);
            } else if item.role.is_player_static() {
                self.log.log_initial_building(item);
            }
        }
        for craft in self.crafts.values() {
            self.log.log_initial_craft(craft);
        }
    }

    /// Start the program of every executable item: acquire its player's
    /// environment, run the code, and handle the messages already waiting.
    fn launch_agents(&mut self) -> Result<(), BattleError> {
        let ids: Vec<ItemId> = self.fighters.keys().copied().collect();
        for id in ids {
            let (env_name, code) = {
                let item = &self.fighters[&id];
                let code = item
                    .operating_code
                    .and_then(|key| self.codes.get(&key))
                    .cloned();
                if !is_executable(item, code.is_some()) {
                    continue;
                }
                let Some(code) = code else {
                    tracing::warn!(item = %id, "executable item has no resolvable code; skipped");
                    continue;
                };
                let env_name = self
                    .players
                    .get(&item.player_id)
                    .map(|p| p.env_name.clone())
                    .unwrap_or_default();
                (env_name, code)
            };

            let mut env = self.environments.acquire(&env_name)?;
            let first = env.run_code(&code)?;
            self.agents.insert(id, ItemAgent::new(id, env));
            if let Some(message) = first {
                self.handle_message(id, message);
            }
            self.pump_agent(id);
        }
        Ok(())
    }

    // -- message handling ---------------------------------------------------

    /// Drain every agent's mailbox in item insertion order.
    fn pump_agents(&mut self) {
        let ids: Vec<ItemId> = self.agents.keys().copied().collect();
        for id in ids {
            self.pump_agent(id);
        }
    }

    fn pump_agent(&mut self, id: ItemId) {
        loop {
            let message = self
                .agents
                .get_mut(&id)
                .and_then(|agent| agent.env.read_message());
            match message {
                Some(message) => self.handle_message(id, message),
                None => break,
            }
        }
    }

    fn handle_message(&mut self, id: ItemId, mut message: Message) {
        if let Some(status) = message.status.take() {
            if status != STATUS_SUCCESS {
                tracing::debug!(item = %id, status, "program reported non-success status");
            }
        }
        match message.command() {
            Ok(Command::Select { fields }) => self.verb_select(id, &fields),
            Ok(Command::SetAction { action, data }) => self.verb_set_action(id, &action, &data),
            Ok(Command::Subscribe {
                event,
                lookup_key,
                data,
            }) => self.verb_subscribe(id, &event, &lookup_key, data),
            Err(CommandError::NoMethod) => {
                tracing::debug!(item = %id, "message without method dropped");
            }
            Err(err) => {
                tracing::warn!(item = %id, %err, "unhandled program message");
            }
        }
    }

    /// `select`: answer each field query, folding failures into inline
    /// error records, and deliver the full response list.
    fn verb_select(&mut self, id: ItemId, fields: &[Value]) {
        let mut data = Vec::with_capacity(fields.len());
        for field in fields {
            data.push(match parse_select_field(field) {
                Err(message) => json!({"error": message}),
                Ok(query) => self.run_select(id, &query),
            });
        }
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.env.select_result(data);
        }
    }

    fn run_select(&self, id: ItemId, query: &SelectQuery) -> Value {
        let Some(requester) = self.fighters.get(&id) else {
            return json!({"error": "unknown item"});
        };
        let player_id = requester.player_id;
        match query {
            SelectQuery::MyInfo => self.item_info(id),
            SelectQuery::ItemInfo { id } => self.item_info(*id),
            SelectQuery::Players { parties } => {
                let players: Vec<Value> = self
                    .players
                    .keys()
                    .filter(|&&p| p >= 0)
                    .map(|p| json!({"player_id": p}))
                    .collect();
                Value::Array(filter_by_party(&players, parties, player_id))
            }
            SelectQuery::Items { parties, roles } => {
                let infos: Vec<Value> = self
                    .fighters
                    .values()
                    .filter(|it| !it.is_dead())
                    .map(FightItem::info)
                    .collect();
                let infos = filter_by_party(&infos, parties, player_id);
                Value::Array(filter_by_role(&infos, roles))
            }
            SelectQuery::NearestEnemy { id } => match self.fighters.get(id) {
                None => json!({"error": "unknown item"}),
                Some(seeker) => self
                    .action_context()
                    .nearest_enemy(seeker)
                    .map_or(Value::Null, |enemy| self.item_info(enemy.id)),
            },
            SelectQuery::EnemyItemsInMyFiringRange { id } => match self.fighters.get(id) {
                None => json!({"error": "unknown item"}),
                Some(seeker) => Value::Array(
                    self.action_context()
                        .enemies_in_firing_range(seeker)
                        .into_iter()
                        .map(|enemy| self.item_info(enemy.id))
                        .collect(),
                ),
            },
        }
    }

    fn item_info(&self, id: ItemId) -> Value {
        self.fighters
            .get(&id)
            .map_or_else(|| json!({"error": "unknown item"}), FightItem::info)
    }

    /// `set_action`: parse the command; a validation failure becomes a
    /// `bad_action` reply and leaves the pending action unchanged.
    fn verb_set_action(&mut self, id: ItemId, action: &str, data: &Value) {
        let parsed = {
            let ctx = self.action_context();
            self.actions.parse(action, data, &ctx)
        };
        match parsed {
            Ok(parsed) => {
                if let Some(item) = self.fighters.get_mut(&id) {
                    item.action = Some(parsed);
                }
                if let Some(agent) = self.agents.get_mut(&id) {
                    agent.env.confirm();
                }
            }
            Err(err) => {
                if let Some(agent) = self.agents.get_mut(&id) {
                    agent.env.bad_action(Some(err.to_string()));
                }
            }
        }
    }

    /// `subscribe`: register with the event bus. Unknown events, exact
    /// duplicates, and `unsubscribe_all` all answer `bad_action()`.
    fn verb_subscribe(&mut self, id: ItemId, event: &str, lookup_key: &str, data: Value) {
        let registered = if event == "unsubscribe_all" {
            self.events.unsubscribe_all(id);
            false
        } else {
            match EventKind::from_name(event) {
                Some(kind) => self.events.subscribe(kind, id, lookup_key, data),
                None => false,
            }
        };
        if let Some(agent) = self.agents.get_mut(&id) {
            if registered {
                agent.env.confirm();
            } else {
                agent.env.bad_action(None);
            }
        }
    }

    // -- frame loop ---------------------------------------------------------

    /// Advance one frame. Returns the winner's player id once the battle
    /// has finished; further calls are no-ops.
    pub fn tick(&mut self) -> Option<i32> {
        if self.winner.is_some() || self.stopped {
            return self.winner;
        }

        self.pump_agents();
        self.send_frame(None, false);
        self.current_frame += 1;
        self.current_game_time = self.current_frame as f64 * self.config.game_frame_time;

        let ids: Vec<ItemId> = self.fighters.keys().copied().collect();
        for id in ids {
            let fighter = &self.fighters[&id];
            if fighter.is_dead() {
                continue;
            }
            match fighter.action.clone() {
                None => self.set_state_idle(id),
                Some(action) => self.do_frame_action(id, &action),
            }
        }

        if let Some(winner) = self.determine_winner() {
            self.winner = Some(winner);
            tracing::info!(winner, reason = ?self.defeat_reason, "battle finished");
            self.send_frame(Some(json!({"winner": winner})), true);
        }
        self.winner
    }

    /// Drive the battle to its end, sleeping `frame_time` between frames
    /// unless running headless.
    pub fn run(&mut self) -> Option<i32> {
        while self.winner.is_none() && !self.stopped {
            self.tick();
            if self.winner.is_none() && !self.stopped && !self.config.headless {
                std::thread::sleep(Duration::from_secs_f64(self.config.frame_time));
            }
        }
        self.winner
    }

    /// Stop the battle without a winner and emit the log.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.flush_log();
    }

    fn do_frame_action(&mut self, id: ItemId, action: &ParsedAction) {
        let outcome = {
            let ctx = self.action_context();
            self.actions.step(&self.fighters[&id], &ctx, action)
        };
        match outcome {
            Err(err) => {
                tracing::debug!(item = %id, %err, "frame action reverted to idle");
                self.set_state_idle(id);
            }
            Ok(outcome) => {
                if let Some(coordinates) = outcome.coordinates {
                    self.set_coordinates(id, coordinates);
                }
                if let Some(charging) = outcome.charging {
                    if let Some(item) = self.fighters.get_mut(&id) {
                        item.charging = charging;
                    }
                }
                for (target, amount) in &outcome.damage {
                    self.apply_damage(*target, *amount);
                }
                let stopped = outcome.state == ItemState::Stopped;
                if let Some(item) = self.fighters.get_mut(&id) {
                    item.state = outcome.state;
                }
                if stopped {
                    let deliveries = self.events.fire_im_stop(&self.fighters, id);
                    self.deliver(deliveries);
                }
            }
        }
    }

    fn action_context(&self) -> ActionContext<'_> {
        ActionContext {
            fighters: &self.fighters,
            map: &self.map,
            frame_time: self.config.game_frame_time,
        }
    }

    /// Go idle, firing `im_idle` first so subscribers see the transition.
    fn set_state_idle(&mut self, id: ItemId) {
        let deliveries = self.events.fire_im_idle(&self.fighters, id);
        self.deliver(deliveries);
        if let Some(item) = self.fighters.get_mut(&id) {
            item.state = ItemState::Idle;
        }
    }

    /// Move an item and fire the range events its movement may trigger.
    fn set_coordinates(&mut self, id: ItemId, coordinates: [f64; 2]) {
        if let Some(item) = self.fighters.get_mut(&id) {
            item.coordinates = Some(coordinates);
        }
        let deliveries = self.events.fire_range_events(&self.fighters, id);
        self.deliver(deliveries);
    }

    /// Apply damage, clamping at zero; a kill flips the item to dead,
    /// clears its footprint, and fires `death`.
    fn apply_damage(&mut self, target: ItemId, amount: f64) {
        let died = {
            let Some(item) = self.fighters.get_mut(&target) else {
                return;
            };
            if item.is_dead() {
                return;
            }
            item.hit_points = (item.hit_points - amount).max(0.0);
            item.is_dead()
        };
        if died {
            self.set_state_dead(target);
        }
    }

    fn set_state_dead(&mut self, id: ItemId) {
        let footprint = {
            let Some(item) = self.fighters.get_mut(&id) else {
                return;
            };
            item.state = ItemState::Dead;
            (item.size > 0.0)
                .then_some(item.coordinates.map(|c| (c, item.size)))
                .flatten()
        };
        if let Some((coordinates, size)) = footprint {
            self.map.clear_from_map(coordinates, size);
        }
        let deliveries = self.events.fire_death(&self.fighters, id);
        self.deliver(deliveries);
    }

    fn deliver(&mut self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            if let Some(agent) = self.agents.get_mut(&delivery.receiver) {
                agent.env.send_event(&delivery.lookup_key, delivery.data);
            }
        }
    }

    // -- victory ------------------------------------------------------------

    /// Remove defeated players; when exactly one real player remains, fill
    /// the result section and report the winner.
    fn determine_winner(&mut self) -> Option<i32> {
        let ids: Vec<i32> = self.players.keys().copied().collect();
        for player_id in ids {
            if let Some(player) = self.players.get(&player_id) {
                if let Some(reason) = self.defeat_reason_for(player) {
                    tracing::info!(player = player_id, reason = reason.as_str(), "player defeated");
                    self.defeat_reason = Some(reason);
                    self.players.remove(&player_id);
                }
            }
            let real: Vec<i32> = self.players.keys().copied().filter(|&id| id >= 0).collect();
            if real.len() == 1 {
                let winner = real[0];
                self.log.set_result(
                    winner,
                    &self.rewards,
                    self.count_casualties(&[Role::Unit]),
                    self.defeat_reason,
                );
                return Some(winner);
            }
        }
        None
    }

    /// The defeat predicates, in normative order; first match wins.
    fn defeat_reason_for(&self, player: &Player) -> Option<DefeatReason> {
        let reasons = &player.defeat_reasons;
        if reasons.contains(&DefeatReason::Units) && !self.has_living_role(player.id, Role::Unit) {
            return Some(DefeatReason::Units);
        }
        if reasons.contains(&DefeatReason::Center) && !self.has_living_role(player.id, Role::Center)
        {
            return Some(DefeatReason::Center);
        }
        if reasons.contains(&DefeatReason::Time) && self.current_game_time >= self.time_limit {
            return Some(DefeatReason::Time);
        }
        None
    }

    fn has_living_role(&self, player_id: i32, role: Role) -> bool {
        self.fighters
            .values()
            .any(|it| it.player_id == player_id && it.role == role && !it.is_dead())
    }

    /// Dead items of the given roles, counted per item type.
    fn count_casualties(&self, roles: &[Role]) -> BTreeMap<String, u32> {
        let mut casualties = BTreeMap::new();
        for item in self.fighters.values() {
            if item.is_dead() && roles.contains(&item.role) {
                let item_type = item
                    .item_type
                    .clone()
                    .unwrap_or_else(|| "unknown".to_owned());
                *casualties.entry(item_type).or_insert(0) += 1;
            }
        }
        casualties
    }

    // -- output -------------------------------------------------------------

    fn send_frame(&mut self, status: Option<Value>, battle_finished: bool) {
        if self.is_stream {
            let payload = streaming_frame(
                status.unwrap_or_else(|| json!({})),
                &self.fighters,
                &self.crafts,
                self.map_size,
                self.map.grid(),
                self.current_frame,
                self.current_game_time,
            );
            self.editor.send_battle(payload);
        }
        self.log.push_frame(battle_snapshot(&self.fighters));
        if battle_finished {
            self.flush_log();
        }
    }

    /// Emit the full battle log, exactly once per match.
    fn flush_log(&mut self) {
        if self.log_flushed {
            return;
        }
        self.log_flushed = true;
        self.editor.send_battle(self.log.to_wire());
    }
}

impl Drop for FightHandler {
    /// The log always reaches the editor, even when the handler is torn
    /// down mid-match.
    fn drop(&mut self) {
        self.flush_log();
    }
}

// ---------------------------------------------------------------------------
// Party / role filters
// ---------------------------------------------------------------------------

/// Party-filter a list of info dicts by their `player_id`. The neutral
/// owner is on nobody's side; when both parties are requested, enemies
/// come first.
fn filter_by_party(infos: &[Value], parties: &[Party], player_id: i32) -> Vec<Value> {
    let owner = |info: &Value| info.get("player_id").and_then(Value::as_i64).unwrap_or(-1);
    let mut result = Vec::new();
    if parties.contains(&Party::Enemy) {
        result.extend(
            infos
                .iter()
                .filter(|info| owner(info) >= 0 && owner(info) != i64::from(player_id))
                .cloned(),
        );
    }
    if parties.contains(&Party::My) {
        result.extend(
            infos
                .iter()
                .filter(|info| owner(info) >= 0 && owner(info) == i64::from(player_id))
                .cloned(),
        );
    }
    result
}

fn filter_by_role(infos: &[Value], roles: &[Role]) -> Vec<Value> {
    infos
        .iter()
        .filter(|info| {
            info.get("role")
                .and_then(Value::as_str)
                .map_or(false, |name| roles.iter().any(|r| r.as_str() == name))
        })
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
