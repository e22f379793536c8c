//! End-to-end battle scenarios driven through scripted environments.
//!
//! Each test starts a full handler from a JSON descriptor, feeds program
//! messages through queue-backed channels, ticks the frame loop by hand,
//! and checks the replies, events, and final log that come out.

use redoubt_env::{Message, Reply, ScriptedController, ScriptedEnvironment};
use redoubt_referee::prelude::*;
use serde_json::{json, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn headless_config() -> FightConfig {
    FightConfig {
        headless: true,
        seed: 7,
        ..FightConfig::default()
    }
}

fn start_battle(descriptor: Value) -> (FightHandler, ScriptedController, RecordingClient) {
    init_tracing();
    let descriptor: BattleDescriptor = serde_json::from_value(descriptor).unwrap();
    let controller = ScriptedController::new();
    let editor = RecordingClient::new();
    let handler = FightHandler::start(
        descriptor,
        headless_config(),
        Box::new(controller.clone()),
        Box::new(editor.clone()),
    )
    .unwrap();
    (handler, controller, editor)
}

fn find_item(handler: &FightHandler, player_id: i32, role: Role) -> ItemId {
    handler
        .fighters()
        .values()
        .find(|it| it.player_id == player_id && it.role == role)
        .map(|it| it.id)
        .unwrap()
}

fn event_replies(env: &ScriptedEnvironment) -> Vec<Reply> {
    env.replies()
        .into_iter()
        .filter(|r| matches!(r, Reply::Event { .. }))
        .collect()
}

// ---------------------------------------------------------------------------
// Victory scenarios
// ---------------------------------------------------------------------------

#[test]
fn idle_victory_on_missing_center() {
    // Player 1 fields no center at all, so the first tick ends the match.
    let (mut handler, _controller, editor) = start_battle(json!({
        "players": [
            {"id": 0, "env_name": "python_3", "defeat_reasons": ["center"]},
            {"id": 1, "env_name": "python_3", "defeat_reasons": ["center"]},
        ],
        "map_size": [10, 10],
        "map_elements": [
            {"role": "center", "player_id": 0, "hit_points": 100.0,
             "tile_position": [2.0, 2.0], "size": 2.0},
        ],
    }));

    assert_eq!(handler.tick(), Some(0));
    assert_eq!(handler.winner(), Some(0));
    assert_eq!(handler.defeat_reason(), Some(DefeatReason::Center));

    let log = editor.last().unwrap();
    assert_eq!(log["result"]["winner"], json!(0));
    assert_eq!(log["result"]["defeat_reason"], json!("center"));
    assert_eq!(log["result"]["casualties"], json!({}));
    assert_eq!(log["initial"]["buildings"].as_array().unwrap().len(), 1);

    // Further ticks are no-ops.
    assert_eq!(handler.tick(), Some(0));
}

#[test]
fn time_defeat_lands_exactly_on_the_limit() {
    let (mut handler, _controller, _editor) = start_battle(json!({
        "players": [
            {"id": 0, "env_name": "python_3", "defeat_reasons": ["time"]},
            {"id": 1, "env_name": "python_3", "defeat_reasons": []},
        ],
        "map_size": [10, 10],
        "time_limit": 1.0,
    }));

    for frame in 1..=9u64 {
        assert!(handler.tick().is_none(), "defeated early at frame {frame}");
    }
    assert!(handler.current_game_time() < 1.0);

    assert_eq!(handler.tick(), Some(1));
    assert_eq!(handler.current_game_time(), 1.0);
    assert_eq!(handler.defeat_reason(), Some(DefeatReason::Time));
}

#[test]
fn combat_to_units_defeat_with_casualties() {
    let (mut handler, controller, editor) = start_battle(json!({
        "players": [
            {"id": 0, "env_name": "python_3", "defeat_reasons": ["units"]},
            {"id": 1, "env_name": "python_3", "defeat_reasons": ["units"]},
        ],
        "codes": [{"id": 1, "code": "unit-brain"}],
        "map_size": [10, 10],
        "map_elements": [
            {"role": "unit", "player_id": 0, "operating_code": 1, "item_type": "ranger",
             "hit_points": 30.0, "speed": 2.0, "tile_position": [2.0, 2.0],
             "firing_range": 5.0, "damage_per_shot": 10.0, "rate_of_fire": 2.0},
            {"role": "unit", "player_id": 1, "operating_code": 1, "item_type": "raider",
             "hit_points": 20.0, "speed": 2.0, "tile_position": [2.0, 4.0],
             "firing_range": 5.0, "damage_per_shot": 5.0, "rate_of_fire": 2.0},
        ],
    }));

    let ranger = find_item(&handler, 0, Role::Unit);
    let raider = find_item(&handler, 1, Role::Unit);

    // Both programs order an attack once the ids are known.
    let ranger_env = controller.environment(0).unwrap();
    let raider_env = controller.environment(1).unwrap();
    ranger_env.push_message(Message::set_action("attack", json!({"id": raider})));
    raider_env.push_message(Message::set_action("attack", json!({"id": ranger})));

    let mut winner = None;
    for _ in 0..20 {
        winner = handler.tick();
        if winner.is_some() {
            break;
        }
    }

    assert_eq!(winner, Some(0));
    assert_eq!(handler.defeat_reason(), Some(DefeatReason::Units));
    assert!(handler.fighters()[&raider].is_dead());
    assert_eq!(handler.fighters()[&raider].hit_points, 0.0);
    assert_eq!(handler.fighters()[&raider].status(), "dead");
    assert!(!handler.fighters()[&ranger].is_dead());

    let log = editor.last().unwrap();
    assert_eq!(log["result"]["winner"], json!(0));
    assert_eq!(log["result"]["casualties"], json!({"raider": 1}));

    assert_eq!(ranger_env.replies()[0], Reply::Confirm);
    assert_eq!(raider_env.replies()[0], Reply::Confirm);
}

// ---------------------------------------------------------------------------
// Subscription scenarios
// ---------------------------------------------------------------------------

#[test]
fn enemy_in_firing_range_fires_exactly_once() {
    let (mut handler, controller, _editor) = start_battle(json!({
        "players": [
            {"id": 0, "env_name": "python_3", "defeat_reasons": []},
            {"id": 1, "env_name": "python_3", "defeat_reasons": []},
        ],
        "codes": [
            {"id": 1, "code": "sentry-brain"},
            {"id": 2, "code": "walker-brain"},
        ],
        "map_size": [12, 12],
        "map_elements": [
            {"role": "tower", "player_id": 0, "operating_code": 1,
             "hit_points": 100.0, "tile_position": [2.0, 2.0], "firing_range": 3.0},
            {"role": "unit", "player_id": 1, "operating_code": 2,
             "hit_points": 10.0, "speed": 2.0, "tile_position": [2.0, 9.0]},
        ],
    }));

    let walker = find_item(&handler, 1, Role::Unit);
    let sentry_env = controller.environment(0).unwrap();
    let walker_env = controller.environment(1).unwrap();

    sentry_env.push_message(Message::subscribe("enemy_in_my_firing_range", "k1", Value::Null));
    walker_env.push_message(Message::set_action("move", json!({"coordinates": [2.0, 1.0]})));

    // Walk until the subscription fires.
    let mut fired_at = None;
    for frame in 1..=30u64 {
        handler.tick();
        if !event_replies(&sentry_env).is_empty() {
            fired_at = Some(frame);
            break;
        }
    }
    let fired_at = fired_at.expect("subscription never fired");

    let events = event_replies(&sentry_env);
    assert_eq!(
        events,
        vec![Reply::Event {
            lookup_key: "k1".to_owned(),
            data: json!({"id": walker}),
        }]
    );
    assert!(handler.events().is_empty());

    // The walker stays in range; the one-shot subscription stays quiet.
    for _ in 0..5 {
        handler.tick();
    }
    assert_eq!(event_replies(&sentry_env).len(), 1, "fired again after frame {fired_at}");
}

#[test]
fn duplicate_subscription_confirms_then_rejects() {
    let (handler, controller, _editor) = start_battle(json!({
        "players": [
            {"id": 0, "env_name": "python_3", "defeat_reasons": []},
        ],
        "codes": [{"id": 1, "code": "watcher-brain"}],
        "map_size": [10, 10],
        "map_elements": [
            {"role": "tower", "player_id": 0, "operating_code": 1,
             "hit_points": 100.0, "tile_position": [2.0, 2.0]},
        ],
    }));

    // Queued before start: handled while the agent launches.
    let env = controller.environment(0).unwrap();
    env.push_message(Message::subscribe("death", "x", json!({"id": 5})));
    env.push_message(Message::subscribe("death", "x", json!({"id": 5})));

    let mut handler = handler;
    handler.tick();

    assert_eq!(env.replies(), vec![Reply::Confirm, Reply::BadAction(None)]);
    assert_eq!(handler.events().subscriptions(EventKind::Death).len(), 1);
}

#[test]
fn death_event_reaches_the_watcher() {
    let (mut handler, controller, _editor) = start_battle(json!({
        "players": [
            {"id": 0, "env_name": "python_3", "defeat_reasons": []},
            {"id": 1, "env_name": "python_3", "defeat_reasons": []},
        ],
        "codes": [{"id": 1, "code": "brain"}],
        "map_size": [10, 10],
        "map_elements": [
            {"role": "tower", "player_id": 0, "operating_code": 1, "hit_points": 100.0,
             "tile_position": [2.0, 2.0], "firing_range": 6.0,
             "damage_per_shot": 10.0, "rate_of_fire": 1.0},
            {"role": "unit", "player_id": 1, "operating_code": 1,
             "hit_points": 10.0, "speed": 2.0, "tile_position": [2.0, 5.0]},
        ],
    }));

    let tower = find_item(&handler, 0, Role::Tower);
    let victim = find_item(&handler, 1, Role::Unit);
    let tower_env = controller.environment(0).unwrap();

    tower_env.push_message(Message::subscribe("death", "doom", json!({"id": victim})));
    tower_env.push_message(Message::set_action("attack", json!({"id": victim})));

    let mut died_at = None;
    for frame in 1..=10u64 {
        handler.tick();
        if handler.fighters()[&victim].is_dead() {
            died_at = Some(frame);
            break;
        }
    }
    assert!(died_at.is_some(), "victim never died");

    let events = event_replies(&tower_env);
    assert_eq!(
        events,
        vec![Reply::Event {
            lookup_key: "doom".to_owned(),
            data: json!({"id": victim}),
        }]
    );
    // Attacker id check for completeness.
    assert_eq!(handler.fighters()[&tower].player_id, 0);
}

// ---------------------------------------------------------------------------
// Action validation
// ---------------------------------------------------------------------------

#[test]
fn bad_set_action_leaves_pending_action_unchanged() {
    let (mut handler, controller, _editor) = start_battle(json!({
        "players": [
            {"id": 0, "env_name": "python_3", "defeat_reasons": []},
        ],
        "codes": [{"id": 1, "code": "unit-brain"}],
        "map_size": [10, 10],
        "map_elements": [
            {"role": "unit", "player_id": 0, "operating_code": 1,
             "hit_points": 10.0, "speed": 2.0, "tile_position": [2.0, 2.0]},
        ],
    }));

    let unit = find_item(&handler, 0, Role::Unit);
    let env = controller.environment(0).unwrap();

    env.push_message(Message::set_action("move", json!({"coordinates": "north"})));
    handler.tick();

    let replies = env.replies();
    assert!(matches!(&replies[0], Reply::BadAction(Some(msg)) if msg.contains("malformed")));
    assert!(handler.fighters()[&unit].action.is_none());
    assert_eq!(handler.fighters()[&unit].status(), "idle");

    // A valid action still goes through afterwards.
    env.push_message(Message::set_action("move", json!({"coordinates": [5.0, 5.0]})));
    handler.tick();
    assert_eq!(env.replies()[1], Reply::Confirm);
    assert!(handler.fighters()[&unit].action.is_some());
    assert_eq!(handler.fighters()[&unit].status(), "move");
}

#[test]
fn move_completion_stops_and_fires_im_stop() {
    let (mut handler, controller, _editor) = start_battle(json!({
        "players": [
            {"id": 0, "env_name": "python_3", "defeat_reasons": []},
        ],
        "codes": [{"id": 1, "code": "unit-brain"}],
        "map_size": [10, 10],
        "map_elements": [
            {"role": "unit", "player_id": 0, "operating_code": 1,
             "hit_points": 10.0, "speed": 2.0, "tile_position": [2.0, 2.0]},
        ],
    }));

    let unit = find_item(&handler, 0, Role::Unit);
    let env = controller.environment(0).unwrap();

    env.push_message(Message::subscribe("im_stop", "arrived", Value::Null));
    env.push_message(Message::set_action("move", json!({"coordinates": [2.0, 3.0]})));

    // 1.0 tiles at 0.2 per frame: about five frames to arrive.
    for _ in 0..10 {
        handler.tick();
        if handler.fighters()[&unit].status() == "stopped" {
            break;
        }
    }
    assert_eq!(handler.fighters()[&unit].status(), "stopped");
    assert_eq!(handler.fighters()[&unit].coordinates, Some([2.0, 3.0]));

    let events = event_replies(&env);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        Reply::Event { lookup_key, data }
            if lookup_key == "arrived" && data["coordinates"] == json!([2.0, 3.0])
    ));
}

// ---------------------------------------------------------------------------
// Craft landing
// ---------------------------------------------------------------------------

fn craft_element(player_id: i32) -> Value {
    json!({
        "role": "craft", "player_id": player_id, "operating_code": 1,
        "item_type": "carrier", "unit_quantity": 2,
        "in_unit_description": {
            "role": "unit", "item_type": "marine", "hit_points": 10.0, "speed": 2.0,
        },
    })
}

#[test]
fn craft_lands_units_that_inherit_its_code() {
    let (handler, controller, _editor) = start_battle(json!({
        "players": [
            {"id": 0, "env_name": "python_3", "defeat_reasons": []},
        ],
        "codes": [{"id": 1, "code": "marine-brain"}],
        "map_size": [10, 10],
        "map_elements": [craft_element(0)],
    }));

    assert_eq!(handler.crafts().len(), 1);
    let units: Vec<&FightItem> = handler
        .fighters()
        .values()
        .filter(|it| it.role == Role::Unit)
        .collect();
    assert_eq!(units.len(), 2);

    let craft = handler.crafts().values().next().unwrap();
    assert_eq!(craft.coordinates[0], 10.0);
    for unit in &units {
        let coordinates = unit.coordinates.unwrap();
        assert!((coordinates[0] - craft.coordinates[0]).abs() <= 3.0);
        assert!((coordinates[1] - craft.coordinates[1]).abs() <= 2.0);
        assert_eq!(unit.operating_code, Some(1));
    }

    // One agent per landed unit, each started with the craft's program.
    let spawned = controller.spawned();
    assert_eq!(spawned.len(), 2);
    for (_, env) in &spawned {
        assert_eq!(env.ran_code().as_deref(), Some("marine-brain"));
    }
}

#[test]
fn craft_columns_stay_three_apart_and_overflow_is_abandoned() {
    let (handler, _controller, _editor) = start_battle(json!({
        "players": [
            {"id": 0, "env_name": "python_3", "defeat_reasons": []},
        ],
        "codes": [{"id": 1, "code": "marine-brain"}],
        "map_size": [10, 12],
        "map_elements": [craft_element(0), craft_element(0), craft_element(0)],
    }));

    let columns: Vec<f64> = handler
        .crafts()
        .values()
        .map(|c| c.coordinates[1])
        .collect();
    for (i, a) in columns.iter().enumerate() {
        assert!((1.0..12.0).contains(a));
        for b in &columns[i + 1..] {
            assert!((a - b).abs() >= 3.0, "columns {a} and {b} too close");
        }
    }

    // A width-3 map fits a single craft; the second finds no free column
    // and lands nothing.
    let (narrow, _c, _e) = start_battle(json!({
        "players": [
            {"id": 0, "env_name": "python_3", "defeat_reasons": []},
        ],
        "codes": [{"id": 1, "code": "marine-brain"}],
        "map_size": [10, 3],
        "map_elements": [craft_element(0), craft_element(0)],
    }));
    assert_eq!(narrow.crafts().len(), 1);
    let units = narrow
        .fighters()
        .values()
        .filter(|it| it.role == Role::Unit)
        .count();
    assert_eq!(units, 2);
}

// ---------------------------------------------------------------------------
// World map effects
// ---------------------------------------------------------------------------

#[test]
fn building_death_clears_its_footprint() {
    let (mut handler, controller, _editor) = start_battle(json!({
        "players": [
            {"id": 0, "env_name": "python_3", "defeat_reasons": []},
            {"id": 1, "env_name": "python_3", "defeat_reasons": []},
        ],
        "codes": [{"id": 1, "code": "brain"}],
        "map_size": [10, 10],
        "map_elements": [
            {"role": "building", "player_id": 1, "hit_points": 10.0,
             "tile_position": [4.0, 4.0], "size": 2.0},
            {"role": "unit", "player_id": 0, "operating_code": 1,
             "hit_points": 10.0, "speed": 2.0, "tile_position": [4.0, 7.0],
             "firing_range": 4.0, "damage_per_shot": 10.0, "rate_of_fire": 1.0},
        ],
    }));

    let building = find_item(&handler, 1, Role::Building);
    let hash_before = handler.map().hash();
    let occupied_before = handler
        .map()
        .grid()
        .iter()
        .flatten()
        .filter(|&&c| c == 0)
        .count();
    assert!(occupied_before > 0);

    let env = controller.environment(0).unwrap();
    env.push_message(Message::set_action("attack", json!({"id": building})));

    for _ in 0..5 {
        handler.tick();
        if handler.fighters()[&building].is_dead() {
            break;
        }
    }
    assert!(handler.fighters()[&building].is_dead());
    assert_ne!(handler.map().hash(), hash_before);
    let occupied_after = handler
        .map()
        .grid()
        .iter()
        .flatten()
        .filter(|&&c| c == 0)
        .count();
    assert_eq!(occupied_after, 0);
}

// ---------------------------------------------------------------------------
// Streaming output
// ---------------------------------------------------------------------------

#[test]
fn streaming_frames_advance_the_clock_uniformly() {
    let (mut handler, _controller, editor) = start_battle(json!({
        "players": [
            {"id": 0, "env_name": "python_3", "defeat_reasons": []},
            {"id": 1, "env_name": "python_3", "defeat_reasons": []},
        ],
        "map_size": [6, 6],
    }));

    for _ in 0..4 {
        handler.tick();
    }

    let frames: Vec<Value> = editor
        .payloads()
        .into_iter()
        .filter(|p| p["is_stream"] == json!(true))
        .collect();
    assert_eq!(frames.len(), 4);
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame["current_frame"], json!(i));
        let time = frame["current_game_time"].as_f64().unwrap();
        assert!((time - 0.1 * i as f64).abs() < 1e-9);
        assert_eq!(frame["map_size"], json!([6, 6]));
        assert_eq!(frame["map_grid"].as_array().unwrap().len(), 12);
    }
}

#[test]
fn non_streaming_battle_only_emits_the_final_log() {
    let (mut handler, _controller, editor) = start_battle(json!({
        "is_stream": false,
        "players": [
            {"id": 0, "env_name": "python_3", "defeat_reasons": ["center"]},
            {"id": 1, "env_name": "python_3", "defeat_reasons": ["center"]},
        ],
        "map_size": [6, 6],
        "map_elements": [
            {"role": "center", "player_id": 0, "hit_points": 50.0,
             "tile_position": [1.0, 1.0], "size": 2.0},
        ],
    }));

    assert_eq!(handler.tick(), Some(0));
    let payloads = editor.payloads();
    assert_eq!(payloads.len(), 1);
    // Both snapshots (start-of-frame and final) are in the log regardless.
    assert_eq!(payloads[0]["frames"].as_array().unwrap().len(), 2);
}

#[test]
fn dropping_the_handler_still_emits_the_log() {
    let (handler, _controller, editor) = start_battle(json!({
        "players": [
            {"id": 0, "env_name": "python_3", "defeat_reasons": []},
            {"id": 1, "env_name": "python_3", "defeat_reasons": []},
        ],
        "map_size": [6, 6],
    }));

    assert!(editor.payloads().is_empty());
    drop(handler);

    let payloads = editor.payloads();
    assert_eq!(payloads.len(), 1);
    assert!(payloads[0].get("initial").is_some());
    assert!(payloads[0].get("result").is_some());
}
