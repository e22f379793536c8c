//! One-shot event subscriptions and their dispatch predicates.
//!
//! Programs subscribe to named events with an opaque lookup key; when the
//! simulation performs something that might have fired an event, the
//! matching dispatch routine scans that event's subscription list in
//! insertion order and evaluates its predicate against the event item and
//! each subscription's receiver. A firing subscription is removed from the
//! registry -- every subscription delivers at most once.
//!
//! Dispatch never touches the channels itself: it returns the
//! [`Delivery`] list and the handler writes them out, so predicate
//! evaluation runs against an immutable view of the item table.

use redoubt_core::id::ItemId;
use redoubt_core::item::{FightItem, Fighters};
use redoubt_core::map::euclidean_distance;
use serde_json::{json, Value};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// The recognized event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A specific item died.
    Death,
    /// The subscriber itself entered a circular area.
    ImInArea,
    /// Any item entered a circular area.
    AnyItemInArea,
    /// The subscriber's move action completed.
    ImStop,
    /// The subscriber went idle.
    ImIdle,
    /// An enemy came within the subscriber's firing range.
    EnemyInMyFiringRange,
    /// A watched item left the subscriber's firing range.
    TheItemOutMyFiringRange,
}

impl EventKind {
    /// Parse a wire event name; unknown names are not subscribable.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "death" => Some(EventKind::Death),
            "im_in_area" => Some(EventKind::ImInArea),
            "any_item_in_area" => Some(EventKind::AnyItemInArea),
            "im_stop" => Some(EventKind::ImStop),
            "im_idle" => Some(EventKind::ImIdle),
            "enemy_in_my_firing_range" => Some(EventKind::EnemyInMyFiringRange),
            "the_item_out_my_firing_range" => Some(EventKind::TheItemOutMyFiringRange),
            _ => None,
        }
    }

    /// Wire name of the event.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Death => "death",
            EventKind::ImInArea => "im_in_area",
            EventKind::AnyItemInArea => "any_item_in_area",
            EventKind::ImStop => "im_stop",
            EventKind::ImIdle => "im_idle",
            EventKind::EnemyInMyFiringRange => "enemy_in_my_firing_range",
            EventKind::TheItemOutMyFiringRange => "the_item_out_my_firing_range",
        }
    }
}

// ---------------------------------------------------------------------------
// Subscription / Delivery
// ---------------------------------------------------------------------------

/// One registered subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    /// The item whose channel receives the event.
    pub receiver: ItemId,
    /// Opaque key echoed back on delivery so the program can correlate.
    pub lookup_key: String,
    /// Event-specific parameters (target id, area, watched item, ...).
    pub data: Value,
}

/// A fired subscription, ready to be written to the receiver's channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub receiver: ItemId,
    pub lookup_key: String,
    pub data: Value,
}

// ---------------------------------------------------------------------------
// EventRegistry
// ---------------------------------------------------------------------------

/// Per-event ordered subscription lists.
#[derive(Debug, Default)]
pub struct EventRegistry {
    subs: HashMap<EventKind, Vec<Subscription>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription. Returns `false` for an exact duplicate
    /// (same receiver, lookup key, and data), `true` otherwise.
    pub fn subscribe(
        &mut self,
        kind: EventKind,
        receiver: ItemId,
        lookup_key: &str,
        data: Value,
    ) -> bool {
        let sub = Subscription {
            receiver,
            lookup_key: lookup_key.to_owned(),
            data,
        };
        let list = self.subs.entry(kind).or_default();
        if list.contains(&sub) {
            return false;
        }
        list.push(sub);
        true
    }

    /// Drop every subscription whose receiver is `receiver`.
    pub fn unsubscribe_all(&mut self, receiver: ItemId) {
        for list in self.subs.values_mut() {
            list.retain(|sub| sub.receiver != receiver);
        }
    }

    /// The live subscriptions of one event, in insertion order.
    pub fn subscriptions(&self, kind: EventKind) -> &[Subscription] {
        self.subs.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Total live subscriptions across all events.
    pub fn len(&self) -> usize {
        self.subs.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -- dispatch routines --------------------------------------------------

    /// An item died: fire `death` for subscriptions watching its id.
    pub fn fire_death(&mut self, fighters: &Fighters, event_item: ItemId) -> Vec<Delivery> {
        self.dispatch(
            EventKind::Death,
            fighters,
            event_item,
            |sub, event, _receiver| {
                item_id_in(&sub.data, "id").map_or(false, |id| id == event.id)
            },
            id_payload,
        )
    }

    /// An item went idle: fire `im_idle` for the item's own subscriptions.
    pub fn fire_im_idle(&mut self, fighters: &Fighters, event_item: ItemId) -> Vec<Delivery> {
        self.dispatch(
            EventKind::ImIdle,
            fighters,
            event_item,
            |_sub, event, receiver| receiver.id == event.id,
            id_payload,
        )
    }

    /// A move completed: fire `im_stop` for the item's own subscriptions.
    pub fn fire_im_stop(&mut self, fighters: &Fighters, event_item: ItemId) -> Vec<Delivery> {
        self.dispatch(
            EventKind::ImStop,
            fighters,
            event_item,
            |_sub, event, receiver| receiver.id == event.id,
            |_sub, event, _receiver| json!({"id": event.id, "coordinates": event.coordinates}),
        )
    }

    /// An item's coordinates changed: scan the four range events.
    pub fn fire_range_events(&mut self, fighters: &Fighters, event_item: ItemId) -> Vec<Delivery> {
        let mut deliveries = self.fire_enemy_in_my_firing_range(fighters, event_item);
        deliveries.extend(self.fire_the_item_out_my_firing_range(fighters, event_item));
        deliveries.extend(self.fire_im_in_area(fighters, event_item));
        deliveries.extend(self.fire_any_item_in_area(fighters, event_item));
        deliveries
    }

    fn fire_enemy_in_my_firing_range(
        &mut self,
        fighters: &Fighters,
        event_item: ItemId,
    ) -> Vec<Delivery> {
        self.dispatch(
            EventKind::EnemyInMyFiringRange,
            fighters,
            event_item,
            |_sub, event, receiver| {
                if receiver.id == event.id
                    || event.is_obstacle()
                    || event.player_id == receiver.player_id
                {
                    return false;
                }
                match (receiver.coordinates, event.coordinates) {
                    (Some(mine), Some(theirs)) => {
                        euclidean_distance(mine, theirs) - event.size / 2.0
                            <= receiver.firing_range.unwrap_or(0.0)
                    }
                    _ => false,
                }
            },
            id_payload,
        )
    }

    fn fire_the_item_out_my_firing_range(
        &mut self,
        fighters: &Fighters,
        event_item: ItemId,
    ) -> Vec<Delivery> {
        self.dispatch(
            EventKind::TheItemOutMyFiringRange,
            fighters,
            event_item,
            |sub, event, receiver| {
                if item_id_in(&sub.data, "item_id") != Some(event.id) {
                    return false;
                }
                match (receiver.coordinates, event.coordinates) {
                    (Some(mine), Some(theirs)) => {
                        euclidean_distance(mine, theirs) - event.size / 2.0
                            > receiver.firing_range.unwrap_or(0.0)
                    }
                    _ => false,
                }
            },
            id_payload,
        )
    }

    fn fire_im_in_area(&mut self, fighters: &Fighters, event_item: ItemId) -> Vec<Delivery> {
        self.dispatch(
            EventKind::ImInArea,
            fighters,
            event_item,
            |sub, event, receiver| {
                if receiver.id != event.id {
                    return false;
                }
                match (receiver.coordinates, area_of(&sub.data)) {
                    (Some(position), Some((center, radius))) => {
                        euclidean_distance(position, center) < radius
                    }
                    _ => false,
                }
            },
            |sub, event, receiver| {
                let distance = match (receiver.coordinates, area_of(&sub.data)) {
                    (Some(position), Some((center, _))) => euclidean_distance(position, center),
                    _ => 0.0,
                };
                json!({"id": event.id, "distance": distance})
            },
        )
    }

    fn fire_any_item_in_area(&mut self, fighters: &Fighters, event_item: ItemId) -> Vec<Delivery> {
        self.dispatch(
            EventKind::AnyItemInArea,
            fighters,
            event_item,
            |sub, event, _receiver| match (event.coordinates, area_of(&sub.data)) {
                (Some(position), Some((center, radius))) => {
                    euclidean_distance(center, position) <= radius
                }
                _ => false,
            },
            id_payload,
        )
    }

    /// Walk one event's subscription list in insertion order. Firing
    /// subscriptions are removed (one-shot); dead receivers keep theirs,
    /// inert, in place.
    fn dispatch<P, D>(
        &mut self,
        kind: EventKind,
        fighters: &Fighters,
        event_item: ItemId,
        predicate: P,
        payload: D,
    ) -> Vec<Delivery>
    where
        P: Fn(&Subscription, &FightItem, &FightItem) -> bool,
        D: Fn(&Subscription, &FightItem, &FightItem) -> Value,
    {
        let Some(event) = fighters.get(&event_item) else {
            return Vec::new();
        };
        let Some(list) = self.subs.get_mut(&kind) else {
            return Vec::new();
        };

        let mut deliveries = Vec::new();
        let mut kept = Vec::with_capacity(list.len());
        for sub in list.drain(..) {
            let fired = fighters
                .get(&sub.receiver)
                .map_or(false, |receiver| {
                    !receiver.is_dead() && predicate(&sub, event, receiver)
                });
            if fired {
                let receiver = &fighters[&sub.receiver];
                let data = payload(&sub, event, receiver);
                deliveries.push(Delivery {
                    receiver: sub.receiver,
                    lookup_key: sub.lookup_key,
                    data,
                });
            } else {
                kept.push(sub);
            }
        }
        *list = kept;
        deliveries
    }
}

// ---------------------------------------------------------------------------
// Payload helpers
// ---------------------------------------------------------------------------

fn id_payload(_sub: &Subscription, event: &FightItem, _receiver: &FightItem) -> Value {
    json!({"id": event.id})
}

fn item_id_in(data: &Value, key: &str) -> Option<ItemId> {
    data.get(key)
        .and_then(Value::as_u64)
        .map(|raw| ItemId::from_raw(raw as u32))
}

/// `(center, radius)` of an area subscription's parameters.
fn area_of(data: &Value) -> Option<([f64; 2], f64)> {
    let list = data.get("coordinates")?.as_array()?;
    if list.len() != 2 {
        return None;
    }
    let center = [list[0].as_f64()?, list[1].as_f64()?];
    let radius = data.get("radius")?.as_f64()?;
    Some((center, radius))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
