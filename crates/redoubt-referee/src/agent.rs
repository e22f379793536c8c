//! Per-item program agents.
//!
//! One [`ItemAgent`] exists for every executable item: a unit with
//! coordinates, or anything carrying an operating code. The agent owns the
//! item's [`Environment`] channel; the handler drains its mailbox at the
//! start of each frame and dispatches every message to one of the three
//! referee verbs. The select vocabulary is parsed here, into
//! [`SelectQuery`], so the handler only ever sees typed queries.

use redoubt_core::id::ItemId;
use redoubt_core::item::FightItem;
use redoubt_core::player::{Party, Role};
use redoubt_env::Environment;
use serde_json::Value;

/// Inline error for a select entry with no `field` key.
pub const ERR_FIELD_MISSING: &str = "wrong format, field did not passed";
/// Inline error for an unknown select field name.
pub const ERR_FIELD_UNKNOWN: &str = "wrong format, wrong field";
/// Inline error for select data that does not fit the field.
pub const ERR_FIELD_DATA: &str = "wrong format, wrong data";

// ---------------------------------------------------------------------------
// ItemAgent
// ---------------------------------------------------------------------------

/// The referee-side end of one program's channel.
pub struct ItemAgent {
    /// The item this program controls.
    pub item_id: ItemId,
    /// The channel to the program's sandbox.
    pub env: Box<dyn Environment>,
}

impl ItemAgent {
    pub fn new(item_id: ItemId, env: Box<dyn Environment>) -> Self {
        Self { item_id, env }
    }
}

/// Whether an item runs a program at all: units need coordinates, anything
/// else needs an operating code that resolved to actual code.
pub fn is_executable(item: &FightItem, has_code: bool) -> bool {
    if item.role == Role::Unit {
        item.coordinates.is_some()
    } else {
        has_code
    }
}

// ---------------------------------------------------------------------------
// SelectQuery
// ---------------------------------------------------------------------------

/// One parsed entry of a `select` request.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectQuery {
    /// Info of the requesting item itself.
    MyInfo,
    /// Info of a specific item.
    ItemInfo { id: ItemId },
    /// Party-filtered real player ids.
    Players { parties: Vec<Party> },
    /// Party- and role-filtered item infos.
    Items { parties: Vec<Party>, roles: Vec<Role> },
    /// Info of the closest living enemy of the given item.
    NearestEnemy { id: ItemId },
    /// Living enemies inside the given item's firing range.
    EnemyItemsInMyFiringRange { id: ItemId },
}

/// Parse one `{field, data}` entry. Failures become inline error records
/// in the select response, never a dropped request.
pub fn parse_select_field(field: &Value) -> Result<SelectQuery, &'static str> {
    let Some(name) = field.get("field").and_then(Value::as_str) else {
        return Err(ERR_FIELD_MISSING);
    };
    let data = field.get("data").cloned().unwrap_or(Value::Null);
    match name {
        "my_info" => Ok(SelectQuery::MyInfo),
        "item_info" => item_id_of(&data)
            .map(|id| SelectQuery::ItemInfo { id })
            .ok_or(ERR_FIELD_DATA),
        "players" => Ok(SelectQuery::Players {
            parties: parties_of(&data),
        }),
        "items" => Ok(SelectQuery::Items {
            parties: parties_of(&data),
            roles: roles_of(&data),
        }),
        "nearest_enemy" => item_id_of(&data)
            .map(|id| SelectQuery::NearestEnemy { id })
            .ok_or(ERR_FIELD_DATA),
        "enemy_items_in_my_firing_range" => item_id_of(&data)
            .map(|id| SelectQuery::EnemyItemsInMyFiringRange { id })
            .ok_or(ERR_FIELD_DATA),
        _ => Err(ERR_FIELD_UNKNOWN),
    }
}

fn item_id_of(data: &Value) -> Option<ItemId> {
    data.get("id")
        .and_then(Value::as_u64)
        .map(|raw| ItemId::from_raw(raw as u32))
}

fn parties_of(data: &Value) -> Vec<Party> {
    enum_list(data, "parties")
}

fn roles_of(data: &Value) -> Vec<Role> {
    enum_list(data, "roles")
}

/// Parse `data[key]` as a list of enum values, skipping entries that do
/// not deserialize.
fn enum_list<T: serde::de::DeserializeOwned>(data: &Value, key: &str) -> Vec<T> {
    data.get(key)
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use redoubt_core::id::next_item_id;
    use redoubt_core::item::ItemDescriptor;
    use serde_json::json;

    #[test]
    fn select_field_errors() {
        assert_eq!(
            parse_select_field(&json!({"data": {}})),
            Err(ERR_FIELD_MISSING)
        );
        assert_eq!(
            parse_select_field(&json!({"field": "horoscope"})),
            Err(ERR_FIELD_UNKNOWN)
        );
        assert_eq!(
            parse_select_field(&json!({"field": "item_info", "data": {}})),
            Err(ERR_FIELD_DATA)
        );
    }

    #[test]
    fn select_fields_parse() {
        assert_eq!(
            parse_select_field(&json!({"field": "my_info"})),
            Ok(SelectQuery::MyInfo)
        );
        assert_eq!(
            parse_select_field(&json!({"field": "item_info", "data": {"id": 7}})),
            Ok(SelectQuery::ItemInfo {
                id: ItemId::from_raw(7)
            })
        );
        assert_eq!(
            parse_select_field(&json!({"field": "players", "data": {"parties": ["enemy"]}})),
            Ok(SelectQuery::Players {
                parties: vec![Party::Enemy]
            })
        );
        assert_eq!(
            parse_select_field(&json!({
                "field": "items",
                "data": {"parties": ["enemy", "my"], "roles": ["unit", "tower"]},
            })),
            Ok(SelectQuery::Items {
                parties: vec![Party::Enemy, Party::My],
                roles: vec![Role::Unit, Role::Tower],
            })
        );
        assert_eq!(
            parse_select_field(&json!({"field": "nearest_enemy", "data": {"id": 3}})),
            Ok(SelectQuery::NearestEnemy {
                id: ItemId::from_raw(3)
            })
        );
    }

    #[test]
    fn missing_filters_default_to_empty() {
        assert_eq!(
            parse_select_field(&json!({"field": "items"})),
            Ok(SelectQuery::Items {
                parties: vec![],
                roles: vec![],
            })
        );
    }

    #[test]
    fn executable_check() {
        let unit: ItemDescriptor = serde_json::from_value(json!({
            "role": "unit", "hit_points": 10.0, "coordinates": [1.0, 1.0],
        }))
        .unwrap();
        let item = FightItem::new(next_item_id(), &unit);
        assert!(is_executable(&item, false));

        let grounded: ItemDescriptor =
            serde_json::from_value(json!({"role": "unit", "hit_points": 10.0})).unwrap();
        let item = FightItem::new(next_item_id(), &grounded);
        assert!(!is_executable(&item, true));

        let tower: ItemDescriptor = serde_json::from_value(json!({
            "role": "tower", "hit_points": 10.0, "operating_code": 1,
        }))
        .unwrap();
        let item = FightItem::new(next_item_id(), &tower);
        assert!(is_executable(&item, true));
        assert!(!is_executable(&item, false));
    }
}
