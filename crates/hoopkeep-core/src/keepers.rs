// Keeper roster parser for `league/{key}/players;status=K/ownership` payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::raw::{self, attr, attr_text, attribute_list_for, entries, sibling_blocks, text_at};

/// Separator between game id and player id in a player key.
pub const PLAYER_SEPARATOR: &str = ".p.";

/// One keeper-status player and the team that owns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeeperPlayerRecord {
    pub player_key: String,
    pub player_id: String,
    pub name_full: String,
    pub display_position: String,
    /// `None` when upstream omitted ownership; such players are orphans.
    pub owner_team_key: Option<String>,
    pub is_keeper: bool,
}

/// Parse every keeper player of a league-scoped payload in payload order.
pub fn parse_keepers(payload: &Value) -> Vec<KeeperPlayerRecord> {
    let Some(section) = raw::league_section(payload, "players") else {
        return Vec::new();
    };
    entries(section, "player").map(parse_player).collect()
}

/// Parse a single `player` value.
///
/// The ownership block may sit inside the attribute list or next to it in the
/// wrapping sequence; both places are searched.
pub fn parse_player(player: &Value) -> KeeperPlayerRecord {
    let attrs = attribute_list_for(player, "player_key").unwrap_or_default();

    let ownership = attr(attrs, "ownership").or_else(|| {
        sibling_blocks(player).find_map(|block| block.get("ownership"))
    });
    let owner_team_key = ownership.and_then(|o| text_at(o, "owner_team_key"));

    let player_key = attr_text(attrs, "player_key").unwrap_or_default();
    let player_id = attr_text(attrs, "player_id")
        .or_else(|| {
            player_key
                .rsplit_once(PLAYER_SEPARATOR)
                .map(|(_, id)| id.to_string())
                .filter(|id| !id.is_empty())
        })
        .unwrap_or_default();

    KeeperPlayerRecord {
        player_id,
        name_full: full_name(attr(attrs, "name")),
        display_position: attr_text(attrs, "display_position").unwrap_or_default(),
        owner_team_key,
        is_keeper: true,
        player_key,
    }
}

/// Render a player's name block: `full` when present, else the first and
/// last parts joined by a single space, else empty.
pub fn full_name(name: Option<&Value>) -> String {
    let Some(name) = name else {
        return String::new();
    };
    if let Some(full) = raw::text(name) {
        return full;
    }
    if let Some(full) = text_at(name, "full") {
        return full;
    }
    let parts: Vec<String> = ["first", "last"]
        .iter()
        .filter_map(|part| text_at(name, part))
        .collect();
    parts.join(" ")
}
