// Team metadata parser for `league/{key}/teams` payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::raw::{self, attr, attr_text, attribute_list_for, entries, is_truthy, iterate, lookup, text, text_at};

/// Separator between league key and team id in a team key.
pub const TEAM_SEPARATOR: &str = ".t.";

/// One team of a league, flattened out of Yahoo's attribute blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    /// `{game}.l.{league_id}.t.{team_id}`, unique per league.
    pub team_key: String,
    pub team_name: String,
    /// Suffix of `team_key` after the last `.t.`.
    pub team_id: String,
    pub manager_name: String,
    pub manager_guid: String,
    /// Upstream says a manager of this team is the authenticated user. Not
    /// reliable on its own; see `reconcile`.
    pub is_current_login: bool,
}

/// Manager fields picked out of a team's `managers` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerIdentity {
    pub name: String,
    pub guid: String,
    pub any_current_login: bool,
}

/// Parse every team of a league-scoped payload, sorted case-insensitively by
/// team name. Entries without a `team_key` are dropped; a missing or null
/// `teams` section yields an empty list.
pub fn parse_teams(payload: &Value) -> Vec<TeamRecord> {
    let Some(section) = raw::league_section(payload, "teams") else {
        return Vec::new();
    };

    let mut teams: Vec<TeamRecord> = entries(section, "team").filter_map(parse_team).collect();
    sort_by_name(&mut teams);
    teams
}

/// Parse a single `team` value (any wrapping depth).
pub fn parse_team(team: &Value) -> Option<TeamRecord> {
    let attrs = attribute_list_for(team, "team_key")?;

    let Some(team_key) = attr_text(attrs, "team_key") else {
        debug!("dropping team entry without team_key");
        return None;
    };
    let team_id = team_id_from_key(&team_key)
        .map(str::to_string)
        .or_else(|| attr_text(attrs, "team_id"))
        .unwrap_or_default();
    let manager = attr(attrs, "managers")
        .map(parse_managers)
        .unwrap_or_default();

    Some(TeamRecord {
        team_name: attr_text(attrs, "name").unwrap_or_default(),
        team_id,
        manager_name: manager.name,
        manager_guid: manager.guid,
        is_current_login: manager.any_current_login,
        team_key,
    })
}

/// Pick the representative manager from a `managers` block: the one flagged
/// as the current login, else the first listed. The display name prefers
/// `nickname`, then `guid`, then `manager_id`.
pub fn parse_managers(managers: &Value) -> ManagerIdentity {
    let all: Vec<&Value> = iterate(managers, "manager").collect();
    let flagged = all.iter().copied().find(|m| is_current_login(m));
    let chosen = flagged.or_else(|| all.first().copied());

    let Some(manager) = chosen else {
        return ManagerIdentity::default();
    };

    let guid = text_at(manager, "guid").unwrap_or_default();
    let name = text_at(manager, "nickname")
        .or_else(|| (!guid.is_empty()).then(|| guid.clone()))
        .or_else(|| text_at(manager, "manager_id"))
        .unwrap_or_default();

    ManagerIdentity {
        name,
        guid,
        any_current_login: flagged.is_some(),
    }
}

/// `true` when a manager block carries a truthy `is_current_login` marker.
pub fn is_current_login(manager: &Value) -> bool {
    lookup(manager, "is_current_login").is_some_and(is_truthy)
}

/// Team id portion of a team key: the suffix after the last `.t.`.
pub fn team_id_from_key(team_key: &str) -> Option<&str> {
    team_key
        .rsplit_once(TEAM_SEPARATOR)
        .map(|(_, id)| id)
        .filter(|id| !id.is_empty())
}

/// Stable, case-insensitive sort by team name.
pub fn sort_by_name(teams: &mut [TeamRecord]) {
    teams.sort_by_cached_key(|t| t.team_name.to_lowercase());
}

/// Manager GUID of a raw manager block, if present.
pub fn manager_guid(manager: &Value) -> Option<String> {
    lookup(manager, "guid").and_then(text)
}
