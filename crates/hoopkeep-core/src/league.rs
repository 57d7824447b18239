// League/team extractor for the `users;use_login=1/games/leagues;out=teams`
// payload, plus the presentation sort applied by consumers.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::meta;
use crate::raw::{self, iterate, lookup, text, text_at, Shape};
use crate::teams;

/// Placeholder when a league has teams but no name could be resolved.
pub const UNKNOWN_TEAM: &str = "(team?)";
/// Placeholder when a league carries no team blocks at all.
pub const MISSING_TEAM: &str = "(team missing)";

/// One head-to-head league the user belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueSummary {
    pub season: String,
    pub league_key: String,
    /// The user's team in this league, or one of the placeholders.
    pub team_name: String,
}

/// Extract one summary per head-to-head league in the payload.
///
/// Order follows the payload; see [`sort_for_display`] for presentation.
pub fn extract_leagues(payload: &Value) -> Vec<LeagueSummary> {
    let content = raw::content(payload);
    let Some(users) = lookup(content, "users") else {
        return Vec::new();
    };

    let mut leagues = Vec::new();
    for user in iterate(users, "user") {
        let guid = text_at(user, "guid").unwrap_or_default();
        let Some(games) = lookup(user, "games") else {
            continue;
        };
        for game in iterate(games, "game") {
            let season = text_at(game, "season");
            let Some(game_leagues) = lookup(game, "leagues") else {
                continue;
            };
            for league in iterate(game_leagues, "league") {
                if !meta::is_head_to_head(league) {
                    continue;
                }
                leagues.push(summarize(league, season.as_deref(), &guid));
            }
        }
    }
    leagues
}

fn summarize(league: &Value, game_season: Option<&str>, guid: &str) -> LeagueSummary {
    let season = game_season
        .map(str::to_string)
        .or_else(|| text_at(league, "season"))
        .unwrap_or_default();
    let league_key = text_at(league, "league_key").unwrap_or_default();

    let team_blocks: Vec<&Value> = lookup(league, "teams")
        .map(|teams| iterate(teams, "team").collect())
        .unwrap_or_default();
    let team_name = if team_blocks.is_empty() {
        MISSING_TEAM.to_string()
    } else {
        owned_team_name(&team_blocks, guid).unwrap_or_else(|| UNKNOWN_TEAM.to_string())
    };

    LeagueSummary {
        season,
        league_key,
        team_name,
    }
}

/// Scan team blocks for the one managed by `guid` (or flagged as the current
/// login). Returns that team's name, else the first team name seen.
fn owned_team_name(team_blocks: &[&Value], guid: &str) -> Option<String> {
    let mut fallback: Option<String> = None;

    for team in team_blocks {
        let items = unwrap_singleton(team);
        let mut name: Option<String> = None;
        let mut owned = false;

        for entry in items {
            let Some(block) = Shape::of(entry).as_map() else {
                continue;
            };
            if let Some(n) = block.get("name").and_then(text) {
                fallback.get_or_insert_with(|| n.clone());
                name.get_or_insert(n);
            }
            if let Some(managers) = block.get("managers") {
                owned |= is_owner(managers, guid);
            }
        }

        if owned {
            if let Some(name) = name.or_else(|| fallback.clone()) {
                return Some(name);
            }
        }
    }
    fallback
}

/// A team block that is a one-element sequence holding the real attribute
/// sequence is unwrapped exactly one level; anything else is used as is.
fn unwrap_singleton(team: &Value) -> &[Value] {
    match Shape::of(team) {
        Shape::List(items) => match items {
            [inner] => Shape::of(inner).as_list().unwrap_or(items),
            _ => items,
        },
        _ => std::slice::from_ref(team),
    }
}

/// `true` when any manager in the block matches `guid` or is flagged as the
/// current login.
pub fn is_owner(managers: &Value, guid: &str) -> bool {
    iterate(managers, "manager").any(|manager| {
        let guid_match = !guid.is_empty() && teams::manager_guid(manager).as_deref() == Some(guid);
        guid_match || teams::is_current_login(manager)
    })
}

// ---------------------------------------------------------------------------
// Presentation helpers
// ---------------------------------------------------------------------------

/// Sort for display: season descending (numeric; unparseable seasons last),
/// then team name ascending.
pub fn sort_for_display(leagues: &mut [LeagueSummary]) {
    leagues.sort_by(|a, b| {
        compare_seasons(&a.season, &b.season).then_with(|| a.team_name.cmp(&b.team_name))
    });
}

fn compare_seasons(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i32>(), b.trim().parse::<i32>()) {
        (Ok(a), Ok(b)) => b.cmp(&a),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => Ordering::Equal,
    }
}

/// Distinct non-empty seasons, newest first.
pub fn seasons(leagues: &[LeagueSummary]) -> Vec<String> {
    let mut seasons: Vec<String> = Vec::new();
    for league in leagues {
        if !league.season.is_empty() && !seasons.contains(&league.season) {
            seasons.push(league.season.clone());
        }
    }
    seasons.sort_by(|a, b| compare_seasons(a, b));
    seasons
}
