// Cross-season keeper reconciliation.
//
// Identifies the user's team(s) in the current league, follows the renewal
// link to last season's league, re-identifies the same user there, and groups
// keeper rosters for both seasons.

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::context::SessionContext;
use crate::keepers::{self, KeeperPlayerRecord};
use crate::meta::LeagueMeta;
use crate::teams::{self, TeamRecord};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Parsed payloads for one season's league.
#[derive(Debug, Clone, Default)]
pub struct SeasonInput {
    pub meta: LeagueMeta,
    pub teams: Vec<TeamRecord>,
    pub keepers: Vec<KeeperPlayerRecord>,
}

impl SeasonInput {
    /// Parse the `league/{key}/teams` and keeper payloads of one league.
    ///
    /// League metadata comes from the teams payload, or from the keeper
    /// payload when the teams payload carries none.
    pub fn from_payloads(teams_payload: &Value, keepers_payload: &Value) -> Self {
        let mut meta = LeagueMeta::from_payload(teams_payload);
        if meta.league_key.is_empty() {
            meta = LeagueMeta::from_payload(keepers_payload);
        }
        SeasonInput {
            meta,
            teams: teams::parse_teams(teams_payload),
            keepers: keepers::parse_keepers(keepers_payload),
        }
    }
}

/// Key of the league to fetch as "last season", if the current league links
/// to one other than itself.
pub fn previous_league_key(current: &LeagueMeta) -> Option<&str> {
    current
        .previous_league_key
        .as_deref()
        .filter(|key| !key.is_empty() && *key != current.league_key)
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Teams and grouped keeper rosters of one season.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonKeepers {
    pub league_key: String,
    pub season: String,
    pub teams: Vec<TeamRecord>,
    /// Keepers by owning team key, each list in payload order.
    pub keepers_by_team: BTreeMap<String, Vec<KeeperPlayerRecord>>,
    /// Keepers with no owning team.
    pub orphans: Vec<KeeperPlayerRecord>,
}

impl SeasonKeepers {
    /// Total keepers assigned to a team (orphans excluded).
    pub fn keeper_count(&self) -> usize {
        self.keepers_by_team.values().map(Vec::len).sum()
    }

    pub fn team_for(&self, team_key: &str) -> Option<&TeamRecord> {
        self.teams.iter().find(|t| t.team_key == team_key)
    }

    /// Teams flagged as the user's.
    pub fn user_teams(&self) -> impl Iterator<Item = &TeamRecord> {
        self.teams.iter().filter(|t| t.is_current_login)
    }

    /// One line per keeper group, in team key order. Groups whose owner is
    /// missing from the team list are kept with no name.
    pub fn rosters(&self) -> Vec<RosterSummary> {
        self.keepers_by_team
            .iter()
            .map(|(team_key, keepers)| {
                let team = self.team_for(team_key);
                RosterSummary {
                    team_key: team_key.clone(),
                    team_name: team.map(|t| t.team_name.clone()),
                    is_current_login: team.is_some_and(|t| t.is_current_login),
                    keepers: keepers.iter().map(|k| k.name_full.clone()).collect(),
                }
            })
            .collect()
    }
}

/// Compact per-team keeper listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSummary {
    pub team_key: String,
    /// `None` when the owning team is not in the season's team list.
    pub team_name: Option<String>,
    pub is_current_login: bool,
    pub keepers: Vec<String>,
}

/// Summary fields for the keeper view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeeperMetadata {
    pub league_key: String,
    pub league_name: String,
    pub season: String,
    pub scoring_type: String,
    pub previous_league_key: Option<String>,
    pub previous_season: Option<String>,
    pub available_seasons: Vec<String>,
    pub user_team_keys: Vec<String>,
    pub user_team_ids: Vec<String>,
    pub user_team_names: Vec<String>,
    pub user_manager_guids: Vec<String>,
    pub current_keeper_count: usize,
    pub previous_keeper_count: usize,
    /// Current season has no keepers yet but last season does.
    pub fallback_to_previous: bool,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub current: SeasonKeepers,
    pub previous: Option<SeasonKeepers>,
    pub metadata: KeeperMetadata,
}

// ---------------------------------------------------------------------------
// Identity signals
// ---------------------------------------------------------------------------

/// Everything known about which teams belong to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserIdentity {
    pub team_keys: Vec<String>,
    pub team_ids: Vec<String>,
    pub team_names: Vec<String>,
    pub manager_guids: Vec<String>,
}

impl UserIdentity {
    fn absorb(&mut self, team: &TeamRecord) {
        push_non_empty(&mut self.team_keys, &team.team_key);
        push_non_empty(&mut self.team_ids, &team.team_id);
        push_non_empty(&mut self.team_names, &team.team_name);
        push_non_empty(&mut self.manager_guids, &team.manager_guid);
    }

    fn dedupe(&mut self) {
        self.team_keys = dedupe(&self.team_keys);
        self.team_ids = dedupe(&self.team_ids);
        self.team_names = dedupe(&self.team_names);
        self.manager_guids = dedupe(&self.manager_guids);
    }
}

fn push_non_empty(list: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        list.push(value.to_string());
    }
}

/// Drop repeated items, keeping the first occurrence of each.
pub fn dedupe<T: Eq + Hash + Clone>(items: &[T]) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .iter()
        .filter(|item| seen.insert(*item))
        .cloned()
        .collect()
}

/// Mark and collect the user's teams in the current season.
///
/// Teams flagged by upstream count, and so does any team whose name matches
/// the remembered team name case-insensitively; matched teams are flagged in
/// place.
pub fn identify_current(teams: &mut [TeamRecord], ctx: &SessionContext) -> UserIdentity {
    let remembered = ctx.team_name_key();
    let mut identity = UserIdentity::default();

    for team in teams.iter_mut() {
        let name_match = remembered
            .as_deref()
            .is_some_and(|name| team.team_name.trim().to_lowercase() == name);
        if name_match && !team.is_current_login {
            debug!(team_key = %team.team_key, "promoting team by remembered name");
            team.is_current_login = true;
        }
        if team.is_current_login {
            identity.absorb(team);
        }
    }

    identity.dedupe();
    identity
}

/// Which identity signal found the user's team last season.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSignal {
    TeamId,
    ManagerGuid,
    TeamName,
}

/// Re-identify the user's teams in last season's league.
///
/// Signals are tried in order (team id, manager GUID, team name); the first
/// one that matches any team decides. The previous league's own login flag is
/// overwritten with the outcome.
pub fn identify_previous(teams: &mut [TeamRecord], identity: &UserIdentity) -> Option<MatchSignal> {
    let ids: HashSet<&str> = identity.team_ids.iter().map(String::as_str).collect();
    let guids: HashSet<String> = identity.manager_guids.iter().map(|g| g.to_lowercase()).collect();
    let names: HashSet<String> = identity.team_names.iter().map(|n| n.to_lowercase()).collect();

    let chain: [(MatchSignal, Box<dyn Fn(&TeamRecord) -> bool + '_>); 3] = [
        (
            MatchSignal::TeamId,
            Box::new(|t: &TeamRecord| !t.team_id.is_empty() && ids.contains(t.team_id.as_str())),
        ),
        (
            MatchSignal::ManagerGuid,
            Box::new(|t: &TeamRecord| {
                !t.manager_guid.is_empty() && guids.contains(&t.manager_guid.to_lowercase())
            }),
        ),
        (
            MatchSignal::TeamName,
            Box::new(|t: &TeamRecord| {
                let name = t.team_name.trim().to_lowercase();
                !name.is_empty() && names.contains(&name)
            }),
        ),
    ];

    let found = chain
        .iter()
        .find(|(_, matches)| teams.iter().any(|t| matches(t)));

    match found {
        Some((signal, matches)) => {
            for team in teams.iter_mut() {
                team.is_current_login = matches(&*team);
            }
            Some(*signal)
        }
        None => {
            for team in teams.iter_mut() {
                team.is_current_login = false;
            }
            None
        }
    }
}

/// Split keepers into per-team rosters and orphans, preserving order.
pub fn group_keepers(
    keepers: Vec<KeeperPlayerRecord>,
) -> (BTreeMap<String, Vec<KeeperPlayerRecord>>, Vec<KeeperPlayerRecord>) {
    let mut by_team: BTreeMap<String, Vec<KeeperPlayerRecord>> = BTreeMap::new();
    let mut orphans = Vec::new();

    for keeper in keepers {
        match keeper.owner_team_key.clone() {
            Some(owner) => by_team.entry(owner).or_default().push(keeper),
            None => orphans.push(keeper),
        }
    }
    (by_team, orphans)
}

/// `true` iff the current season has no keepers but the previous one does.
pub fn should_fall_back(current_count: usize, previous_count: usize) -> bool {
    current_count == 0 && previous_count > 0
}

fn season_keepers(input: SeasonInput) -> SeasonKeepers {
    let (keepers_by_team, orphans) = group_keepers(input.keepers);
    SeasonKeepers {
        league_key: input.meta.league_key,
        season: input.meta.season,
        teams: input.teams,
        keepers_by_team,
        orphans,
    }
}

// ---------------------------------------------------------------------------
// Reconcile
// ---------------------------------------------------------------------------

/// Reconcile the current season with last season, if last season's payloads
/// were obtained. `previous` is ignored when it points back at the current
/// league.
pub fn reconcile(
    ctx: &SessionContext,
    mut current: SeasonInput,
    previous: Option<SeasonInput>,
    generated_at: DateTime<Utc>,
) -> ReconciliationResult {
    if current.meta.league_key.is_empty() {
        current.meta.league_key = ctx.league_key.clone();
    }

    let mut identity = identify_current(&mut current.teams, ctx);
    let current_meta = current.meta.clone();
    let current = season_keepers(current);

    let previous = previous
        .filter(|p| p.meta.league_key.is_empty() || p.meta.league_key != current.league_key)
        .map(|mut prev| {
            if prev.meta.league_key.is_empty() {
                if let Some(key) = previous_league_key(&current_meta) {
                    prev.meta.league_key = key.to_string();
                }
            }
            let signal = identify_previous(&mut prev.teams, &identity);
            debug!(?signal, league_key = %prev.meta.league_key, "previous season identity");
            for team in prev.teams.iter().filter(|t| t.is_current_login) {
                identity.absorb(team);
            }
            season_keepers(prev)
        });
    identity.dedupe();

    let current_keeper_count = current.keeper_count();
    let previous_keeper_count = previous.as_ref().map_or(0, SeasonKeepers::keeper_count);
    let previous_season = previous
        .as_ref()
        .map(|p| p.season.clone())
        .filter(|s| !s.is_empty());

    let mut seasons = vec![current.season.clone()];
    seasons.extend(previous_season.clone());
    seasons.retain(|s| !s.is_empty());

    debug!(
        current_keeper_count,
        previous_keeper_count,
        orphans = current.orphans.len(),
        "keepers reconciled"
    );

    let metadata = KeeperMetadata {
        league_key: current.league_key.clone(),
        league_name: current_meta.name.clone(),
        season: current.season.clone(),
        scoring_type: current_meta.scoring_type.clone(),
        previous_league_key: previous_league_key(&current_meta).map(str::to_string),
        previous_season,
        available_seasons: dedupe(&seasons),
        user_team_keys: identity.team_keys,
        user_team_ids: identity.team_ids,
        user_team_names: identity.team_names,
        user_manager_guids: identity.manager_guids,
        current_keeper_count,
        previous_keeper_count,
        fallback_to_previous: should_fall_back(current_keeper_count, previous_keeper_count),
        generated_at,
    };

    ReconciliationResult {
        current,
        previous,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(key: &str, name: &str, guid: &str, login: bool) -> TeamRecord {
        TeamRecord {
            team_key: key.into(),
            team_name: name.into(),
            team_id: teams::team_id_from_key(key).unwrap_or_default().into(),
            manager_name: name.to_lowercase(),
            manager_guid: guid.into(),
            is_current_login: login,
        }
    }

    fn keeper(id: &str, owner: Option<&str>) -> KeeperPlayerRecord {
        KeeperPlayerRecord {
            player_key: format!("466.p.{id}"),
            player_id: id.into(),
            name_full: format!("Player {id}"),
            display_position: "G".into(),
            owner_team_key: owner.map(str::to_string),
            is_keeper: true,
        }
    }

    fn meta(key: &str, season: &str, renew: Option<&str>) -> LeagueMeta {
        LeagueMeta {
            league_key: key.into(),
            name: "Hardwood Keepers".into(),
            season: season.into(),
            scoring_type: "head".into(),
            previous_league_key: renew.map(str::to_string),
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-10-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn dedupe_keeps_first_seen_order_and_is_idempotent() {
        let raw = vec!["b", "a", "b", "c", "a"];
        let once = dedupe(&raw);
        assert_eq!(once, vec!["b", "a", "c"]);
        assert_eq!(dedupe(&once), once);
        assert!(dedupe::<String>(&[]).is_empty());
    }

    #[test]
    fn grouping_preserves_every_keeper() {
        let keepers = vec![
            keeper("1", Some("466.l.1.t.1")),
            keeper("2", None),
            keeper("3", Some("466.l.1.t.2")),
            keeper("4", Some("466.l.1.t.1")),
            keeper("5", None),
        ];
        let total = keepers.len();
        let (by_team, orphans) = group_keepers(keepers);
        let grouped: usize = by_team.values().map(Vec::len).sum();
        assert_eq!(grouped + orphans.len(), total);
        assert_eq!(orphans.len(), 2);

        let first_team: Vec<&str> = by_team["466.l.1.t.1"].iter().map(|k| k.player_id.as_str()).collect();
        assert_eq!(first_team, vec!["1", "4"]);
    }

    #[test]
    fn fallback_truth_table() {
        assert!(should_fall_back(0, 3));
        assert!(!should_fall_back(2, 3));
        assert!(!should_fall_back(2, 0));
        assert!(!should_fall_back(0, 0));
    }

    #[test]
    fn remembered_name_promotes_unflagged_team() {
        let mut teams = vec![
            team("466.l.1.t.1", "Other", "G1", false),
            team("466.l.1.t.2", "Splash Bros", "G2", false),
        ];
        let ctx = SessionContext::new("466.l.1").with_team_name("splash bros");
        let identity = identify_current(&mut teams, &ctx);
        assert!(!teams[0].is_current_login);
        assert!(teams[1].is_current_login);
        assert_eq!(identity.team_keys, vec!["466.l.1.t.2"]);
        assert_eq!(identity.team_ids, vec!["2"]);
        assert_eq!(identity.manager_guids, vec!["G2"]);
    }

    #[test]
    fn flagged_and_named_teams_are_both_collected_once() {
        let mut teams = vec![
            team("466.l.1.t.1", "Mine", "G1", true),
            team("466.l.1.t.5", "Mine", "G1", false),
        ];
        let ctx = SessionContext::new("466.l.1").with_team_name("MINE");
        let identity = identify_current(&mut teams, &ctx);
        assert_eq!(identity.team_keys, vec!["466.l.1.t.1", "466.l.1.t.5"]);
        assert_eq!(identity.team_names, vec!["Mine"]);
        assert_eq!(identity.manager_guids, vec!["G1"]);
    }

    #[test]
    fn previous_match_prefers_team_id() {
        let identity = UserIdentity {
            team_ids: vec!["3".into()],
            manager_guids: vec!["G9".into()],
            team_names: vec!["Renamed".into()],
            ..Default::default()
        };
        let mut prev = vec![
            team("454.l.7.t.3", "Old Name", "GX", false),
            team("454.l.7.t.4", "Renamed", "G9", true),
        ];
        assert_eq!(identify_previous(&mut prev, &identity), Some(MatchSignal::TeamId));
        assert!(prev[0].is_current_login);
        assert!(!prev[1].is_current_login);
    }

    #[test]
    fn previous_match_falls_back_to_guid_then_name() {
        let identity = UserIdentity {
            team_ids: vec!["99".into()],
            manager_guids: vec!["g9".into()],
            team_names: vec!["Renamed".into()],
            ..Default::default()
        };
        let mut prev = vec![
            team("454.l.7.t.1", "Renamed", "GX", false),
            team("454.l.7.t.2", "Whatever", "G9", false),
        ];
        assert_eq!(identify_previous(&mut prev, &identity), Some(MatchSignal::ManagerGuid));
        assert!(!prev[0].is_current_login);
        assert!(prev[1].is_current_login);

        let identity = UserIdentity {
            team_names: vec!["renamed".into()],
            ..Default::default()
        };
        let mut prev = vec![team("454.l.7.t.1", "RENAMED", "", false)];
        assert_eq!(identify_previous(&mut prev, &identity), Some(MatchSignal::TeamName));
        assert!(prev[0].is_current_login);
    }

    #[test]
    fn previous_login_flag_is_not_trusted() {
        let mut prev = vec![team("454.l.7.t.1", "Stranger", "GX", true)];
        assert_eq!(identify_previous(&mut prev, &UserIdentity::default()), None);
        assert!(!prev[0].is_current_login);
    }

    #[test]
    fn reconcile_without_previous_season() {
        let current = SeasonInput {
            meta: meta("466.l.1", "2025", None),
            teams: vec![team("466.l.1.t.1", "Mine", "G1", true)],
            keepers: vec![keeper("1", Some("466.l.1.t.1")), keeper("2", None)],
        };
        let result = reconcile(&SessionContext::new("466.l.1"), current, None, now());
        assert!(result.previous.is_none());
        assert_eq!(result.metadata.current_keeper_count, 1);
        assert_eq!(result.metadata.previous_keeper_count, 0);
        assert!(!result.metadata.fallback_to_previous);
        assert_eq!(result.current.orphans.len(), 1);
        assert_eq!(result.metadata.available_seasons, vec!["2025"]);
        assert_eq!(result.metadata.generated_at, now());
    }

    #[test]
    fn reconcile_falls_back_when_current_has_no_keepers() {
        let current = SeasonInput {
            meta: meta("466.l.1", "2025", Some("454.l.7")),
            teams: vec![team("466.l.1.t.2", "Mine", "G1", true)],
            keepers: vec![],
        };
        let previous = SeasonInput {
            meta: meta("454.l.7", "2024", None),
            teams: vec![
                team("454.l.7.t.2", "Mine Old", "G1", false),
                team("454.l.7.t.5", "Rival", "G5", false),
            ],
            keepers: vec![keeper("10", Some("454.l.7.t.2")), keeper("11", Some("454.l.7.t.5"))],
        };
        let result = reconcile(&SessionContext::new("466.l.1"), current, Some(previous), now());

        let prev = result.previous.as_ref().unwrap();
        assert_eq!(prev.league_key, "454.l.7");
        assert_eq!(prev.keeper_count(), 2);
        let mine: Vec<&str> = prev.user_teams().map(|t| t.team_key.as_str()).collect();
        assert_eq!(mine, vec!["454.l.7.t.2"]);

        let md = &result.metadata;
        assert_eq!(md.previous_league_key.as_deref(), Some("454.l.7"));
        assert_eq!(md.previous_season.as_deref(), Some("2024"));
        assert_eq!(md.available_seasons, vec!["2025", "2024"]);
        assert_eq!(md.current_keeper_count, 0);
        assert_eq!(md.previous_keeper_count, 2);
        assert!(md.fallback_to_previous);
        assert_eq!(md.user_team_keys, vec!["466.l.1.t.2", "454.l.7.t.2"]);
        assert_eq!(md.user_team_ids, vec!["2"]);
    }

    #[test]
    fn previous_pointing_at_current_league_is_dropped() {
        let current = SeasonInput {
            meta: meta("466.l.1", "2025", Some("466.l.1")),
            ..Default::default()
        };
        let previous = SeasonInput {
            meta: meta("466.l.1", "2025", None),
            ..Default::default()
        };
        assert_eq!(previous_league_key(&current.meta), None);
        let result = reconcile(&SessionContext::new("466.l.1"), current, Some(previous), now());
        assert!(result.previous.is_none());
        assert_eq!(result.metadata.previous_league_key, None);
        assert_eq!(result.metadata.previous_season, None);
    }

    #[test]
    fn keepers_of_unlisted_teams_stay_grouped() {
        let current = SeasonInput {
            meta: meta("466.l.1", "2025", None),
            teams: vec![team("466.l.1.t.1", "Mine", "G1", true)],
            keepers: vec![
                keeper("1", Some("466.l.1.t.1")),
                keeper("2", Some("466.l.1.t.9")),
            ],
        };
        let result = reconcile(&SessionContext::new("466.l.1"), current, None, now());

        assert_eq!(result.current.keepers_by_team["466.l.1.t.9"].len(), 1);
        assert_eq!(result.current.team_for("466.l.1.t.9"), None);
        assert_eq!(
            result.current.team_for("466.l.1.t.1").map(|t| t.team_name.as_str()),
            Some("Mine")
        );

        let rosters = result.current.rosters();
        assert_eq!(rosters.len(), 2);
        assert_eq!(rosters[0].team_name.as_deref(), Some("Mine"));
        assert!(rosters[0].is_current_login);
        assert_eq!(rosters[1].team_key, "466.l.1.t.9");
        assert_eq!(rosters[1].team_name, None);
        assert!(!rosters[1].is_current_login);
        assert_eq!(rosters[1].keepers.len(), 1);
    }

    #[test]
    fn empty_inputs_reconcile_to_empty_collections() {
        let result = reconcile(
            &SessionContext::new("466.l.1"),
            SeasonInput::default(),
            None,
            now(),
        );
        assert_eq!(result.current.league_key, "466.l.1");
        assert!(result.current.teams.is_empty());
        assert!(result.current.keepers_by_team.is_empty());
        assert!(result.metadata.user_team_keys.is_empty());
        assert!(result.metadata.available_seasons.is_empty());
    }
}
