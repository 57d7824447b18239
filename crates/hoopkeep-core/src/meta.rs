// League metadata block: key, name, season, scoring type, renewal link.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::league_key;
use crate::raw::{self, lookup, text_at};

/// Scoring type Yahoo reports for head-to-head leagues.
pub const HEAD_TO_HEAD: &str = "head";

/// The descriptive fields of one league instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueMeta {
    pub league_key: String,
    pub name: String,
    pub season: String,
    pub scoring_type: String,
    /// Resolved key of the league this one was renewed from, if any.
    pub previous_league_key: Option<String>,
}

impl LeagueMeta {
    /// Read the metadata block from a raw `league` node.
    ///
    /// The node is either a mapping or a sequence of attribute blocks; both
    /// are handled by [`raw::lookup`].
    pub fn from_league_node(league: &Value) -> Self {
        let league_key = text_at(league, "league_key").unwrap_or_default();
        let previous_league_key = league_key::resolve_previous(league, &league_key);
        LeagueMeta {
            name: text_at(league, "name").unwrap_or_default(),
            season: text_at(league, "season").unwrap_or_default(),
            scoring_type: text_at(league, "scoring_type").unwrap_or_default(),
            league_key,
            previous_league_key,
        }
    }

    /// Read the metadata block from a league-scoped payload
    /// (`fantasy_content → league`). Missing sections yield empty fields.
    pub fn from_payload(payload: &Value) -> Self {
        raw::league_node(payload)
            .map(Self::from_league_node)
            .unwrap_or_default()
    }

    pub fn is_head_to_head(&self) -> bool {
        self.scoring_type == HEAD_TO_HEAD
    }
}

/// `true` when a raw league node declares head-to-head scoring.
pub fn is_head_to_head(league: &Value) -> bool {
    lookup(league, "scoring_type").and_then(raw::text).as_deref() == Some(HEAD_TO_HEAD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_attribute_block_sequence() {
        let payload = json!({"fantasy_content": {"league": [
            {
                "league_key": "466.l.9001",
                "name": "Hardwood Keepers",
                "season": "2025",
                "scoring_type": "head",
                "renew": "454_12345"
            },
            {"teams": {"count": 0}}
        ]}});
        let meta = LeagueMeta::from_payload(&payload);
        assert_eq!(meta.league_key, "466.l.9001");
        assert_eq!(meta.name, "Hardwood Keepers");
        assert_eq!(meta.season, "2025");
        assert!(meta.is_head_to_head());
        assert_eq!(meta.previous_league_key.as_deref(), Some("454.l.12345"));
    }

    #[test]
    fn numeric_season_is_rendered_as_text() {
        let league = json!({"league_key": "466.l.1", "season": 2025, "scoring_type": "point"});
        let meta = LeagueMeta::from_league_node(&league);
        assert_eq!(meta.season, "2025");
        assert!(!meta.is_head_to_head());
        assert!(!is_head_to_head(&league));
    }

    #[test]
    fn missing_league_yields_defaults() {
        let meta = LeagueMeta::from_payload(&json!({"fantasy_content": {}}));
        assert_eq!(meta, LeagueMeta::default());
    }
}
