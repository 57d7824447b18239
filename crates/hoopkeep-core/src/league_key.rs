// Previous-season league key resolution from renewal metadata.

use serde_json::Value;
use tracing::debug;

use crate::raw::{lookup, text, text_at, Shape};

/// Separator between game id and league id in a canonical league key.
pub const LEAGUE_SEPARATOR: &str = ".l.";

/// Metadata fields that may carry the renewal link, in priority order.
pub const RENEWAL_FIELDS: [&str; 2] = ["renew", "previous_league_key"];

/// Resolve the previous season's league key from a raw league node.
///
/// Returns `None` when neither renewal field carries a usable candidate.
pub fn resolve_previous(league: &Value, current_key: &str) -> Option<String> {
    let candidate = RENEWAL_FIELDS
        .iter()
        .find_map(|field| lookup(league, field).and_then(candidate_text))?;
    Some(normalize(&candidate, current_key))
}

/// Extract the candidate string from a renewal field value: a plain string or
/// number, or an object exposing `value` or `league_key`.
fn candidate_text(value: &Value) -> Option<String> {
    match Shape::of(value) {
        Shape::Absent => None,
        Shape::Scalar(scalar) => text(scalar),
        Shape::Map(_) | Shape::List(_) => {
            text_at(value, "value").or_else(|| text_at(value, "league_key"))
        }
    }
}

/// Rewrite a renewal candidate into canonical `{game}.l.{league}` form.
///
/// - already canonical: returned as is
/// - `454_12345`: rewritten to `454.l.12345`
/// - `12345`: prefixed with the game id of `current_key`
///
/// Anything else, including a bare id with no recoverable prefix, comes back
/// unmodified so a later fetch can still try it.
pub fn normalize(candidate: &str, current_key: &str) -> String {
    let candidate = candidate.trim();
    if candidate.contains(LEAGUE_SEPARATOR) {
        return candidate.to_string();
    }

    if let Some((game, league)) = candidate.split_once('_') {
        if is_numeric(game) && is_numeric(league) {
            return format!("{game}{LEAGUE_SEPARATOR}{league}");
        }
    }

    if is_numeric(candidate) {
        if let Some(game) = game_prefix(current_key) {
            return format!("{game}{LEAGUE_SEPARATOR}{candidate}");
        }
    }

    debug!(candidate, current_key, "previous league key left unresolved");
    candidate.to_string()
}

/// Game id portion of a canonical league key.
pub fn game_prefix(league_key: &str) -> Option<&str> {
    league_key
        .split_once(LEAGUE_SEPARATOR)
        .map(|(game, _)| game.trim())
        .filter(|game| !game.is_empty())
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
