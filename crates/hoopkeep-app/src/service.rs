// Keeper service: fetches Yahoo resources and runs them through the normalizer.

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};

use hoopkeep_core::league::{self, LeagueSummary};
use hoopkeep_core::reconcile::{self, ReconciliationResult, SeasonInput};
use hoopkeep_core::SessionContext;

use crate::config::Config;
use crate::yahoo::ResourceFetcher;

// ---------------------------------------------------------------------------
// Resource paths
// ---------------------------------------------------------------------------

/// Leagues (with teams) of the logged-in user for one game code.
pub fn users_path(game_code: &str) -> String {
    format!("fantasy/v2/users;use_login=1/games;game_codes={game_code}/leagues;out=teams")
}

pub fn teams_path(league_key: &str) -> String {
    format!("fantasy/v2/league/{league_key}/teams")
}

/// Players of a league filtered by status, with ownership.
pub fn keepers_path(league_key: &str, status: &str) -> String {
    format!("fantasy/v2/league/{league_key}/players;status={status}/ownership")
}

// ---------------------------------------------------------------------------
// KeeperService
// ---------------------------------------------------------------------------

pub struct KeeperService<F> {
    fetcher: F,
    game_code: String,
    status_filter: String,
}

impl<F: ResourceFetcher> KeeperService<F> {
    pub fn new(fetcher: F, game_code: impl Into<String>, status_filter: impl Into<String>) -> Self {
        KeeperService {
            fetcher,
            game_code: game_code.into(),
            status_filter: status_filter.into(),
        }
    }

    pub fn from_config(fetcher: F, config: &Config) -> Self {
        KeeperService::new(
            fetcher,
            config.yahoo.game_code.clone(),
            config.keepers.status_filter.clone(),
        )
    }

    /// Head-to-head leagues of the logged-in user, newest season first.
    pub async fn leagues(&self) -> anyhow::Result<Vec<LeagueSummary>> {
        let payload = self
            .fetcher
            .fetch(&users_path(&self.game_code))
            .await
            .context("failed to fetch user leagues")?;
        let mut leagues = league::extract_leagues(&payload);
        league::sort_for_display(&mut leagues);
        info!(count = leagues.len(), "leagues listed");
        Ok(leagues)
    }

    /// Current and previous season keepers for the league in `ctx`.
    ///
    /// The current season must load. Last season is fetched only when the
    /// current league links to one, and any failure there is logged and
    /// treated as no previous data.
    pub async fn keepers(&self, ctx: &SessionContext) -> anyhow::Result<ReconciliationResult> {
        let current = self
            .season(&ctx.league_key)
            .await
            .with_context(|| format!("failed to fetch league {}", ctx.league_key))?;

        let previous = match reconcile::previous_league_key(&current.meta) {
            Some(key) => match self.season(key).await {
                Ok(season) => Some(season),
                Err(e) => {
                    warn!(league_key = key, error = %e, "previous season unavailable");
                    None
                }
            },
            None => None,
        };

        let result = reconcile::reconcile(ctx, current, previous, Utc::now());
        info!(
            league_key = %result.metadata.league_key,
            current = result.metadata.current_keeper_count,
            previous = result.metadata.previous_keeper_count,
            fallback = result.metadata.fallback_to_previous,
            "keepers reconciled"
        );
        Ok(result)
    }

    async fn season(&self, league_key: &str) -> Result<SeasonInput, crate::yahoo::FetchError> {
        let teams = teams_path(league_key);
        let keepers = keepers_path(league_key, &self.status_filter);
        let (teams_payload, keepers_payload) =
            tokio::try_join!(self.fetcher.fetch(&teams), self.fetcher.fetch(&keepers))?;
        Ok(SeasonInput::from_payloads(&teams_payload, &keepers_payload))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
