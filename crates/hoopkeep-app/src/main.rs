// hoopkeep entry point.
//
// Startup sequence:
// 1. Parse the command line
// 2. Load config
// 3. Initialize tracing (log to file; stdout carries the JSON result)
// 4. Build the Yahoo client and keeper service
// 5. Run the command and print its result

use hoopkeep_app::config;
use hoopkeep_app::service::KeeperService;
use hoopkeep_app::yahoo::YahooClient;
use hoopkeep_core::{ReconciliationResult, RosterSummary, SessionContext};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "hoopkeep", version, about = "Yahoo Fantasy basketball keeper lookup")]
struct Cli {
    #[arg(long, global = true, help = "Print compact instead of pretty JSON")]
    compact: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the logged-in user's head-to-head leagues, newest season first.
    Leagues {
        #[arg(long, help = "Only print the distinct seasons")]
        seasons: bool,
    },
    /// Show current and previous season keepers for a league.
    Keepers {
        league_key: String,
        #[arg(long, help = "Your team name in this league, used when Yahoo omits the login flag")]
        team_name: Option<String>,
        #[arg(long, help = "Print keeper names per team instead of the full result")]
        rosters: bool,
    },
}

/// Output of `keepers --rosters`.
#[derive(Serialize)]
struct RosterView {
    league_key: String,
    current: Vec<RosterSummary>,
    previous: Option<Vec<RosterSummary>>,
    fallback_to_previous: bool,
}

impl RosterView {
    fn from_result(result: &ReconciliationResult) -> Self {
        RosterView {
            league_key: result.metadata.league_key.clone(),
            current: result.current.rosters(),
            previous: result.previous.as_ref().map(|p| p.rosters()),
            fallback_to_previous: result.metadata.fallback_to_previous,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse the command line
    let cli = Cli::parse();

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;

    // 3. Initialize tracing
    init_tracing(&config)?;
    info!(
        "Config loaded: api_base={}, game_code={}",
        config.yahoo.api_base, config.yahoo.game_code
    );

    // 4. Build the Yahoo client and keeper service
    let client = YahooClient::from_config(&config).context("failed to build Yahoo client")?;
    let service = KeeperService::from_config(client, &config);

    // 5. Run the command
    match cli.command {
        Command::Leagues { seasons } => {
            let leagues = service.leagues().await?;
            if seasons {
                print_json(&hoopkeep_core::league::seasons(&leagues), cli.compact)?;
            } else {
                print_json(&leagues, cli.compact)?;
            }
        }
        Command::Keepers {
            league_key,
            team_name,
            rosters,
        } => {
            let mut ctx = SessionContext::new(league_key);
            if let Some(name) = team_name {
                ctx = ctx.with_team_name(name);
            }
            let result = service.keepers(&ctx).await?;
            if rosters {
                print_json(&RosterView::from_result(&result), cli.compact)?;
            } else {
                print_json(&result, cli.compact)?;
            }
        }
    }

    info!("hoopkeep finished");
    Ok(())
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> anyhow::Result<()> {
    let text = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .context("failed to serialize output")?;
    println!("{text}");
    Ok(())
}

/// Initialize tracing to log to a file (stdout is reserved for JSON output).
fn init_tracing(config: &config::Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let logging = &config.logging;
    let log_dir = config.base_dir.join(&logging.dir);
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_file = std::fs::File::create(log_dir.join("hoopkeep.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keepers_with_team_name() {
        let cli = Cli::try_parse_from([
            "hoopkeep",
            "keepers",
            "466.l.9001",
            "--team-name",
            "Splash Bros",
        ])
        .unwrap();
        match cli.command {
            Command::Keepers {
                league_key,
                team_name,
                rosters,
            } => {
                assert_eq!(league_key, "466.l.9001");
                assert_eq!(team_name.as_deref(), Some("Splash Bros"));
                assert!(!rosters);
            }
            other => panic!("expected keepers, got {other:?}"),
        }
        assert!(!cli.compact);
    }

    #[test]
    fn parses_leagues_with_global_flag() {
        let cli = Cli::try_parse_from(["hoopkeep", "leagues", "--seasons", "--compact"]).unwrap();
        assert!(cli.compact);
        assert!(matches!(cli.command, Command::Leagues { seasons: true }));
    }

    #[test]
    fn roster_view_names_each_keeper_group() {
        use chrono::TimeZone;
        use hoopkeep_core::{KeeperPlayerRecord, SeasonInput, TeamRecord};

        let current = SeasonInput {
            teams: vec![TeamRecord {
                team_key: "466.l.1.t.1".into(),
                team_name: "Mine".into(),
                team_id: "1".into(),
                is_current_login: true,
                ..Default::default()
            }],
            keepers: vec![KeeperPlayerRecord {
                player_key: "466.p.7".into(),
                name_full: "Jalen Brunson".into(),
                owner_team_key: Some("466.l.1.t.1".into()),
                is_keeper: true,
                ..Default::default()
            }],
            ..Default::default()
        };
        let at = chrono::Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap();
        let result = hoopkeep_core::reconcile::reconcile(&SessionContext::new("466.l.1"), current, None, at);

        let view = serde_json::to_value(RosterView::from_result(&result)).unwrap();
        assert_eq!(view["league_key"], "466.l.1");
        assert_eq!(view["current"][0]["team_name"], "Mine");
        assert_eq!(view["current"][0]["keepers"][0], "Jalen Brunson");
        assert!(view["previous"].is_null());
    }

    #[test]
    fn parses_keepers_rosters_flag() {
        let cli = Cli::try_parse_from(["hoopkeep", "keepers", "466.l.1", "--rosters"]).unwrap();
        assert!(matches!(cli.command, Command::Keepers { rosters: true, .. }));
    }

    #[test]
    fn keepers_requires_league_key() {
        assert!(Cli::try_parse_from(["hoopkeep", "keepers"]).is_err());
    }
}
