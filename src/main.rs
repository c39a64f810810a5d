//! fixturesync — football data mirror
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens the mirror store and dispatches one of the run modes:
//!
//!   fixturesync full [season]           full sync in dependency order
//!   fixturesync countries               countries only
//!   fixturesync leagues <season> [country]
//!   fixturesync league <id> <season>    teams + fixtures + standings
//!   fixturesync live                    one live refresh pass
//!   fixturesync watch                   periodic live refresh until Ctrl+C

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Utc};
use std::time::Duration;
use tracing::{error, info};

use fixturesync::api::ApiFootballClient;
use fixturesync::config::AppConfig;
use fixturesync::store::Mirror;
use fixturesync::sync::{Reconciler, ReconcilerOptions};

const USAGE: &str = "usage: fixturesync <full [season] | countries | leagues <season> [country] \
                     | league <id> <season> | live | watch>";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load_or_default("config.toml")?;
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        bail!("{USAGE}");
    }

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| cfg.store.database_url.clone());
    let store = Mirror::connect(&database_url)
        .await
        .with_context(|| format!("Failed to open mirror store at {database_url}"))?;

    let api_key = AppConfig::resolve_env(&cfg.api.key_env)?;
    let client = ApiFootballClient::new(
        &cfg.api,
        &api_key,
        cfg.retry,
        Some(store.pool().clone()),
    )?;

    let reconciler =
        Reconciler::new(Box::new(client), store, ReconcilerOptions::from(cfg.sync));

    match args[0].as_str() {
        "full" => {
            let season = match args.get(1) {
                Some(s) => s.parse().context("season must be a year")?,
                None => i64::from(Utc::now().year()),
            };
            info!(season, "Starting full sync");
            reconciler.full_sync(season).await?;
        }
        "countries" => {
            reconciler.sync_countries().await?;
        }
        "leagues" => {
            let Some(season) = args.get(1) else { bail!("{USAGE}") };
            let season = season.parse().context("season must be a year")?;
            reconciler
                .sync_leagues(Some(season), args.get(2).map(String::as_str))
                .await?;
        }
        "league" => {
            let (Some(id), Some(season)) = (args.get(1), args.get(2)) else {
                bail!("{USAGE}")
            };
            let league_id = id.parse().context("league id must be an integer")?;
            let season = season.parse().context("season must be a year")?;
            reconciler.sync_teams(league_id, season).await?;
            reconciler.sync_fixtures(league_id, season, None).await?;
            reconciler.sync_standings(league_id, season).await?;
        }
        "live" => {
            reconciler.refresh_live_fixtures().await?;
        }
        "watch" => {
            watch(&reconciler, cfg.sync.live_interval_secs).await;
        }
        other => bail!("unknown mode '{other}'\n{USAGE}"),
    }

    Ok(())
}

/// Periodic live refresh until shutdown. Refresh failures are logged and
/// the loop continues — one bad upstream window should not end a watch.
async fn watch(reconciler: &Reconciler, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(interval_secs, "Entering live watch loop. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match reconciler.refresh_live_fixtures().await {
                    Ok(outcome) => {
                        info!(
                            processed = outcome.processed,
                            skipped = outcome.skipped,
                            "Live refresh pass complete"
                        );
                    }
                    Err(e) => {
                        error!(error = %e, "Live refresh failed — continuing");
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fixturesync=info"));

    let json_logging = std::env::var("FIXTURESYNC_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
