//! The reconciler.
//!
//! One `Reconciler` owns the upstream client, the mirror store and the
//! per-run options for the duration of one sync run. Each `sync_*`
//! operation fetches one upstream batch and reconciles it inside one
//! transaction; `full_sync` drives the entity kinds in dependency order
//! (countries → leagues → per-league teams → fixtures → standings).
//!
//! Records within a batch apply in arrival order; a duplicate natural key
//! within one batch means the later record wins. Cross-kind ordering is
//! this module's `full_sync` responsibility — the per-kind reconcilers
//! trust their caller.

pub mod countries;
pub mod fixtures;
pub mod leagues;
pub mod live;
pub(crate) mod resolver;
pub mod standings;
pub mod teams;

use std::time::Duration;

use tracing::{error, info};

use crate::api::Upstream;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::store::Mirror;

/// Per-record accounting for one reconciled batch.
///
/// `skipped` counts records dropped for unresolved references (or missing
/// natural keys) — batch-level partial success, distinct from a store
/// failure, which rolls the whole batch back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub processed: usize,
    pub skipped: usize,
}

/// Per-run knobs, taken from `[sync]` in the config.
#[derive(Debug, Clone, Copy)]
pub struct ReconcilerOptions {
    /// Whether a league referencing an unknown country creates a stub row.
    pub stub_create_countries: bool,
    /// Pause between per-league calls during a full sync.
    pub pace: Duration,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self { stub_create_countries: true, pace: Duration::from_secs(1) }
    }
}

impl From<SyncConfig> for ReconcilerOptions {
    fn from(cfg: SyncConfig) -> Self {
        Self {
            stub_create_countries: cfg.stub_create_countries,
            pace: Duration::from_secs(cfg.pace_secs),
        }
    }
}

pub struct Reconciler {
    upstream: Box<dyn Upstream>,
    store: Mirror,
    options: ReconcilerOptions,
}

impl Reconciler {
    pub fn new(upstream: Box<dyn Upstream>, store: Mirror, options: ReconcilerOptions) -> Self {
        Self { upstream, store, options }
    }

    pub fn store(&self) -> &Mirror {
        &self.store
    }

    pub async fn sync_countries(&self) -> Result<BatchOutcome, SyncError> {
        let batch = self.upstream.countries().await?;
        let outcome = countries::reconcile(&self.store, &batch).await?;
        info!(processed = outcome.processed, skipped = outcome.skipped, "Countries synced");
        Ok(outcome)
    }

    pub async fn sync_leagues(
        &self,
        season: Option<i64>,
        country: Option<&str>,
    ) -> Result<BatchOutcome, SyncError> {
        let batch = self.upstream.leagues(season, country).await?;
        let outcome =
            leagues::reconcile(&self.store, &batch, self.options.stub_create_countries).await?;
        info!(
            processed = outcome.processed,
            skipped = outcome.skipped,
            ?season,
            "Leagues synced"
        );
        Ok(outcome)
    }

    pub async fn sync_teams(&self, league_id: i64, season: i64) -> Result<BatchOutcome, SyncError> {
        let Some(api_league_id) = self.api_league_id(league_id).await? else {
            return Ok(BatchOutcome::default());
        };
        let batch = self.upstream.teams(api_league_id, season).await?;
        let outcome = teams::reconcile(&self.store, league_id, season, &batch).await?;
        info!(
            processed = outcome.processed,
            league_id,
            season,
            "Teams synced"
        );
        Ok(outcome)
    }

    pub async fn sync_fixtures(
        &self,
        league_id: i64,
        season: i64,
        status: Option<&str>,
    ) -> Result<BatchOutcome, SyncError> {
        let Some(api_league_id) = self.api_league_id(league_id).await? else {
            return Ok(BatchOutcome::default());
        };
        let batch = self.upstream.fixtures(api_league_id, season, status).await?;
        let outcome = fixtures::reconcile(&self.store, league_id, season, &batch).await?;
        info!(
            processed = outcome.processed,
            skipped = outcome.skipped,
            league_id,
            season,
            "Fixtures synced"
        );
        Ok(outcome)
    }

    pub async fn sync_standings(
        &self,
        league_id: i64,
        season: i64,
    ) -> Result<BatchOutcome, SyncError> {
        let Some(api_league_id) = self.api_league_id(league_id).await? else {
            return Ok(BatchOutcome::default());
        };
        let batch = self.upstream.standings(api_league_id, season).await?;
        let outcome = standings::reconcile(&self.store, league_id, season, &batch).await?;
        info!(
            processed = outcome.processed,
            skipped = outcome.skipped,
            league_id,
            season,
            "Standings synced"
        );
        Ok(outcome)
    }

    pub async fn refresh_live_fixtures(&self) -> Result<BatchOutcome, SyncError> {
        let batch = self.upstream.live_fixtures().await?;
        let outcome = live::reconcile(&self.store, &batch).await?;
        info!(
            processed = outcome.processed,
            skipped = outcome.skipped,
            "Live fixtures refreshed"
        );
        Ok(outcome)
    }

    /// Full update in dependency order. Per-league failures abort the run;
    /// the caller decides whether to restart.
    pub async fn full_sync(&self, season: i64) -> Result<(), SyncError> {
        self.sync_countries().await?;
        self.sync_leagues(Some(season), None).await?;

        let league_ids = resolver::all_league_ids(self.store.pool()).await?;
        info!(leagues = league_ids.len(), season, "Syncing per-league data");

        for league_id in league_ids {
            self.sync_teams(league_id, season).await?;
            self.sync_fixtures(league_id, season, None).await?;
            self.sync_standings(league_id, season).await?;
            tokio::time::sleep(self.options.pace).await;
        }

        info!(season, "Full sync completed");
        Ok(())
    }

    async fn api_league_id(&self, league_id: i64) -> Result<Option<i64>, SyncError> {
        let api_league_id = resolver::league_upstream_id(self.store.pool(), league_id).await?;
        if api_league_id.is_none() {
            error!(league_id, "League not found in mirror, nothing to sync");
        }
        Ok(api_league_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
