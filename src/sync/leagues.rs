//! League reconciliation.
//!
//! Natural key: the upstream league id. The country reference is resolved
//! first (stub-create when enabled); the season window columns reflect only
//! the season upstream marks current. UPDATE overwrites every mutable field
//! with the latest upstream value but never touches the resolved country
//! reference or the creation timestamp.

use super::{resolver, BatchOutcome};
use crate::error::SyncError;
use crate::store::Mirror;
use crate::types::{current_season, LeaguePayload};

pub async fn reconcile(
    store: &Mirror,
    batch: &[LeaguePayload],
    stub_create_countries: bool,
) -> Result<BatchOutcome, SyncError> {
    let mut tx = store.begin().await?;
    let mut outcome = BatchOutcome::default();

    for payload in batch {
        let country_id = match &payload.country {
            Some(country) => {
                resolver::resolve_country_or_stub(&mut tx, country, stub_create_countries)
                    .await?
            }
            None => None,
        };

        let season = current_season(&payload.seasons);
        let season_year = season.and_then(|s| s.year);
        let season_start = season.and_then(|s| s.start.as_deref());
        let season_end = season.and_then(|s| s.end.as_deref());

        match resolver::league_id_by_upstream(&mut *tx, payload.league.id).await? {
            Some(league_id) => {
                sqlx::query(
                    "UPDATE leagues SET name = ?1, type = ?2, logo_url = ?3, \
                     season_start = ?4, season_end = ?5, current_season = ?6, \
                     updated_at = datetime('now') WHERE league_id = ?7",
                )
                .bind(&payload.league.name)
                .bind(payload.league.kind.as_deref())
                .bind(payload.league.logo.as_deref())
                .bind(season_start)
                .bind(season_end)
                .bind(season_year)
                .bind(league_id)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query(
                    "INSERT INTO leagues (api_league_id, name, type, country_id, logo_url, \
                     season_start, season_end, current_season) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .bind(payload.league.id)
                .bind(&payload.league.name)
                .bind(payload.league.kind.as_deref())
                .bind(country_id)
                .bind(payload.league.logo.as_deref())
                .bind(season_start)
                .bind(season_end)
                .bind(season_year)
                .execute(&mut *tx)
                .await?;
            }
        }
        outcome.processed += 1;
    }

    tx.commit().await?;
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
