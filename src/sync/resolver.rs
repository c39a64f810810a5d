//! Natural-key resolution.
//!
//! Maps upstream identifiers (upstream-assigned ids, or names for
//! countries) to local synthetic ids. Lookups are exact-match and run
//! inside the caller's batch transaction so resolution sees rows written
//! earlier in the same batch.
//!
//! Countries are the only kind with an implicit-create path: a league may
//! reference a country the mirror has not seen yet, and (when enabled) a
//! stub row with name/code only is inserted so the dependency never blocks
//! a sync. Teams and leagues are always resolved strictly; a miss is the
//! caller's problem.

use sqlx::{Executor, Row, Sqlite, Transaction};
use tracing::debug;

use crate::types::CountryPayload;

pub(crate) async fn country_id_by_name<'e, E>(
    exec: E,
    name: &str,
) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT country_id FROM countries WHERE name = ?1")
        .bind(name)
        .fetch_optional(exec)
        .await?;
    Ok(row.map(|r| r.get(0)))
}

pub(crate) async fn league_id_by_upstream<'e, E>(
    exec: E,
    api_league_id: i64,
) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT league_id FROM leagues WHERE api_league_id = ?1")
        .bind(api_league_id)
        .fetch_optional(exec)
        .await?;
    Ok(row.map(|r| r.get(0)))
}

/// Local league id back to the upstream id, needed to build fetch params.
pub(crate) async fn league_upstream_id<'e, E>(
    exec: E,
    league_id: i64,
) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT api_league_id FROM leagues WHERE league_id = ?1")
        .bind(league_id)
        .fetch_optional(exec)
        .await?;
    Ok(row.map(|r| r.get(0)))
}

pub(crate) async fn team_id_by_upstream<'e, E>(
    exec: E,
    api_team_id: i64,
) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT team_id FROM teams WHERE api_team_id = ?1")
        .bind(api_team_id)
        .fetch_optional(exec)
        .await?;
    Ok(row.map(|r| r.get(0)))
}

pub(crate) async fn fixture_id_by_upstream<'e, E>(
    exec: E,
    api_fixture_id: i64,
) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT fixture_id FROM fixtures WHERE api_fixture_id = ?1")
        .bind(api_fixture_id)
        .fetch_optional(exec)
        .await?;
    Ok(row.map(|r| r.get(0)))
}

/// Standings are keyed by the (league, team, season) composite.
pub(crate) async fn standing_id_by_key<'e, E>(
    exec: E,
    league_id: i64,
    team_id: i64,
    season: i64,
) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT standing_id FROM standings \
         WHERE league_id = ?1 AND team_id = ?2 AND season = ?3",
    )
    .bind(league_id)
    .bind(team_id)
    .bind(season)
    .fetch_optional(exec)
    .await?;
    Ok(row.map(|r| r.get(0)))
}

pub(crate) async fn all_league_ids<'e, E>(exec: E) -> Result<Vec<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query("SELECT league_id FROM leagues ORDER BY league_id")
        .fetch_all(exec)
        .await?;
    Ok(rows.iter().map(|r| r.get(0)).collect())
}

/// Resolve a league's country reference, inserting a stub row when the
/// country is absent and stub-create is enabled.
///
/// The stub carries name and code only; a later full country sync enriches
/// the same row. With stub-create disabled the reference stays NULL.
pub(crate) async fn resolve_country_or_stub(
    tx: &mut Transaction<'_, Sqlite>,
    country: &CountryPayload,
    stub_create: bool,
) -> Result<Option<i64>, sqlx::Error> {
    let Some(name) = country.name.as_deref().filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if let Some(id) = country_id_by_name(&mut **tx, name).await? {
        return Ok(Some(id));
    }

    if !stub_create {
        debug!(country = name, "Country not in mirror and stub-create disabled");
        return Ok(None);
    }

    let result = sqlx::query("INSERT INTO countries (name, code) VALUES (?1, ?2)")
        .bind(name)
        .bind(country.code.as_deref())
        .execute(&mut **tx)
        .await?;
    debug!(country = name, "Created stub country row");
    Ok(Some(result.last_insert_rowid()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
