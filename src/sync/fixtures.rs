//! Fixture reconciliation (full sync path).
//!
//! Natural key: the upstream fixture id. Home and away teams are resolved
//! strictly — a fixture whose teams are not both in the mirror is skipped
//! (logged, counted) and the rest of the batch proceeds; it is never
//! partially inserted. UPDATE uses the full column set below; the live
//! refresh path in `sync::live` deliberately uses a narrower one.

use tracing::warn;

use super::{resolver, BatchOutcome};
use crate::error::SyncError;
use crate::store::Mirror;
use crate::types::{flatten_scores, FixturePayload};

/// Full-sync column set: everything mutable on a fixture row except the
/// resolved league/team references and the creation timestamp.
pub(crate) const UPDATE_FIXTURE_FULL_SQL: &str = "UPDATE fixtures SET \
     fixture_date = ?1, status = ?2, round = ?3, season = ?4, venue = ?5, referee = ?6, \
     home_score = ?7, away_score = ?8, \
     halftime_home_score = ?9, halftime_away_score = ?10, \
     fulltime_home_score = ?11, fulltime_away_score = ?12, \
     extratime_home_score = ?13, extratime_away_score = ?14, \
     penalty_home_score = ?15, penalty_away_score = ?16, \
     updated_at = datetime('now') \
     WHERE fixture_id = ?17";

pub(crate) const INSERT_FIXTURE_SQL: &str = "INSERT INTO fixtures \
     (api_fixture_id, league_id, home_team_id, away_team_id, fixture_date, status, \
      round, season, venue, referee, home_score, away_score, \
      halftime_home_score, halftime_away_score, fulltime_home_score, fulltime_away_score, \
      extratime_home_score, extratime_away_score, penalty_home_score, penalty_away_score) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)";

pub async fn reconcile(
    store: &Mirror,
    league_id: i64,
    season: i64,
    batch: &[FixturePayload],
) -> Result<BatchOutcome, SyncError> {
    let mut tx = store.begin().await?;
    let mut outcome = BatchOutcome::default();

    for payload in batch {
        let home = resolver::team_id_by_upstream(&mut *tx, payload.teams.home.id).await?;
        let away = resolver::team_id_by_upstream(&mut *tx, payload.teams.away.id).await?;
        let (Some(home_team_id), Some(away_team_id)) = (home, away) else {
            warn!(
                fixture = payload.fixture.id,
                home = payload.teams.home.id,
                away = payload.teams.away.id,
                "Skipping fixture with unresolved team reference"
            );
            outcome.skipped += 1;
            continue;
        };

        let kickoff = payload.fixture.kickoff();
        if kickoff.is_none() && payload.fixture.date.is_some() {
            warn!(
                fixture = payload.fixture.id,
                date = ?payload.fixture.date,
                "Fixture has unparseable kickoff date"
            );
        }
        let scores = flatten_scores(&payload.goals, &payload.score);

        match resolver::fixture_id_by_upstream(&mut *tx, payload.fixture.id).await? {
            Some(fixture_id) => {
                sqlx::query(UPDATE_FIXTURE_FULL_SQL)
                    .bind(kickoff)
                    .bind(payload.fixture.status_code())
                    .bind(payload.league.round.as_deref())
                    .bind(season)
                    .bind(payload.fixture.venue_name())
                    .bind(payload.fixture.referee.as_deref())
                    .bind(scores.home)
                    .bind(scores.away)
                    .bind(scores.halftime_home)
                    .bind(scores.halftime_away)
                    .bind(scores.fulltime_home)
                    .bind(scores.fulltime_away)
                    .bind(scores.extratime_home)
                    .bind(scores.extratime_away)
                    .bind(scores.penalty_home)
                    .bind(scores.penalty_away)
                    .bind(fixture_id)
                    .execute(&mut *tx)
                    .await?;
            }
            None => {
                sqlx::query(INSERT_FIXTURE_SQL)
                    .bind(payload.fixture.id)
                    .bind(league_id)
                    .bind(home_team_id)
                    .bind(away_team_id)
                    .bind(kickoff)
                    .bind(payload.fixture.status_code())
                    .bind(payload.league.round.as_deref())
                    .bind(season)
                    .bind(payload.fixture.venue_name())
                    .bind(payload.fixture.referee.as_deref())
                    .bind(scores.home)
                    .bind(scores.away)
                    .bind(scores.halftime_home)
                    .bind(scores.halftime_away)
                    .bind(scores.fulltime_home)
                    .bind(scores.fulltime_away)
                    .bind(scores.extratime_home)
                    .bind(scores.extratime_away)
                    .bind(scores.penalty_home)
                    .bind(scores.penalty_away)
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use sqlx::Row;

    async fn seed_league_and_teams(mirror: &Mirror) -> i64 {
        let league = sqlx::query(
            "INSERT INTO leagues (api_league_id, name) VALUES (39, 'Premier League')",
        )
        .execute(mirror.pool())
        .await
        .unwrap()
        .last_insert_rowid();
        for (api_id, name) in [(10, "Leeds"), (20, "Everton")] {
            sqlx::query("INSERT INTO teams (api_team_id, name) VALUES (?1, ?2)")
                .bind(api_id)
                .bind(name)
                .execute(mirror.pool())
                .await
                .unwrap();
        }
        league
    }

    fn fixture_json(id: i64, home: i64, away: i64) -> Value {
        json!({
            "fixture": {
                "id": id,
                "referee": "M. Oliver",
                "date": "2026-08-22T14:00:00+00:00",
                "venue": { "name": "Elland Road", "city": "Leeds" },
                "status": { "short": "FT" }
            },
            "league": { "id": 39, "season": 2026, "round": "Regular Season - 1" },
            "teams": { "home": { "id": home }, "away": { "id": away } },
            "goals": { "home": 2, "away": 1 },
            "score": {
                "halftime": { "home": 1, "away": 1 },
                "fulltime": { "home": 2, "away": 1 },
                "extratime": null,
                "penalty": null
            }
        })
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let mirror = Mirror::connect("sqlite::memory:").await.unwrap();
        let league_id = seed_league_and_teams(&mirror).await;

        let batch: Vec<FixturePayload> =
            vec![serde_json::from_value(fixture_json(1001, 10, 20)).unwrap()];
        reconcile(&mirror, league_id, 2026, &batch).await.unwrap();
        reconcile(&mirror, league_id, 2026, &batch).await.unwrap();

        let row = sqlx::query(
            "SELECT count(*), sum(home_score), sum(extratime_home_score IS NULL) \
             FROM fixtures WHERE api_fixture_id = 1001",
        )
        .fetch_one(mirror.pool())
        .await
        .unwrap();
        assert_eq!(row.get::<i64, _>(0), 1);
        assert_eq!(row.get::<i64, _>(1), 2);
        assert_eq!(row.get::<i64, _>(2), 1);
    }

    #[tokio::test]
    async fn test_unresolved_team_skipped_rest_committed() {
        let mirror = Mirror::connect("sqlite::memory:").await.unwrap();
        let league_id = seed_league_and_teams(&mirror).await;

        let batch: Vec<FixturePayload> = vec![
            serde_json::from_value(fixture_json(1001, 10, 20)).unwrap(),
            // 999 has no local match
            serde_json::from_value(fixture_json(1002, 999, 20)).unwrap(),
            serde_json::from_value(fixture_json(1003, 20, 10)).unwrap(),
        ];
        let outcome = reconcile(&mirror, league_id, 2026, &batch).await.unwrap();
        assert_eq!(outcome.processed, 2);
        assert_eq!(outcome.skipped, 1);

        let count = sqlx::query("SELECT count(*) FROM fixtures")
            .fetch_one(mirror.pool())
            .await
            .unwrap();
        assert_eq!(count.get::<i64, _>(0), 2);
    }

    #[tokio::test]
    async fn test_null_score_overwrites_previous_value() {
        let mirror = Mirror::connect("sqlite::memory:").await.unwrap();
        let league_id = seed_league_and_teams(&mirror).await;

        let batch: Vec<FixturePayload> =
            vec![serde_json::from_value(fixture_json(1001, 10, 20)).unwrap()];
        reconcile(&mirror, league_id, 2026, &batch).await.unwrap();

        // Upstream now reports the halftime score as unknown: full-replace
        // semantics null it out rather than keeping the stale value.
        let mut regressed = fixture_json(1001, 10, 20);
        regressed["score"]["halftime"] = Value::Null;
        let batch: Vec<FixturePayload> = vec![serde_json::from_value(regressed).unwrap()];
        reconcile(&mirror, league_id, 2026, &batch).await.unwrap();

        let row = sqlx::query(
            "SELECT halftime_home_score, fulltime_home_score FROM fixtures \
             WHERE api_fixture_id = 1001",
        )
        .fetch_one(mirror.pool())
        .await
        .unwrap();
        assert_eq!(row.get::<Option<i64>, _>(0), None);
        assert_eq!(row.get::<Option<i64>, _>(1), Some(2));
    }
}
