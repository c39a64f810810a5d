//! Standing reconciliation.
//!
//! Composite natural key: (league, team, season). The upstream nests
//! standings as groups of rows per league payload; all groups are
//! flattened into the same table. Team references are resolved strictly —
//! a standing whose team is unknown is skipped and logged.

use tracing::warn;

use super::{resolver, BatchOutcome};
use crate::error::SyncError;
use crate::store::Mirror;
use crate::types::{flatten_totals, StandingsPayload};

pub async fn reconcile(
    store: &Mirror,
    league_id: i64,
    season: i64,
    batch: &[StandingsPayload],
) -> Result<BatchOutcome, SyncError> {
    let mut tx = store.begin().await?;
    let mut outcome = BatchOutcome::default();

    for payload in batch {
        for group in &payload.league.standings {
            for entry in group {
                let Some(team_id) =
                    resolver::team_id_by_upstream(&mut *tx, entry.team.id).await?
                else {
                    warn!(
                        team = entry.team.id,
                        league = league_id,
                        "Skipping standing with unresolved team reference"
                    );
                    outcome.skipped += 1;
                    continue;
                };

                let totals = flatten_totals(entry);

                match resolver::standing_id_by_key(&mut *tx, league_id, team_id, season)
                    .await?
                {
                    Some(standing_id) => {
                        sqlx::query(
                            "UPDATE standings SET rank = ?1, points = ?2, played = ?3, \
                             win = ?4, draw = ?5, lose = ?6, goals_for = ?7, \
                             goals_against = ?8, goal_diff = ?9, form = ?10, \
                             updated_at = datetime('now') WHERE standing_id = ?11",
                        )
                        .bind(entry.rank)
                        .bind(entry.points)
                        .bind(totals.played)
                        .bind(totals.win)
                        .bind(totals.draw)
                        .bind(totals.lose)
                        .bind(totals.goals_for)
                        .bind(totals.goals_against)
                        .bind(entry.goals_diff)
                        .bind(entry.form.as_deref())
                        .bind(standing_id)
                        .execute(&mut *tx)
                        .await?;
                    }
                    None => {
                        sqlx::query(
                            "INSERT INTO standings (league_id, team_id, season, rank, \
                             points, played, win, draw, lose, goals_for, goals_against, \
                             goal_diff, form) \
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                        )
                        .bind(league_id)
                        .bind(team_id)
                        .bind(season)
                        .bind(entry.rank)
                        .bind(entry.points)
                        .bind(totals.played)
                        .bind(totals.win)
                        .bind(totals.draw)
                        .bind(totals.lose)
                        .bind(totals.goals_for)
                        .bind(totals.goals_against)
                        .bind(entry.goals_diff)
                        .bind(entry.form.as_deref())
                        .execute(&mut *tx)
                        .await?;
                    }
                }
                outcome.processed += 1;
            }
        }
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
    use serde_json::json;
    use sqlx::Row;

    async fn seed(mirror: &Mirror) -> i64 {
        let league_id = sqlx::query(
            "INSERT INTO leagues (api_league_id, name) VALUES (39, 'Premier League')",
        )
        .execute(mirror.pool())
        .await
        .unwrap()
        .last_insert_rowid();
        for (api_id, name) in [(42, "Arsenal"), (50, "Manchester City")] {
            sqlx::query("INSERT INTO teams (api_team_id, name) VALUES (?1, ?2)")
                .bind(api_id)
                .bind(name)
                .execute(mirror.pool())
                .await
                .unwrap();
        }
        league_id
    }

    fn standings_payload(points_leader: i64) -> StandingsPayload {
        serde_json::from_value(json!({
            "league": {
                "id": 39,
                "season": 2023,
                "standings": [[
                    {
                        "rank": 1,
                        "team": { "id": 50, "name": "Manchester City" },
                        "points": points_leader,
                        "goalsDiff": 45,
                        "form": "WWWDW",
                        "all": { "played": 38, "win": 28, "draw": 5, "lose": 5,
                                 "goals": { "for": 89, "against": 44 } }
                    },
                    {
                        "rank": 2,
                        "team": { "id": 42, "name": "Arsenal" },
                        "points": 84,
                        "goalsDiff": 42,
                        "form": "WWDWW",
                        "all": { "played": 38, "win": 26, "draw": 6, "lose": 6,
                                 "goals": { "for": 88, "against": 46 } }
                    },
                    {
                        "rank": 3,
                        "team": { "id": 999, "name": "Unknown FC" },
                        "points": 70
                    }
                ]]
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_composite_key_upsert_and_skip() {
        let mirror = Mirror::connect("sqlite::memory:").await.unwrap();
        let league_id = seed(&mirror).await;

        let outcome =
            reconcile(&mirror, league_id, 2023, &[standings_payload(89)]).await.unwrap();
        assert_eq!(outcome.processed, 2);
        assert_eq!(outcome.skipped, 1);

        // Second sync with a new points total updates in place.
        reconcile(&mirror, league_id, 2023, &[standings_payload(91)]).await.unwrap();

        let rows = sqlx::query(
            "SELECT points, goals_for FROM standings WHERE season = 2023 ORDER BY rank",
        )
        .fetch_all(mirror.pool())
        .await
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get::<Option<i64>, _>(0), Some(91));
        assert_eq!(rows[0].get::<Option<i64>, _>(1), Some(89));
    }

    #[tokio::test]
    async fn test_same_team_distinct_seasons() {
        let mirror = Mirror::connect("sqlite::memory:").await.unwrap();
        let league_id = seed(&mirror).await;

        reconcile(&mirror, league_id, 2022, &[standings_payload(93)]).await.unwrap();
        reconcile(&mirror, league_id, 2023, &[standings_payload(89)]).await.unwrap();

        let count = sqlx::query("SELECT count(*) FROM standings")
            .fetch_one(mirror.pool())
            .await
            .unwrap();
        assert_eq!(count.get::<i64, _>(0), 4);
    }
}
