//! Team reconciliation.
//!
//! Natural key: the upstream team id. The country reference is a plain
//! lookup by name — teams never stub-create countries, a miss just leaves
//! the reference NULL. Each processed team is also recorded in the
//! `league_teams` join for the (league, season) being synced.

use super::{resolver, BatchOutcome};
use crate::error::SyncError;
use crate::store::Mirror;
use crate::types::TeamPayload;

pub async fn reconcile(
    store: &Mirror,
    league_id: i64,
    season: i64,
    batch: &[TeamPayload],
) -> Result<BatchOutcome, SyncError> {
    let mut tx = store.begin().await?;
    let mut outcome = BatchOutcome::default();

    for payload in batch {
        let country_id = match payload.team.country.as_deref() {
            Some(name) if !name.is_empty() => {
                resolver::country_id_by_name(&mut *tx, name).await?
            }
            _ => None,
        };

        let venue = payload.venue.clone().unwrap_or_default();

        let team_id = match resolver::team_id_by_upstream(&mut *tx, payload.team.id).await? {
            Some(team_id) => {
                sqlx::query(
                    "UPDATE teams SET name = ?1, logo_url = ?2, founded = ?3, \
                     venue_name = ?4, venue_capacity = ?5, venue_city = ?6, \
                     updated_at = datetime('now') WHERE team_id = ?7",
                )
                .bind(&payload.team.name)
                .bind(payload.team.logo.as_deref())
                .bind(payload.team.founded)
                .bind(venue.name.as_deref())
                .bind(venue.capacity)
                .bind(venue.city.as_deref())
                .bind(team_id)
                .execute(&mut *tx)
                .await?;
                team_id
            }
            None => {
                let result = sqlx::query(
                    "INSERT INTO teams (api_team_id, name, country_id, logo_url, founded, \
                     venue_name, venue_capacity, venue_city) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .bind(payload.team.id)
                .bind(&payload.team.name)
                .bind(country_id)
                .bind(payload.team.logo.as_deref())
                .bind(payload.team.founded)
                .bind(venue.name.as_deref())
                .bind(venue.capacity)
                .bind(venue.city.as_deref())
                .execute(&mut *tx)
                .await?;
                result.last_insert_rowid()
            }
        };

        // Membership join: insert-if-absent, nothing to update on re-sync.
        sqlx::query(
            "INSERT INTO league_teams (league_id, team_id, season) \
             SELECT ?1, ?2, ?3 WHERE NOT EXISTS \
             (SELECT 1 FROM league_teams WHERE league_id = ?1 AND team_id = ?2 AND season = ?3)",
        )
        .bind(league_id)
        .bind(team_id)
        .bind(season)
        .execute(&mut *tx)
        .await?;

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
    use serde_json::json;
    use sqlx::Row;

    fn team_payload(id: i64, name: &str) -> TeamPayload {
        serde_json::from_value(json!({
            "team": { "id": id, "name": name, "country": "England", "founded": 1886,
                      "logo": "https://x/t.png" },
            "venue": { "name": "Emirates Stadium", "capacity": 60383, "city": "London" }
        }))
        .unwrap()
    }

    async fn seed_league(mirror: &Mirror) -> i64 {
        let result = sqlx::query(
            "INSERT INTO leagues (api_league_id, name) VALUES (39, 'Premier League')",
        )
        .execute(mirror.pool())
        .await
        .unwrap();
        result.last_insert_rowid()
    }

    #[tokio::test]
    async fn test_membership_recorded_once() {
        let mirror = Mirror::connect("sqlite::memory:").await.unwrap();
        let league_id = seed_league(&mirror).await;

        let batch = vec![team_payload(42, "Arsenal")];
        reconcile(&mirror, league_id, 2023, &batch).await.unwrap();
        reconcile(&mirror, league_id, 2023, &batch).await.unwrap();

        let memberships = sqlx::query("SELECT count(*) FROM league_teams")
            .fetch_one(mirror.pool())
            .await
            .unwrap();
        assert_eq!(memberships.get::<i64, _>(0), 1);

        // A different season is a distinct membership.
        reconcile(&mirror, league_id, 2024, &batch).await.unwrap();
        let memberships = sqlx::query("SELECT count(*) FROM league_teams")
            .fetch_one(mirror.pool())
            .await
            .unwrap();
        assert_eq!(memberships.get::<i64, _>(0), 2);
    }

    #[tokio::test]
    async fn test_update_keeps_country_reference() {
        let mirror = Mirror::connect("sqlite::memory:").await.unwrap();
        let league_id = seed_league(&mirror).await;
        sqlx::query("INSERT INTO countries (name, code) VALUES ('England', 'GB')")
            .execute(mirror.pool())
            .await
            .unwrap();

        reconcile(&mirror, league_id, 2023, &[team_payload(42, "Arsenal")])
            .await
            .unwrap();

        // Re-sync with an unknown country name: lookup misses, but the
        // resolved reference chosen at insert time is left alone.
        let mut changed = team_payload(42, "Arsenal FC");
        changed.team.country = Some("Unknownland".into());
        reconcile(&mirror, league_id, 2023, &[changed]).await.unwrap();

        let row = sqlx::query("SELECT name, country_id FROM teams WHERE api_team_id = 42")
            .fetch_one(mirror.pool())
            .await
            .unwrap();
        assert_eq!(row.get::<String, _>(0), "Arsenal FC");
        assert_eq!(row.get::<Option<i64>, _>(1), Some(1));
    }
}
