//! Live refresh path.
//!
//! Narrower sibling of the full fixture sync: takes the same upstream
//! fixture shape, resolves league and both teams strictly (a live refresh
//! must never pollute the mirror with stub rows), and on UPDATE touches
//! only the live column set — status and scores. Date, venue, round and
//! referee are full-sync concerns and survive a live pass untouched.
//! Unknown fixtures are inserted with the full column set.

use tracing::warn;

use super::fixtures::INSERT_FIXTURE_SQL;
use super::{resolver, BatchOutcome};
use crate::error::SyncError;
use crate::store::Mirror;
use crate::types::{flatten_scores, FixturePayload};

/// Live column set: status plus the ten score columns, nothing else.
pub(crate) const UPDATE_FIXTURE_LIVE_SQL: &str = "UPDATE fixtures SET \
     status = ?1, home_score = ?2, away_score = ?3, \
     halftime_home_score = ?4, halftime_away_score = ?5, \
     fulltime_home_score = ?6, fulltime_away_score = ?7, \
     extratime_home_score = ?8, extratime_away_score = ?9, \
     penalty_home_score = ?10, penalty_away_score = ?11, \
     updated_at = datetime('now') \
     WHERE fixture_id = ?12";

pub async fn reconcile(
    store: &Mirror,
    batch: &[FixturePayload],
) -> Result<BatchOutcome, SyncError> {
    let mut tx = store.begin().await?;
    let mut outcome = BatchOutcome::default();

    for payload in batch {
        let Some(league_id) =
            resolver::league_id_by_upstream(&mut *tx, payload.league.id).await?
        else {
            warn!(
                fixture = payload.fixture.id,
                league = payload.league.id,
                "Skipping live fixture for unknown league"
            );
            outcome.skipped += 1;
            continue;
        };

        let home = resolver::team_id_by_upstream(&mut *tx, payload.teams.home.id).await?;
        let away = resolver::team_id_by_upstream(&mut *tx, payload.teams.away.id).await?;
        let (Some(home_team_id), Some(away_team_id)) = (home, away) else {
            warn!(
                fixture = payload.fixture.id,
                home = payload.teams.home.id,
                away = payload.teams.away.id,
                "Skipping live fixture with unresolved team reference"
            );
            outcome.skipped += 1;
            continue;
        };

        let scores = flatten_scores(&payload.goals, &payload.score);

        match resolver::fixture_id_by_upstream(&mut *tx, payload.fixture.id).await? {
            Some(fixture_id) => {
                sqlx::query(UPDATE_FIXTURE_LIVE_SQL)
                    .bind(payload.fixture.status_code())
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
                // First sighting during live play: the season comes from the
                // payload rather than a caller parameter.
                sqlx::query(INSERT_FIXTURE_SQL)
                    .bind(payload.fixture.id)
                    .bind(league_id)
                    .bind(home_team_id)
                    .bind(away_team_id)
                    .bind(payload.fixture.kickoff())
                    .bind(payload.fixture.status_code())
                    .bind(payload.league.round.as_deref())
                    .bind(payload.league.season)
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
