//! Country reconciliation.
//!
//! Countries have no upstream id; the name is the natural key. A record
//! already in the mirror gets its mutable fields (code, flag) overwritten
//! with the latest upstream values, which also enriches any stub row a
//! previous league sync left behind.

use tracing::warn;

use super::{resolver, BatchOutcome};
use crate::error::SyncError;
use crate::store::Mirror;
use crate::types::CountryPayload;

pub async fn reconcile(
    store: &Mirror,
    batch: &[CountryPayload],
) -> Result<BatchOutcome, SyncError> {
    let mut tx = store.begin().await?;
    let mut outcome = BatchOutcome::default();

    for country in batch {
        let Some(name) = country.name.as_deref().filter(|n| !n.is_empty()) else {
            warn!("Skipping country record without a name");
            outcome.skipped += 1;
            continue;
        };

        match resolver::country_id_by_name(&mut *tx, name).await? {
            Some(country_id) => {
                sqlx::query(
                    "UPDATE countries SET code = ?1, flag_url = ?2, \
                     updated_at = datetime('now') WHERE country_id = ?3",
                )
                .bind(country.code.as_deref())
                .bind(country.flag_url())
                .bind(country_id)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query("INSERT INTO countries (name, code, flag_url) VALUES (?1, ?2, ?3)")
                    .bind(name)
                    .bind(country.code.as_deref())
                    .bind(country.flag_url())
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
