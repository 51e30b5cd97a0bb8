//! `PostgreSQL` implementation of the `ProgressRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::{debug, warn};
use uuid::Uuid;

use escapade_core::error::EngineError;
use escapade_core::model::{CollectedItem, PlayerProgress};
use escapade_core::repository::ProgressRepository;

use crate::schema::PROGRESS_COLUMNS;
use crate::{infrastructure, is_unique_violation};

/// PostgreSQL-backed player progress store with optimistic concurrency.
#[derive(Debug, Clone)]
pub struct PgProgressRepository {
    pool: PgPool,
}

impl PgProgressRepository {
    /// Creates a new `PgProgressRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn hydrate(
        &self,
        row: Option<ProgressRow>,
    ) -> Result<Option<PlayerProgress>, EngineError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let items: Vec<ItemRow> = sqlx::query_as(
            r"
            SELECT item_id, collected_at
            FROM player_progress_items
            WHERE progress_id = $1
            ORDER BY collected_at, item_id
            ",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))?;
        Ok(Some(row.into_progress(items)))
    }
}

#[derive(Debug, FromRow)]
struct ProgressRow {
    id: Uuid,
    phone_number: String,
    project_id: Uuid,
    current_scene_id: Uuid,
    attempts_remaining: i32,
    last_interaction_at: DateTime<Utc>,
    version: i64,
}

impl ProgressRow {
    fn into_progress(self, items: Vec<ItemRow>) -> PlayerProgress {
        PlayerProgress {
            id: self.id,
            phone_number: self.phone_number,
            project_id: self.project_id,
            current_scene_id: self.current_scene_id,
            attempts_remaining: u32::try_from(self.attempts_remaining).unwrap_or(0),
            collected_items: items
                .into_iter()
                .map(|item| CollectedItem {
                    item_id: item.item_id,
                    collected_at: item.collected_at,
                })
                .collect(),
            last_interaction_at: self.last_interaction_at,
            version: self.version,
        }
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    item_id: Uuid,
    collected_at: DateTime<Utc>,
}

fn attempts_column(progress: &PlayerProgress) -> i32 {
    i32::try_from(progress.attempts_remaining).unwrap_or(i32::MAX)
}

/// Inserts collected items, skipping those already stored. Returns the
/// number of rows written.
async fn insert_items(
    conn: &mut PgConnection,
    progress_id: Uuid,
    items: &[CollectedItem],
) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;
    for item in items {
        inserted += sqlx::query(
            r"
            INSERT INTO player_progress_items (progress_id, item_id, collected_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (progress_id, item_id) DO NOTHING
            ",
        )
        .bind(progress_id)
        .bind(item.item_id)
        .bind(item.collected_at)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    }
    Ok(inserted)
}

#[async_trait]
impl ProgressRepository for PgProgressRepository {
    async fn find(
        &self,
        phone_number: &str,
        project_id: Uuid,
    ) -> Result<Option<PlayerProgress>, EngineError> {
        let row: Option<ProgressRow> = sqlx::query_as(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM player_progress \
             WHERE phone_number = $1 AND project_id = $2"
        ))
        .bind(phone_number)
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))?;
        self.hydrate(row).await
    }

    async fn find_active(&self, phone_number: &str) -> Result<Option<PlayerProgress>, EngineError> {
        let row: Option<ProgressRow> = sqlx::query_as(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM player_progress \
             WHERE phone_number = $1 \
             ORDER BY last_interaction_at DESC, id \
             LIMIT 1"
        ))
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))?;
        self.hydrate(row).await
    }

    async fn create(&self, progress: &PlayerProgress) -> Result<(), EngineError> {
        let mut tx = self.pool.begin().await.map_err(|e| infrastructure(&e))?;

        // Held until commit: creations for one phone number run one at a time.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&progress.phone_number)
            .execute(&mut *tx)
            .await
            .map_err(|e| infrastructure(&e))?;

        let held: Option<(Uuid,)> = sqlx::query_as(
            r"
            SELECT project_id
            FROM player_progress
            WHERE phone_number = $1
            ORDER BY project_id = $2 DESC
            LIMIT 1
            ",
        )
        .bind(&progress.phone_number)
        .bind(progress.project_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| infrastructure(&e))?;

        match held {
            Some((project_id,)) if project_id == progress.project_id => {
                return Err(EngineError::ProgressAlreadyExists {
                    phone_number: progress.phone_number.clone(),
                    project_id,
                });
            }
            Some((active_project_id,)) => {
                warn!(
                    phone_number = %progress.phone_number,
                    active_project = %active_project_id,
                    requested_project = %progress.project_id,
                    "progress creation refused, sender plays another project"
                );
                return Err(EngineError::SessionConflict {
                    phone_number: progress.phone_number.clone(),
                    active_project_id,
                    requested_project_id: progress.project_id,
                });
            }
            None => {}
        }

        let inserted = sqlx::query(
            r"
            INSERT INTO player_progress
                (id, phone_number, project_id, current_scene_id, attempts_remaining,
                 last_interaction_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(progress.id)
        .bind(&progress.phone_number)
        .bind(progress.project_id)
        .bind(progress.current_scene_id)
        .bind(attempts_column(progress))
        .bind(progress.last_interaction_at)
        .bind(progress.version)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(EngineError::ProgressAlreadyExists {
                    phone_number: progress.phone_number.clone(),
                    project_id: progress.project_id,
                });
            }
            Err(e) => return Err(infrastructure(&e)),
        }

        insert_items(&mut tx, progress.id, &progress.collected_items)
            .await
            .map_err(|e| infrastructure(&e))?;
        tx.commit().await.map_err(|e| infrastructure(&e))?;
        Ok(())
    }

    async fn save(&self, progress: &PlayerProgress) -> Result<i64, EngineError> {
        let mut tx = self.pool.begin().await.map_err(|e| infrastructure(&e))?;

        let updated: Option<(i64,)> = sqlx::query_as(
            r"
            UPDATE player_progress
            SET current_scene_id = $3,
                attempts_remaining = $4,
                last_interaction_at = $5,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING version
            ",
        )
        .bind(progress.id)
        .bind(progress.version)
        .bind(progress.current_scene_id)
        .bind(attempts_column(progress))
        .bind(progress.last_interaction_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| infrastructure(&e))?;

        let Some((new_version,)) = updated else {
            let stored: Option<(i64,)> =
                sqlx::query_as("SELECT version FROM player_progress WHERE id = $1")
                    .bind(progress.id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| infrastructure(&e))?;
            let actual = stored.map_or(-1, |(version,)| version);
            warn!(
                progress_id = %progress.id,
                expected = progress.version,
                actual,
                "progress version conflict"
            );
            return Err(EngineError::ConcurrencyConflict {
                progress_id: progress.id,
                expected: progress.version,
                actual,
            });
        };

        let granted = insert_items(&mut tx, progress.id, &progress.collected_items)
            .await
            .map_err(|e| infrastructure(&e))?;
        tx.commit().await.map_err(|e| infrastructure(&e))?;

        debug!(
            progress_id = %progress.id,
            version = new_version,
            granted,
            "progress saved"
        );
        Ok(new_version)
    }

    async fn delete(&self, progress_id: Uuid) -> Result<(), EngineError> {
        sqlx::query("DELETE FROM player_progress WHERE id = $1")
            .bind(progress_id)
            .execute(&self.pool)
            .await
            .map_err(|e| infrastructure(&e))?;
        Ok(())
    }

    async fn attach_item(
        &self,
        progress_id: Uuid,
        item_id: Uuid,
        collected_at: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        let mut conn = self.pool.acquire().await.map_err(|e| infrastructure(&e))?;
        let inserted = insert_items(
            &mut conn,
            progress_id,
            &[CollectedItem {
                item_id,
                collected_at,
            }],
        )
        .await
        .map_err(|e| infrastructure(&e))?;
        Ok(inserted > 0)
    }
}
