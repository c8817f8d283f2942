//! Answer Record Store: one record per user id, read then replaced per turn.
//!
//! `replace` is a whole-record upsert: concurrent turns for the same user are
//! last-writer-wins. The orchestrator serializes turns per user within one
//! process; nothing here adds finer-grained locking.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::interview::catalog::ItemCatalog;
use crate::interview::fixed::{DialogMessage, FixedInterviewStore, FixedProgress};
use crate::interview::models::AnswerRecord;
use crate::models::answers::{AnswerRecordRow, EditedAnswer, EditedAnswersRow};
use crate::models::fixed::{DialogMessageRow, FixedProgressRow};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A saved batch of edited answers.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EditedAnswers {
    pub id: Uuid,
    pub user_id: String,
    pub edited_items: Vec<EditedAnswer>,
    pub saved_at: DateTime<Utc>,
}

impl EditedAnswers {
    /// Item → edited answer; later entries for the same item win.
    pub fn as_map(&self) -> HashMap<String, String> {
        self.edited_items
            .iter()
            .map(|e| (e.item.clone(), e.edited_answer.clone()))
            .collect()
    }
}

impl From<EditedAnswersRow> for EditedAnswers {
    fn from(row: EditedAnswersRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            edited_items: row.edited_items.0,
            saved_at: row.saved_at,
        }
    }
}

#[async_trait]
pub trait AnswerRecordStore: Send + Sync {
    /// Returns the user's record, creating the all-unanswered one on first use.
    async fn get_or_create(&self, user_id: &str) -> Result<AnswerRecord, StoreError>;

    /// Overwrites the user's record atomically.
    async fn replace(&self, user_id: &str, record: &AnswerRecord) -> Result<(), StoreError>;

    /// Persists a batch of edited answers. The answer record is not touched.
    async fn save_edits(
        &self,
        user_id: &str,
        edits: Vec<EditedAnswer>,
    ) -> Result<EditedAnswers, StoreError>;

    /// Most recently saved edit batch for the user, if any.
    async fn latest_edits(&self, user_id: &str) -> Result<Option<EditedAnswers>, StoreError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

pub struct PgAnswerStore {
    pool: PgPool,
    catalog: Arc<ItemCatalog>,
}

impl PgAnswerStore {
    pub fn new(pool: PgPool, catalog: Arc<ItemCatalog>) -> Self {
        Self { pool, catalog }
    }
}

#[async_trait]
impl AnswerRecordStore for PgAnswerStore {
    async fn get_or_create(&self, user_id: &str) -> Result<AnswerRecord, StoreError> {
        let fresh = AnswerRecord::new(user_id, &self.catalog);
        let inserted = sqlx::query(
            r#"
            INSERT INTO answer_records (user_id, slots, last_updated)
            VALUES ($1, $2, NULL)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(Json(&fresh.slots))
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            info!("Created answer record for user {user_id}");
            return Ok(fresh);
        }

        let row: AnswerRecordRow = sqlx::query_as(
            "SELECT user_id, slots, last_updated FROM answer_records WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let mut record = AnswerRecord {
            user_id: row.user_id,
            slots: row.slots.0,
            last_updated: row.last_updated,
        };
        if record.conform_to(&self.catalog) {
            warn!("Stored record for user {user_id} did not match the item catalog; repaired");
        }
        Ok(record)
    }

    async fn replace(&self, user_id: &str, record: &AnswerRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO answer_records (user_id, slots, last_updated)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET slots = EXCLUDED.slots, last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(user_id)
        .bind(Json(&record.slots))
        .bind(record.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_edits(
        &self,
        user_id: &str,
        edits: Vec<EditedAnswer>,
    ) -> Result<EditedAnswers, StoreError> {
        let saved = EditedAnswers {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            edited_items: edits,
            saved_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO edited_answers (id, user_id, edited_items, saved_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(saved.id)
        .bind(&saved.user_id)
        .bind(Json(&saved.edited_items))
        .bind(saved.saved_at)
        .execute(&self.pool)
        .await?;

        info!(
            "Saved {} edited answer(s) for user {user_id} as {}",
            saved.edited_items.len(),
            saved.id
        );
        Ok(saved)
    }

    async fn latest_edits(&self, user_id: &str) -> Result<Option<EditedAnswers>, StoreError> {
        let row: Option<EditedAnswersRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, edited_items, saved_at
            FROM edited_answers
            WHERE user_id = $1
            ORDER BY saved_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(EditedAnswers::from))
    }
}

#[async_trait]
impl FixedInterviewStore for PgAnswerStore {
    async fn get_or_create_progress(&self, user_id: &str) -> Result<FixedProgress, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO fixed_progress (user_id, started, current_index, last_updated)
            VALUES ($1, FALSE, 0, NULL)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        let row: FixedProgressRow = sqlx::query_as(
            "SELECT user_id, started, current_index, last_updated FROM fixed_progress WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn save_progress(&self, progress: &FixedProgress) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO fixed_progress (user_id, started, current_index, last_updated)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id)
            DO UPDATE SET started = EXCLUDED.started,
                          current_index = EXCLUDED.current_index,
                          last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(&progress.user_id)
        .bind(progress.started)
        .bind(i32::try_from(progress.current_index).unwrap_or(i32::MAX))
        .bind(progress.last_updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_messages(
        &self,
        user_id: &str,
        messages: &[DialogMessage],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for message in messages {
            sqlx::query(
                "INSERT INTO fixed_dialog_messages (user_id, sender, text, sent_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(user_id)
            .bind(message.sender.as_str())
            .bind(&message.text)
            .bind(message.timestamp)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn dialog(&self, user_id: &str) -> Result<Vec<DialogMessage>, StoreError> {
        let rows: Vec<DialogMessageRow> = sqlx::query_as(
            "SELECT sender, text, sent_at FROM fixed_dialog_messages WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(DialogMessage::from).collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

/// Process-local store, used when no `DATABASE_URL` is configured and in tests.
pub struct InMemoryAnswerStore {
    catalog: Arc<ItemCatalog>,
    records: RwLock<HashMap<String, AnswerRecord>>,
    edits: RwLock<HashMap<String, Vec<EditedAnswers>>>,
    progress: RwLock<HashMap<String, FixedProgress>>,
    dialogs: RwLock<HashMap<String, Vec<DialogMessage>>>,
}

impl InMemoryAnswerStore {
    pub fn new(catalog: Arc<ItemCatalog>) -> Self {
        Self {
            catalog,
            records: RwLock::new(HashMap::new()),
            edits: RwLock::new(HashMap::new()),
            progress: RwLock::new(HashMap::new()),
            dialogs: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl AnswerRecordStore for InMemoryAnswerStore {
    async fn get_or_create(&self, user_id: &str) -> Result<AnswerRecord, StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .entry(user_id.to_string())
            .or_insert_with(|| AnswerRecord::new(user_id, &self.catalog));
        if record.conform_to(&self.catalog) {
            warn!("Stored record for user {user_id} did not match the item catalog; repaired");
        }
        Ok(record.clone())
    }

    async fn replace(&self, user_id: &str, record: &AnswerRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(user_id.to_string(), record.clone());
        Ok(())
    }

    async fn save_edits(
        &self,
        user_id: &str,
        edits: Vec<EditedAnswer>,
    ) -> Result<EditedAnswers, StoreError> {
        let saved = EditedAnswers {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            edited_items: edits,
            saved_at: Utc::now(),
        };
        self.edits
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(saved.clone());
        Ok(saved)
    }

    async fn latest_edits(&self, user_id: &str) -> Result<Option<EditedAnswers>, StoreError> {
        Ok(self
            .edits
            .read()
            .await
            .get(user_id)
            .and_then(|batches| batches.last().cloned()))
    }
}

#[async_trait]
impl FixedInterviewStore for InMemoryAnswerStore {
    async fn get_or_create_progress(&self, user_id: &str) -> Result<FixedProgress, StoreError> {
        Ok(self
            .progress
            .write()
            .await
            .entry(user_id.to_string())
            .or_insert_with(|| FixedProgress::new(user_id))
            .clone())
    }

    async fn save_progress(&self, progress: &FixedProgress) -> Result<(), StoreError> {
        self.progress
            .write()
            .await
            .insert(progress.user_id.clone(), progress.clone());
        Ok(())
    }

    async fn append_messages(
        &self,
        user_id: &str,
        messages: &[DialogMessage],
    ) -> Result<(), StoreError> {
        self.dialogs
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }

    async fn dialog(&self, user_id: &str) -> Result<Vec<DialogMessage>, StoreError> {
        Ok(self
            .dialogs
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}
