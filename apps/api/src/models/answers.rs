use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::interview::models::Slot;

#[derive(Debug, Clone, FromRow)]
pub struct AnswerRecordRow {
    pub user_id: String,
    pub slots: Json<Vec<Slot>>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// One user-edited answer, as submitted from the summary screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditedAnswer {
    pub item: String,
    pub edited_answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EditedAnswersRow {
    pub id: Uuid,
    pub user_id: String,
    pub edited_items: Json<Vec<EditedAnswer>>,
    pub saved_at: DateTime<Utc>,
}
