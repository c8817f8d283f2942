use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::interview::fixed::{DialogMessage, FixedProgress, Sender};

#[derive(Debug, Clone, FromRow)]
pub struct FixedProgressRow {
    pub user_id: String,
    pub started: bool,
    pub current_index: i32,
    pub last_updated: Option<DateTime<Utc>>,
}

impl From<FixedProgressRow> for FixedProgress {
    fn from(row: FixedProgressRow) -> Self {
        Self {
            user_id: row.user_id,
            started: row.started,
            current_index: usize::try_from(row.current_index).unwrap_or(0),
            last_updated: row.last_updated,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DialogMessageRow {
    pub sender: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl From<DialogMessageRow> for DialogMessage {
    fn from(row: DialogMessageRow) -> Self {
        Self {
            sender: Sender::from_db(&row.sender),
            text: row.text,
            timestamp: row.sent_at,
        }
    }
}
