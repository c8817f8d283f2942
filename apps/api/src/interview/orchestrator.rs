//! Dialogue Orchestrator. Runs one conversational turn end to end:
//! extract → sanitize → reconcile → persist → evaluate → reply.
//!
//! Turns for the same user id are serialized through `TurnLocks` inside this
//! process. Across processes the store's last-writer-wins `replace` decides.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::interview::completion::{evaluate, render_summary, Severity, SummaryItem};
use crate::interview::extractor::TurnContext;
use crate::interview::models::Slot;
use crate::interview::reconcile::reconcile;
use crate::interview::sanitizer::sanitize;
use crate::state::AppState;

pub const DEFAULT_USER_ID: &str = "default_user";
pub const HISTORY_SEPARATOR: &str = "|";

/// Per-user async locks. Entries nobody holds or waits on are pruned on the
/// next acquire.
#[derive(Clone, Default)]
pub struct TurnLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl TurnLocks {
    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().await;
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks.entry(user_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub message: Option<String>,
    pub user_id: Option<String>,
    /// Previous utterances joined with `|`, as returned by the last turn.
    #[serde(default)]
    pub conversation_history: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub response: String,
    pub conversation_history: String,
    pub complete: bool,
    /// Items whose slot changed this turn.
    pub updated_items: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_items: Option<Vec<SummaryItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<Vec<Slot>>,
}

pub async fn run_turn(state: &AppState, request: TurnRequest) -> Result<TurnResponse, AppError> {
    let message = request
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::Validation("No message provided".to_string()))?
        .to_string();
    let user_id = resolve_user_id(request.user_id);

    let _turn = state.turn_locks.acquire(&user_id).await;

    let mut history = split_history(request.conversation_history.as_deref().unwrap_or_default());
    history.push(message.clone());
    let context = history.join(HISTORY_SEPARATOR);

    let record = state.store.get_or_create(&user_id).await?;
    let answered = record.answered_items();
    let unanswered = record.unanswered_items();

    let raw = state
        .extractor
        .extract(&TurnContext {
            context: &context,
            latest_input: &message,
            unanswered: &unanswered,
            answered: &answered,
            slots: &record.slots,
        })
        .await
        .unwrap_or_else(|e| {
            warn!("Candidate extraction failed for user {user_id}, continuing without updates: {e}");
            String::new()
        });

    let now = Utc::now();
    let candidates = sanitize(&raw, now);
    let merged = reconcile(record, &candidates, &state.catalog, now);
    if merged.changed {
        state.store.replace(&user_id, &merged.record).await?;
    }
    let record = merged.record;
    let evaluation = evaluate(&record, &state.catalog, None);

    info!(
        "Turn for user {user_id}: candidates={} skipped={} changed={:?} answered={}/{} complete={}",
        candidates.len(),
        merged.skipped,
        merged.changed_items,
        evaluation.answered_count,
        evaluation.item_count,
        evaluation.complete
    );

    if evaluation.complete {
        let summary_items = evaluation.summary.unwrap_or_default();
        let summary = render_summary(&summary_items);
        let response = closing_message(&summary);
        history.push(response.clone());
        trim_history(&mut history, state.config.history_window);

        return Ok(TurnResponse {
            response,
            conversation_history: history.join(HISTORY_SEPARATOR),
            complete: true,
            updated_items: merged.changed_items,
            summary: Some(summary),
            summary_items: Some(summary_items),
            total_score: evaluation.total_score,
            severity: evaluation.severity,
            slots: Some(record.slots),
        });
    }

    // Ask from the merged state so an item answered this turn is not asked again.
    let answered = record.answered_items();
    let unanswered = record.unanswered_items();
    let reply = state
        .interviewer
        .reply(&TurnContext {
            context: &context,
            latest_input: &message,
            unanswered: &unanswered,
            answered: &answered,
            slots: &record.slots,
        })
        .await?;

    history.push(reply.clone());
    trim_history(&mut history, state.config.history_window);

    Ok(TurnResponse {
        response: reply,
        conversation_history: history.join(HISTORY_SEPARATOR),
        complete: false,
        updated_items: merged.changed_items,
        summary: None,
        summary_items: None,
        total_score: None,
        severity: None,
        slots: None,
    })
}

/// Trimmed user id, or `DEFAULT_USER_ID` when none was sent.
pub fn resolve_user_id(user_id: Option<String>) -> String {
    user_id
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string())
}

pub fn split_history(raw: &str) -> Vec<String> {
    raw.split(HISTORY_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Keeps only the newest `window` utterances.
pub fn trim_history(history: &mut Vec<String>, window: usize) {
    if history.len() > window {
        history.drain(..history.len() - window);
    }
}

fn closing_message(summary: &str) -> String {
    format!(
        "PHQ-9 모든 문항에 답해 주셔서 고맙습니다.\n\
         지금까지 들려주신 응답을 정리해 드릴게요:\n\n\
         {summary}\n\n\
         이야기를 나눠 주셔서 감사해요."
    )
}
