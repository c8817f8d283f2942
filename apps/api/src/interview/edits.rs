//! Edited answers: users may reword their answers on the summary screen.
//!
//! Edits are stored on their own and only ever substituted into a summary at
//! read time; the answer record, and therefore scoring, never changes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::catalog::ItemCatalog;
use crate::interview::completion::{build_summary, evaluate, render_summary, Evaluation, SummaryItem};
use crate::interview::orchestrator::resolve_user_id;
use crate::models::answers::EditedAnswer;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EditedItemInput {
    pub item: Option<String>,
    pub edited_answer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditSubmission {
    pub user_id: Option<String>,
    pub edited_items: Option<Vec<EditedItemInput>>,
}

#[derive(Debug, Serialize)]
pub struct EditSubmissionResponse {
    pub edited_id: Uuid,
    pub count: usize,
    pub summary: String,
    pub summary_items: Vec<SummaryItem>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub user_id: Option<String>,
    /// Explicit edits; when absent the most recently saved batch is applied.
    pub edits: Option<Vec<EditedAnswer>>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub evaluation: Evaluation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Validates submitted edits: every entry needs a catalog item, and a missing
/// answer is stored as an empty string.
pub fn clean_edits(
    catalog: &ItemCatalog,
    items: Option<Vec<EditedItemInput>>,
) -> Result<Vec<EditedAnswer>, AppError> {
    let items =
        items.ok_or_else(|| AppError::Validation("edited_items must be a list".to_string()))?;

    items
        .into_iter()
        .enumerate()
        .map(|(idx, input)| {
            let item = input
                .item
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .ok_or_else(|| AppError::Validation(format!("edited_items[{idx}] missing item")))?;
            if !catalog.contains(&item) {
                return Err(AppError::Validation(format!(
                    "edited_items[{idx}] unknown item '{item}'"
                )));
            }
            Ok(EditedAnswer {
                item,
                edited_answer: input.edited_answer.unwrap_or_default(),
            })
        })
        .collect()
}

pub async fn submit_edits(
    state: &AppState,
    submission: EditSubmission,
) -> Result<EditSubmissionResponse, AppError> {
    let user_id = resolve_user_id(submission.user_id);
    let edits = clean_edits(&state.catalog, submission.edited_items)?;

    let saved = state.store.save_edits(&user_id, edits).await?;
    let record = state.store.get_or_create(&user_id).await?;
    let summary_items = build_summary(&record, &state.catalog, Some(&saved.as_map()));

    Ok(EditSubmissionResponse {
        edited_id: saved.id,
        count: saved.edited_items.len(),
        summary: render_summary(&summary_items),
        summary_items,
    })
}

pub async fn summarize(state: &AppState, request: SummaryRequest) -> Result<SummaryResponse, AppError> {
    let user_id = resolve_user_id(request.user_id);
    let record = state.store.get_or_create(&user_id).await?;

    let edits: Option<HashMap<String, String>> = match request.edits {
        Some(edits) => Some(
            edits
                .into_iter()
                .map(|e| (e.item, e.edited_answer))
                .collect(),
        ),
        None => state
            .store
            .latest_edits(&user_id)
            .await?
            .map(|saved| saved.as_map()),
    };

    let evaluation = evaluate(&record, &state.catalog, edits.as_ref());
    let summary = evaluation.summary.as_deref().map(render_summary);
    Ok(SummaryResponse {
        evaluation,
        summary,
    })
}
