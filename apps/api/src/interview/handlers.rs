use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::interview::completion::{evaluate, Evaluation};
use crate::interview::edits::{
    submit_edits, summarize, EditSubmission, EditSubmissionResponse, SummaryRequest,
    SummaryResponse,
};
use crate::interview::fixed::{
    run_fixed_turn, DialogMessage, FixedTurnRequest, FixedTurnResponse,
};
use crate::interview::models::AnswerRecord;
use crate::interview::orchestrator::{resolve_user_id, run_turn, TurnRequest, TurnResponse};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Option<String>,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    pub record: AnswerRecord,
    pub evaluation: Evaluation,
}

/// POST /api/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    Ok(Json(run_turn(&state, req).await?))
}

/// GET /api/slots
pub async fn handle_get_slots(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    let user_id = resolve_user_id(params.user_id);
    let record = state.store.get_or_create(&user_id).await?;
    let evaluation = evaluate(&record, &state.catalog, None);
    Ok(Json(SlotsResponse { record, evaluation }))
}

/// POST /api/summary
pub async fn handle_summary(
    State(state): State<AppState>,
    Json(req): Json<SummaryRequest>,
) -> Result<Json<SummaryResponse>, AppError> {
    Ok(Json(summarize(&state, req).await?))
}

/// POST /api/summary/edit
pub async fn handle_summary_edit(
    State(state): State<AppState>,
    Json(req): Json<EditSubmission>,
) -> Result<Json<EditSubmissionResponse>, AppError> {
    Ok(Json(submit_edits(&state, req).await?))
}

/// POST /api/phq9_fixed
pub async fn handle_fixed_turn(
    State(state): State<AppState>,
    Json(req): Json<FixedTurnRequest>,
) -> Result<Json<FixedTurnResponse>, AppError> {
    Ok(Json(run_fixed_turn(&state, req).await?))
}

/// GET /api/phq9_fixed/dialog
pub async fn handle_fixed_dialog(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<DialogMessage>>, AppError> {
    let user_id = resolve_user_id(params.user_id);
    Ok(Json(state.fixed_store.dialog(&user_id).await?))
}
