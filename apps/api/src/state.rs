use std::sync::Arc;

use crate::config::Config;
use crate::interview::catalog::ItemCatalog;
use crate::interview::extractor::{CandidateExtractor, Interviewer};
use crate::interview::fixed::FixedInterviewStore;
use crate::interview::orchestrator::TurnLocks;
use crate::interview::store::AnswerRecordStore;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Everything the interview core depends on is constructed once in `main` and
/// passed in here; there is no process-global state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub catalog: Arc<ItemCatalog>,
    /// Postgres when `DATABASE_URL` is set, in-memory otherwise.
    pub store: Arc<dyn AnswerRecordStore>,
    /// Same backend as `store`; progress and dialog of the fixed-question mode.
    pub fixed_store: Arc<dyn FixedInterviewStore>,
    pub extractor: Arc<dyn CandidateExtractor>,
    pub interviewer: Arc<dyn Interviewer>,
    pub turn_locks: TurnLocks,
}
