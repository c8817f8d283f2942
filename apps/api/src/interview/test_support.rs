//! Scripted collaborators and state wiring for orchestrator and handler tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::Config;
use crate::interview::catalog::ItemCatalog;
use crate::interview::extractor::{CandidateExtractor, Interviewer, TurnContext};
use crate::interview::orchestrator::TurnLocks;
use crate::interview::store::InMemoryAnswerStore;
use crate::llm_client::LlmError;
use crate::state::AppState;

/// Returns queued outputs in order; `None` simulates a failed call. An empty
/// queue yields empty text.
pub struct ScriptedExtractor {
    outputs: Mutex<VecDeque<Option<String>>>,
}

impl ScriptedExtractor {
    pub fn new(outputs: Vec<Option<String>>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into()),
        }
    }
}

#[async_trait]
impl CandidateExtractor for ScriptedExtractor {
    async fn extract(&self, _turn: &TurnContext<'_>) -> Result<String, LlmError> {
        match self.outputs.lock().unwrap().pop_front() {
            Some(Some(text)) => Ok(text),
            Some(None) => Err(LlmError::EmptyContent),
            None => Ok(String::new()),
        }
    }
}

/// Returns queued replies in order and records the unanswered list it was shown.
pub struct ScriptedInterviewer {
    replies: Mutex<VecDeque<String>>,
    seen: Mutex<Vec<Vec<String>>>,
}

impl ScriptedInterviewer {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen_unanswered(&self) -> Vec<Vec<String>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Interviewer for ScriptedInterviewer {
    async fn reply(&self, turn: &TurnContext<'_>) -> Result<String, LlmError> {
        self.seen.lock().unwrap().push(turn.unanswered.to_vec());
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "최근 2주간 어떠셨나요?".to_string()))
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        anthropic_api_key: "test-key".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        cors_origin: None,
        history_window: 6,
    }
}

pub fn test_state(
    extractor_outputs: Vec<Option<String>>,
    replies: Vec<&str>,
) -> (AppState, Arc<ScriptedExtractor>, Arc<ScriptedInterviewer>) {
    let catalog = Arc::new(ItemCatalog::phq9());
    let store = Arc::new(InMemoryAnswerStore::new(catalog.clone()));
    let extractor = Arc::new(ScriptedExtractor::new(extractor_outputs));
    let interviewer = Arc::new(ScriptedInterviewer::new(replies));
    let state = AppState {
        config: test_config(),
        catalog,
        store: store.clone(),
        fixed_store: store,
        extractor: extractor.clone(),
        interviewer: interviewer.clone(),
        turn_locks: TurnLocks::default(),
    };
    (state, extractor, interviewer)
}

/// A fully-specified "answered" candidate object as the extractor would emit it.
pub fn answered_json(item: &str, score: u8, freq: &str) -> String {
    serde_json::json!({
        "item": item,
        "status": "answered",
        "score": score,
        "raw_user_input": format!("{item}: {freq}"),
        "freq_or_intensity": freq,
        "last_updated": null,
    })
    .to_string()
}
