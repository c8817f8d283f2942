//! Candidate Extractor and Interviewer: the two model-backed collaborators of
//! a turn.
//!
//! Both are traits so the orchestrator can run against scripted fakes in
//! tests. `AppState` carries them as `Arc<dyn _>`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::interview::catalog::ItemCatalog;
use crate::interview::models::Slot;
use crate::interview::prompts::{
    EXTRACTOR_PROMPT, EXTRACTOR_SYSTEM, INTERVIEWER_PROMPT, INTERVIEWER_SYSTEM,
};
use crate::llm_client::prompts::{JSON_ARRAY_ONLY, SUPPORTIVE_TONE};
use crate::llm_client::{LlmClient, LlmError};

/// What a collaborator sees of the current turn.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    /// Rolling conversation, utterances joined with `|`.
    pub context: &'a str,
    pub latest_input: &'a str,
    pub unanswered: &'a [String],
    pub answered: &'a [String],
    pub slots: &'a [Slot],
}

/// Produces raw text that may contain candidate update objects. No format
/// guarantee; the output goes through the sanitizer.
#[async_trait]
pub trait CandidateExtractor: Send + Sync {
    async fn extract(&self, turn: &TurnContext<'_>) -> Result<String, LlmError>;
}

/// Produces the next conversational message.
#[async_trait]
pub trait Interviewer: Send + Sync {
    async fn reply(&self, turn: &TurnContext<'_>) -> Result<String, LlmError>;
}

pub struct LlmCandidateExtractor {
    llm: LlmClient,
    catalog: Arc<ItemCatalog>,
}

impl LlmCandidateExtractor {
    pub fn new(llm: LlmClient, catalog: Arc<ItemCatalog>) -> Self {
        Self { llm, catalog }
    }
}

#[async_trait]
impl CandidateExtractor for LlmCandidateExtractor {
    async fn extract(&self, turn: &TurnContext<'_>) -> Result<String, LlmError> {
        let system = format!(
            "{}\n\n{}",
            EXTRACTOR_SYSTEM.replace("{catalog}", &label_list(self.catalog.items())),
            JSON_ARRAY_ONLY
        );
        let slots = serde_json::to_string(turn.slots).unwrap_or_else(|_| "[]".to_string());
        let prompt = EXTRACTOR_PROMPT
            .replace("{context}", turn.context)
            .replace("{latest_input}", turn.latest_input)
            .replace("{slots}", &slots)
            .replace("{answered_items}", &label_list(turn.answered));

        self.llm.call_text(&prompt, &system).await
    }
}

pub struct LlmInterviewer {
    llm: LlmClient,
}

impl LlmInterviewer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Interviewer for LlmInterviewer {
    async fn reply(&self, turn: &TurnContext<'_>) -> Result<String, LlmError> {
        let unanswered = label_list(turn.unanswered);
        let system = format!(
            "{}\n\n{}",
            INTERVIEWER_SYSTEM.replace("{unanswered_items}", &unanswered),
            SUPPORTIVE_TONE
        );
        let prompt = INTERVIEWER_PROMPT
            .replace("{unanswered_items}", &unanswered)
            .replace("{answered_items}", &label_list(turn.answered))
            .replace("{context}", turn.context);

        self.llm.call_text(&prompt, &system).await
    }
}

/// `["a", "b"]` is the shape the model sees item lists in.
fn label_list(labels: &[String]) -> String {
    serde_json::to_string(labels).unwrap_or_else(|_| "[]".to_string())
}
