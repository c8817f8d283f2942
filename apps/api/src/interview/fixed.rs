//! Fixed-question interview: the nine PHQ-9 questions asked verbatim, one per
//! turn, with no extraction or scoring.
//!
//! Progress is a `started` flag plus the index of the next question. The first
//! turn asks question 1 whatever the user said; every later turn records the
//! answer and asks the next question, and once all are asked the closing
//! message is returned on every turn, together with a summary pairing each
//! question in the dialog log with the answer that followed it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::interview::completion::{render_summary, SummaryItem};
use crate::interview::orchestrator::{
    resolve_user_id, split_history, trim_history, HISTORY_SEPARATOR,
};
use crate::interview::store::StoreError;
use crate::state::AppState;

pub const FIXED_QUESTIONS: [&str; 9] = [
    "1. 최근 2주간 기분이 가라앉거나, 우울하거나, 희망이 없다고 느끼셨나요?",
    "2. 최근 2주간 평소 하던 일에 대한 흥미가 없어지거나 즐거움을 느끼지 못하셨나요?",
    "3. 최근 2주간 잠을 잘 이루지 못하거나 너무 많이 주무셨나요?",
    "4. 최근 2주간 피곤하거나 기운이 없다고 느끼셨나요?",
    "5. 최근 2주간 식욕이 줄거나 너무 많이 먹었나요?",
    "6. 최근 2주간 내가 실패자라고 느끼거나 자신이나 가족을 실망시켰다고 느끼셨나요?",
    "7. 최근 2주간 신문을 읽거나 텔레비전을 보는 것과 같은 일상적인 일에 집중하기 어려우셨나요?",
    "8. 최근 2주간 다른 사람들이 알아차릴 정도로 느리게 움직이거나, 또는 너무 안절부절못하거나 들떠서 가만히 있을 수 없었던 적이 있었나요?",
    "9. 최근 2주간 죽고 싶다는 생각을 하거나 자해할 생각을 해본 적이 있으신가요?",
];

pub const FIXED_CLOSING: &str =
    "PHQ-9의 모든 문항에 답해 주셔서 고맙습니다. 이야기를 들려주셔서 정말 소중했어요.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedProgress {
    pub user_id: String,
    pub started: bool,
    /// Index into `FIXED_QUESTIONS` of the next question to ask.
    pub current_index: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

impl FixedProgress {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            started: false,
            current_index: 0,
            last_updated: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "user" => Sender::User,
            _ => Sender::Bot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogMessage {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait FixedInterviewStore: Send + Sync {
    /// Returns the user's progress, creating the not-started one on first use.
    async fn get_or_create_progress(&self, user_id: &str) -> Result<FixedProgress, StoreError>;

    async fn save_progress(&self, progress: &FixedProgress) -> Result<(), StoreError>;

    async fn append_messages(
        &self,
        user_id: &str,
        messages: &[DialogMessage],
    ) -> Result<(), StoreError>;

    /// The user's dialog log, oldest first.
    async fn dialog(&self, user_id: &str) -> Result<Vec<DialogMessage>, StoreError>;
}

/// What the bot says next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedStep {
    /// One-based question number and its text.
    Question(usize, &'static str),
    Closing,
}

/// Moves `progress` one turn forward.
pub fn advance(progress: &mut FixedProgress) -> FixedStep {
    if !progress.started {
        progress.started = true;
        progress.current_index = 1;
        return FixedStep::Question(1, FIXED_QUESTIONS[0]);
    }
    match FIXED_QUESTIONS.get(progress.current_index) {
        Some(question) => {
            progress.current_index += 1;
            FixedStep::Question(progress.current_index, *question)
        }
        None => FixedStep::Closing,
    }
}

/// Pairs every asked question in `dialog` with the user message right after
/// it; a question with no reply gets an empty answer.
pub fn dialog_summary(dialog: &[DialogMessage]) -> Vec<SummaryItem> {
    let mut items = Vec::new();
    let mut messages = dialog.iter().peekable();
    while let Some(message) = messages.next() {
        if message.sender != Sender::Bot || !FIXED_QUESTIONS.contains(&message.text.as_str()) {
            continue;
        }
        let answer = match messages.peek() {
            Some(next) if next.sender == Sender::User => {
                let answer = next.text.trim().to_string();
                messages.next();
                answer
            }
            _ => String::new(),
        };
        items.push(SummaryItem {
            num: items.len() + 1,
            item: message.text.clone(),
            answer,
        });
    }
    items
}

#[derive(Debug, Deserialize)]
pub struct FixedTurnRequest {
    pub message: Option<String>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub conversation_history: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FixedTurnResponse {
    pub response: String,
    pub conversation_history: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_number: Option<usize>,
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_items: Option<Vec<SummaryItem>>,
}

pub async fn run_fixed_turn(
    state: &AppState,
    request: FixedTurnRequest,
) -> Result<FixedTurnResponse, AppError> {
    let user_id = resolve_user_id(request.user_id);
    let message = request
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());

    let _turn = state.turn_locks.acquire(&user_id).await;

    let mut progress = state.fixed_store.get_or_create_progress(&user_id).await?;
    let now = Utc::now();

    let step = advance(&mut progress);
    let (response, question_number) = match step {
        FixedStep::Question(number, text) => (text.to_string(), Some(number)),
        FixedStep::Closing => (FIXED_CLOSING.to_string(), None),
    };

    let mut messages = Vec::with_capacity(2);
    if let Some(text) = &message {
        messages.push(DialogMessage {
            sender: Sender::User,
            text: text.clone(),
            timestamp: now,
        });
    }
    messages.push(DialogMessage {
        sender: Sender::Bot,
        text: response.clone(),
        timestamp: now,
    });
    state.fixed_store.append_messages(&user_id, &messages).await?;

    let summary_items = if step == FixedStep::Closing {
        Some(dialog_summary(&state.fixed_store.dialog(&user_id).await?))
    } else {
        progress.last_updated = Some(now);
        state.fixed_store.save_progress(&progress).await?;
        None
    };

    info!(
        "Fixed turn for user {user_id}: question={:?} next_index={}",
        question_number, progress.current_index
    );

    let mut history =
        split_history(request.conversation_history.as_deref().unwrap_or_default());
    history.extend(message);
    history.push(response.clone());
    trim_history(&mut history, state.config.history_window);

    Ok(FixedTurnResponse {
        response,
        conversation_history: history.join(HISTORY_SEPARATOR),
        question_number,
        complete: step == FixedStep::Closing,
        summary: summary_items.as_deref().map(render_summary),
        summary_items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::test_support::test_state;

    fn request(message: Option<&str>) -> FixedTurnRequest {
        FixedTurnRequest {
            message: message.map(String::from),
            user_id: Some("f1".to_string()),
            conversation_history: None,
        }
    }

    #[test]
    fn test_advance_walks_questions_then_closes() {
        let mut progress = FixedProgress::new("f1");
        assert_eq!(advance(&mut progress), FixedStep::Question(1, FIXED_QUESTIONS[0]));
        for n in 2..=9 {
            assert_eq!(
                advance(&mut progress),
                FixedStep::Question(n, FIXED_QUESTIONS[n - 1])
            );
        }
        assert_eq!(progress.current_index, 9);
        assert_eq!(advance(&mut progress), FixedStep::Closing);
        assert_eq!(advance(&mut progress), FixedStep::Closing);
        assert_eq!(progress.current_index, 9);
    }

    #[test]
    fn test_sender_round_trips_through_db_text() {
        assert_eq!(Sender::from_db(Sender::User.as_str()), Sender::User);
        assert_eq!(Sender::from_db(Sender::Bot.as_str()), Sender::Bot);
    }

    #[test]
    fn test_dialog_summary_skips_non_questions_and_missing_replies() {
        let at = Utc::now();
        let msg = |sender, text: &str| DialogMessage {
            sender,
            text: text.to_string(),
            timestamp: at,
        };
        let dialog = vec![
            msg(Sender::Bot, "안녕하세요"),
            msg(Sender::Bot, FIXED_QUESTIONS[0]),
            msg(Sender::Bot, FIXED_QUESTIONS[1]),
            msg(Sender::User, " 거의 매일 "),
        ];
        let items = dialog_summary(&dialog);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].answer, "");
        assert_eq!(items[1].num, 2);
        assert_eq!(items[1].answer, "거의 매일");
    }

    #[tokio::test]
    async fn test_first_turn_asks_question_one_without_message() {
        let (state, _, _) = test_state(vec![], vec![]);
        let response = run_fixed_turn(&state, request(None)).await.unwrap();
        assert_eq!(response.response, FIXED_QUESTIONS[0]);
        assert_eq!(response.question_number, Some(1));
        assert!(!response.complete);
        assert_eq!(response.conversation_history, FIXED_QUESTIONS[0]);

        let progress = state.fixed_store.get_or_create_progress("f1").await.unwrap();
        assert!(progress.started);
        assert_eq!(progress.current_index, 1);
    }

    #[tokio::test]
    async fn test_full_run_logs_dialog_and_closes() {
        let (state, _, _) = test_state(vec![], vec![]);
        run_fixed_turn(&state, request(Some("시작할게요"))).await.unwrap();
        for n in 2..=9 {
            let response = run_fixed_turn(&state, request(Some("가끔요"))).await.unwrap();
            assert_eq!(response.question_number, Some(n));
        }
        let last = run_fixed_turn(&state, request(Some("전혀 없어요"))).await.unwrap();
        assert!(last.complete);
        assert_eq!(last.response, FIXED_CLOSING);
        assert_eq!(last.question_number, None);
        let items = last.summary_items.unwrap();
        assert_eq!(items.len(), 9);
        assert_eq!(items[0].item, FIXED_QUESTIONS[0]);
        assert_eq!(items[0].answer, "가끔요");
        assert_eq!(items[8].answer, "전혀 없어요");
        assert!(last.summary.unwrap().starts_with("Q1. 1. 최근 2주간"));

        let dialog = state.fixed_store.dialog("f1").await.unwrap();
        assert_eq!(dialog.len(), 20);
        assert_eq!(dialog[0].sender, Sender::User);
        assert_eq!(dialog[1].text, FIXED_QUESTIONS[0]);
        assert_eq!(dialog[19].text, FIXED_CLOSING);

        // Turns after the end keep closing without moving progress.
        let again = run_fixed_turn(&state, request(Some("또요?"))).await.unwrap();
        assert!(again.complete);
        let progress = state.fixed_store.get_or_create_progress("f1").await.unwrap();
        assert_eq!(progress.current_index, 9);
    }

    #[tokio::test]
    async fn test_history_is_extended_and_trimmed() {
        let (state, _, _) = test_state(vec![], vec![]);
        let response = run_fixed_turn(
            &state,
            FixedTurnRequest {
                message: Some("안녕하세요".to_string()),
                user_id: Some("f2".to_string()),
                conversation_history: Some("a|b|c|d|e".to_string()),
            },
        )
        .await
        .unwrap();
        let history: Vec<_> = response.conversation_history.split('|').collect();
        assert_eq!(history.len(), 6);
        assert_eq!(history[0], "b");
        assert_eq!(history[4], "안녕하세요");
        assert_eq!(history[5], FIXED_QUESTIONS[0]);
    }
}
