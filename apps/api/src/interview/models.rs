use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::interview::catalog::{ItemCatalog, MAX_ITEM_SCORE};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    #[default]
    Unanswered,
    Answered,
}

/// Per-user, per-item interview state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Slot {
    pub item: String,
    #[serde(default)]
    pub status: SlotStatus,
    #[serde(default)]
    pub score: Option<u8>,
    #[serde(default)]
    pub raw_user_input: Option<String>,
    #[serde(default)]
    pub freq_or_intensity: Option<String>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Slot {
    pub fn unanswered(item: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            status: SlotStatus::Unanswered,
            score: None,
            raw_user_input: None,
            freq_or_intensity: None,
            last_updated: None,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.status == SlotStatus::Answered
    }

    /// Field-wise equality, ignoring `last_updated`.
    pub fn same_content(&self, other: &Slot) -> bool {
        self.item == other.item
            && self.status == other.status
            && self.score == other.score
            && self.raw_user_input == other.raw_user_input
            && self.freq_or_intensity == other.freq_or_intensity
    }
}

/// The complete set of slots for one user, one per catalog item in catalog order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerRecord {
    pub user_id: String,
    pub slots: Vec<Slot>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl AnswerRecord {
    /// Fresh record: every slot unanswered, every field empty.
    pub fn new(user_id: impl Into<String>, catalog: &ItemCatalog) -> Self {
        Self {
            user_id: user_id.into(),
            slots: catalog.items().iter().map(Slot::unanswered).collect(),
            last_updated: None,
        }
    }

    pub fn slot(&self, item: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.item == item)
    }

    pub fn unanswered_items(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|s| !s.is_answered())
            .map(|s| s.item.clone())
            .collect()
    }

    pub fn answered_items(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|s| s.is_answered())
            .map(|s| s.item.clone())
            .collect()
    }

    /// Rebuilds the slot list so it matches `catalog` exactly: foreign and
    /// duplicate slots are dropped, missing items are added unanswered, and
    /// catalog order is restored. Returns whether anything had to be fixed.
    ///
    /// Only needed for records that came from outside the reconciler, e.g. a
    /// document edited directly in the database.
    pub fn conform_to(&mut self, catalog: &ItemCatalog) -> bool {
        let mut existing = std::mem::take(&mut self.slots);
        let before: Vec<String> = existing.iter().map(|s| s.item.clone()).collect();

        self.slots = catalog
            .items()
            .iter()
            .map(|item| match existing.iter().position(|s| &s.item == item) {
                Some(idx) => existing.swap_remove(idx),
                None => Slot::unanswered(item.as_str()),
            })
            .collect();

        before.len() != self.slots.len()
            || before.iter().zip(&self.slots).any(|(b, s)| *b != s.item)
    }
}

/// An untrusted proposed change to one slot, produced by the sanitizer.
///
/// Deserialization is lenient: numeric strings and floats are accepted for
/// `score`, numbers are accepted for text fields, blank text counts as absent,
/// and a score outside 0..=3 is treated as absent rather than failing the whole
/// object. Any `last_updated` sent by the extractor is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CandidateUpdate {
    #[serde(default, deserialize_with = "item_label")]
    pub item: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: Option<u8>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub raw_user_input: Option<String>,
    #[serde(default, alias = "freq_intensity", deserialize_with = "lenient_text")]
    pub freq_or_intensity: Option<String>,
    #[serde(skip_deserializing)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl CandidateUpdate {
    pub fn declares_answered(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case("answered"))
    }
}

fn item_label<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(lenient_text(de)?
        .map(|label| label.trim().to_string())
        .unwrap_or_default())
}

/// Text kept as sent; whitespace-only counts as absent.
fn lenient_text<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    let text = match Option::<Value>::deserialize(de)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => return Ok(None),
    };
    Ok((!text.trim().is_empty()).then_some(text))
}

fn lenient_score<'de, D: Deserializer<'de>>(de: D) -> Result<Option<u8>, D::Error> {
    let value = match Option::<Value>::deserialize(de)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(value
        .filter(|v| v.fract() == 0.0 && (0.0..=MAX_ITEM_SCORE as f64).contains(v))
        .map(|v| v as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(json: &str) -> CandidateUpdate {
        serde_json::from_str(json).expect("candidate should parse")
    }

    #[test]
    fn test_new_record_is_all_unanswered_in_catalog_order() {
        let catalog = ItemCatalog::phq9();
        let record = AnswerRecord::new("u1", &catalog);
        assert_eq!(record.slots.len(), 9);
        assert!(record.slots.iter().all(|s| !s.is_answered()));
        assert!(record.last_updated.is_none());
        let items: Vec<_> = record.slots.iter().map(|s| s.item.clone()).collect();
        assert_eq!(items, catalog.items());
    }

    #[test]
    fn test_conform_to_restores_bijection() {
        let catalog = ItemCatalog::new(vec!["a".into(), "b".into(), "c".into()]);
        let mut answered = Slot::unanswered("c");
        answered.status = SlotStatus::Answered;
        answered.score = Some(2);
        let mut record = AnswerRecord {
            user_id: "u1".into(),
            slots: vec![answered.clone(), Slot::unanswered("zzz"), Slot::unanswered("a")],
            last_updated: None,
        };

        assert!(record.conform_to(&catalog));
        let items: Vec<_> = record.slots.iter().map(|s| s.item.as_str()).collect();
        assert_eq!(items, vec!["a", "b", "c"]);
        assert_eq!(record.slot("c"), Some(&answered));
    }

    #[test]
    fn test_conform_to_noop_on_valid_record() {
        let catalog = ItemCatalog::phq9();
        let mut record = AnswerRecord::new("u1", &catalog);
        assert!(!record.conform_to(&catalog));
    }

    #[test]
    fn test_candidate_accepts_string_score_and_alias() {
        let c = candidate(r#"{"item": "우울감", "score": "2", "freq_intensity": "거의 매일"}"#);
        assert_eq!(c.score, Some(2));
        assert_eq!(c.freq_or_intensity.as_deref(), Some("거의 매일"));
    }

    #[test]
    fn test_candidate_out_of_range_score_is_absent() {
        assert_eq!(candidate(r#"{"item": "x", "score": 7}"#).score, None);
        assert_eq!(candidate(r#"{"item": "x", "score": 1.5}"#).score, None);
        assert_eq!(candidate(r#"{"item": "x", "score": 3.0}"#).score, Some(3));
    }

    #[test]
    fn test_candidate_blank_text_is_absent() {
        let c = candidate(r#"{"item": " 우울감 ", "raw_user_input": "   ", "freq_or_intensity": null}"#);
        assert_eq!(c.item, "우울감");
        assert_eq!(c.raw_user_input, None);
        assert_eq!(c.freq_or_intensity, None);
    }

    #[test]
    fn test_candidate_text_is_kept_verbatim() {
        let c = candidate(
            r#"{"item": "수면 문제", "raw_user_input": "  잠을 잘 못 자요.\n ", "freq_or_intensity": " 거의 매일"}"#,
        );
        assert_eq!(c.raw_user_input.as_deref(), Some("  잠을 잘 못 자요.\n "));
        assert_eq!(c.freq_or_intensity.as_deref(), Some(" 거의 매일"));
        assert!(candidate(r#"{"item": "x", "status": " answered "}"#).declares_answered());
    }

    #[test]
    fn test_candidate_ignores_supplied_timestamp() {
        let c = candidate(r#"{"item": "x", "last_updated": "yesterday-ish"}"#);
        assert!(c.last_updated.is_none());
    }

    #[test]
    fn test_declares_answered() {
        assert!(candidate(r#"{"item": "x", "status": "Answered"}"#).declares_answered());
        assert!(!candidate(r#"{"item": "x", "status": "partial"}"#).declares_answered());
        assert!(!candidate(r#"{"item": "x"}"#).declares_answered());
    }
}
