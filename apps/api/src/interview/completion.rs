use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::interview::catalog::ItemCatalog;
use crate::interview::models::{AnswerRecord, Slot};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    Mild,
    Moderate,
    ModeratelySevere,
    Severe,
}

impl Severity {
    /// Standard PHQ-9 bands: 0-4, 5-9, 10-14, 15-19, 20+.
    pub fn from_total(total: u32) -> Self {
        match total {
            t if t >= 20 => Severity::Severe,
            t if t >= 15 => Severity::ModeratelySevere,
            t if t >= 10 => Severity::Moderate,
            t if t >= 5 => Severity::Mild,
            _ => Severity::None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryItem {
    /// One-based position in the catalog.
    pub num: usize,
    pub item: String,
    pub answer: String,
}

/// An answered slot without a score. The merge rules cannot produce one, so
/// it means the record was written by something other than the reconciler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntegrityAnomaly {
    pub item: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evaluation {
    pub complete: bool,
    pub answered_count: usize,
    pub item_count: usize,
    pub total_score: Option<u32>,
    pub severity: Option<Severity>,
    pub summary: Option<Vec<SummaryItem>>,
    pub anomalies: Vec<IntegrityAnomaly>,
}

/// Evaluates completion of `record` against `catalog`. Score and summary are
/// only produced once every catalog item is answered; slots for items outside
/// the catalog are ignored. `edits` maps item label to a user-edited answer
/// that replaces `raw_user_input` in the summary; the record itself is not
/// touched.
pub fn evaluate(
    record: &AnswerRecord,
    catalog: &ItemCatalog,
    edits: Option<&HashMap<String, String>>,
) -> Evaluation {
    let slots: Vec<Option<&Slot>> = catalog.items().iter().map(|i| record.slot(i)).collect();
    let item_count = slots.len();
    let answered: Vec<&Slot> = slots
        .iter()
        .flatten()
        .copied()
        .filter(|s| s.is_answered())
        .collect();
    let answered_count = answered.len();
    let complete = item_count > 0 && answered_count == item_count;

    let anomalies: Vec<IntegrityAnomaly> = answered
        .iter()
        .filter(|s| s.score.is_none())
        .map(|s| {
            error!(
                "Integrity anomaly for user {}: item '{}' is answered with no score",
                record.user_id, s.item
            );
            IntegrityAnomaly {
                item: s.item.clone(),
                reason: "answered without a score; counted as 0".to_string(),
            }
        })
        .collect();

    if !complete {
        return Evaluation {
            complete,
            answered_count,
            item_count,
            total_score: None,
            severity: None,
            summary: None,
            anomalies,
        };
    }

    let total: u32 = answered
        .iter()
        .map(|s| u32::from(s.score.unwrap_or(0)))
        .sum();

    Evaluation {
        complete,
        answered_count,
        item_count,
        total_score: Some(total),
        severity: Some(Severity::from_total(total)),
        summary: Some(build_summary(record, catalog, edits)),
        anomalies,
    }
}

/// Per-item summary in catalog order, regardless of completion.
pub fn build_summary(
    record: &AnswerRecord,
    catalog: &ItemCatalog,
    edits: Option<&HashMap<String, String>>,
) -> Vec<SummaryItem> {
    catalog
        .items()
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let answer = edits
                .and_then(|e| e.get(item))
                .or_else(|| record.slot(item).and_then(|s| s.raw_user_input.as_ref()))
                .cloned()
                .unwrap_or_default();
            SummaryItem {
                num: idx + 1,
                item: item.clone(),
                answer,
            }
        })
        .collect()
}

/// Renders the summary as `Q1. label\nA1. answer` blocks separated by a blank line.
pub fn render_summary(items: &[SummaryItem]) -> String {
    items
        .iter()
        .map(|s| format!("Q{n}. {}\nA{n}. {}", s.item, s.answer, n = s.num))
        .collect::<Vec<_>>()
        .join("\n\n")
}
