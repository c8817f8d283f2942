//! Slot Reconciliation Engine: the only code allowed to change slot state.
//!
//! Merge rules, per candidate, against the slot with the same item:
//! 1. non-null `score` that differs overwrites the stored score
//! 2. non-null `freq_or_intensity` that differs overwrites the stored value
//! 3. non-empty `raw_user_input` that differs overwrites the stored value
//! 4. the slot becomes `answered` only when the candidate says "answered" and
//!    carries both a score and a frequency/intensity; nothing ever moves a slot
//!    back to `unanswered`
//!
//! Rules 1-3 apply to answered slots too, so a later correction still lands.
//! Keeping the interviewer from re-asking answered items is prompt policy, not
//! a merge rule.
//!
//! A slot's `last_updated` is stamped only when its net content differs after
//! the whole batch has been applied, and the record's `last_updated` only when
//! some slot was stamped. Re-applying an already-merged batch is a no-op.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::interview::catalog::ItemCatalog;
use crate::interview::models::{AnswerRecord, CandidateUpdate, Slot, SlotStatus};

#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub record: AnswerRecord,
    pub changed: bool,
    /// Items whose slot changed, in catalog order.
    pub changed_items: Vec<String>,
    /// Candidates skipped for a missing or unknown item.
    pub skipped: usize,
}

/// Merges `candidates` into `record` in order; for repeated items the later
/// candidate wins field by field.
///
/// The record is first conformed to `catalog`, so only catalog items can be
/// touched. A repair alone counts as a change but stamps no timestamp.
pub fn reconcile(
    mut record: AnswerRecord,
    candidates: &[CandidateUpdate],
    catalog: &ItemCatalog,
    now: DateTime<Utc>,
) -> Reconciliation {
    let repaired = record.conform_to(catalog);
    if repaired {
        warn!(
            "Record for user {} did not match the item catalog; repaired before merging",
            record.user_id
        );
    }
    let before = record.slots.clone();
    let mut skipped = 0;

    for candidate in candidates {
        if candidate.item.is_empty() {
            debug!("Skipping candidate without an item");
            skipped += 1;
            continue;
        }
        match record.slots.iter_mut().find(|s| s.item == candidate.item) {
            Some(slot) => merge_candidate(slot, candidate),
            None => {
                debug!("Skipping candidate for unknown item '{}'", candidate.item);
                skipped += 1;
            }
        }
    }

    let mut changed_items = Vec::new();
    for (slot, old) in record.slots.iter_mut().zip(&before) {
        if !slot.same_content(old) {
            slot.last_updated = Some(now);
            debug!(
                "Slot '{}' updated: status={:?} score={:?}",
                slot.item, slot.status, slot.score
            );
            changed_items.push(slot.item.clone());
        }
    }

    if !changed_items.is_empty() {
        record.last_updated = Some(now);
    }
    let changed = repaired || !changed_items.is_empty();

    Reconciliation {
        record,
        changed,
        changed_items,
        skipped,
    }
}

/// Applies rules 1-4 to one slot. Change detection happens afterwards, on the
/// net result of the whole batch.
fn merge_candidate(slot: &mut Slot, candidate: &CandidateUpdate) {
    if candidate.score.is_some() {
        slot.score = candidate.score;
    }
    if candidate.freq_or_intensity.is_some() {
        slot.freq_or_intensity = candidate.freq_or_intensity.clone();
    }
    if let Some(raw) = candidate.raw_user_input.as_ref().filter(|r| !r.is_empty()) {
        slot.raw_user_input = Some(raw.clone());
    }

    if candidate.declares_answered()
        && candidate.freq_or_intensity.is_some()
        && candidate.score.is_some()
        && slot.status != SlotStatus::Answered
    {
        slot.status = SlotStatus::Answered;
    }
}
