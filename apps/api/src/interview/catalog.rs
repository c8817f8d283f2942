//! Item Catalog: the fixed, ordered list of screening items.
//!
//! The catalog is the identity space for every slot: a record holds exactly one
//! slot per catalog item, in catalog order. It is built once at startup and
//! shared read-only through `AppState`.

use serde::Serialize;

/// PHQ-9 item labels in administration order.
pub const PHQ9_ITEMS: [&str; 9] = [
    "흥미나 즐거움 감소",
    "우울감",
    "수면 문제",
    "피로감",
    "식욕 변화",
    "자기비하",
    "집중력 저하",
    "정신 운동성 지연 또는 초조",
    "자살 생각",
];

/// Highest score a single item can carry.
pub const MAX_ITEM_SCORE: u8 = 3;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ItemCatalog {
    items: Vec<String>,
}

impl ItemCatalog {
    /// The reference PHQ-9 deployment.
    pub fn phq9() -> Self {
        Self::new(PHQ9_ITEMS.iter().map(|s| s.to_string()).collect())
    }

    /// Builds a catalog from labels. Duplicate labels keep their first position.
    pub fn new(labels: Vec<String>) -> Self {
        let mut items: Vec<String> = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.trim().to_string();
            if !label.is_empty() && !items.contains(&label) {
                items.push(label);
            }
        }
        Self { items }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn contains(&self, item: &str) -> bool {
        self.position(item).is_some()
    }

    /// Zero-based catalog position of `item`.
    pub fn position(&self, item: &str) -> Option<usize> {
        self.items.iter().position(|i| i == item)
    }
}

impl Default for ItemCatalog {
    fn default() -> Self {
        Self::phq9()
    }
}
