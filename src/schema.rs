//! Index document model
//!
//! An [`IndexDocument`] is one build snapshot: a list of [`IndexItem`] rows in
//! canonical order (kind, then sequential id). The canonical order is part of
//! the persisted format; diffing tools compare files line by line.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{IndexError, Result};

/// One row of the index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexItem {
    /// Kind tag (see [`crate::EntityKind::as_str`])
    pub kind: String,

    /// Stable external identifier; nil only for property options without one
    #[serde(default, skip_serializing_if = "Uuid::is_nil")]
    pub external_id: Uuid,

    /// Sequential id, 1-based and dense within `kind`
    pub id: u64,

    /// Display text, possibly empty
    #[serde(default)]
    pub name: String,
}

impl IndexItem {
    pub fn new(kind: impl Into<String>, external_id: Uuid, id: u64, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            external_id,
            id,
            name: name.into(),
        }
    }

    /// Whether this item can be looked up by external identifier
    pub fn is_resolvable(&self) -> bool {
        !self.external_id.is_nil()
    }
}

/// Immutable build snapshot in canonical order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexDocument {
    items: Vec<IndexItem>,
}

impl IndexDocument {
    /// Create a document, sorting items into canonical order
    pub fn from_items(mut items: Vec<IndexItem>) -> Self {
        sort_canonical(&mut items);
        Self { items }
    }

    pub fn items(&self) -> &[IndexItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<IndexItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items per kind tag
    pub fn count_by_kind(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.items {
            *counts.entry(item.kind.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Reject documents containing items with a blank kind
    pub fn validate(&self) -> Result<()> {
        if let Some(pos) = self.items.iter().position(|i| i.kind.trim().is_empty()) {
            return Err(IndexError::malformed(format!(
                "item at position {} has empty 'kind'",
                pos
            )));
        }
        Ok(())
    }
}

/// Sort by kind (ordinal string comparison), then by id ascending
pub fn sort_canonical(items: &mut [IndexItem]) {
    items.sort_by(|a, b| a.kind.cmp(&b.kind).then(a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_items_sorts_by_kind_then_id() {
        let doc = IndexDocument::from_items(vec![
            IndexItem::new("threat", Uuid::new_v4(), 2, "b"),
            IndexItem::new("component", Uuid::new_v4(), 2, "y"),
            IndexItem::new("threat", Uuid::new_v4(), 1, "a"),
            IndexItem::new("component", Uuid::new_v4(), 1, "x"),
        ]);

        let keys: Vec<(&str, u64)> = doc.items().iter().map(|i| (i.kind.as_str(), i.id)).collect();
        assert_eq!(
            keys,
            vec![("component", 1), ("component", 2), ("threat", 1), ("threat", 2)]
        );
    }

    #[test]
    fn test_kind_order_is_ordinal() {
        let doc = IndexDocument::from_items(vec![
            IndexItem::new("threat", Uuid::new_v4(), 1, ""),
            IndexItem::new("testCase", Uuid::new_v4(), 1, ""),
            IndexItem::new("securityRequirement", Uuid::new_v4(), 1, ""),
            IndexItem::new("propertyOption", Uuid::nil(), 1, ""),
            IndexItem::new("property", Uuid::new_v4(), 1, ""),
        ]);
        let kinds: Vec<&str> = doc.items().iter().map(|i| i.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec!["property", "propertyOption", "securityRequirement", "testCase", "threat"]
        );
    }

    #[test]
    fn test_validate_rejects_blank_kind() {
        let doc = IndexDocument::from_items(vec![
            IndexItem::new("component", Uuid::new_v4(), 1, "ok"),
            IndexItem::new("  ", Uuid::new_v4(), 1, "bad"),
        ]);
        assert!(matches!(
            doc.validate(),
            Err(IndexError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn test_nil_external_id_is_not_resolvable() {
        let opt = IndexItem::new("propertyOption", Uuid::nil(), 3, "High");
        assert!(!opt.is_resolvable());
        let json = serde_json::to_value(&opt).unwrap();
        assert!(json.get("externalId").is_none());
        assert_eq!(json["name"], "High");
    }

    #[test]
    fn test_count_by_kind() {
        let doc = IndexDocument::from_items(vec![
            IndexItem::new("library", Uuid::new_v4(), 1, ""),
            IndexItem::new("library", Uuid::new_v4(), 2, ""),
            IndexItem::new("threat", Uuid::new_v4(), 1, ""),
        ]);
        let counts = doc.count_by_kind();
        assert_eq!(counts["library"], 2);
        assert_eq!(counts["threat"], 1);
    }
}
