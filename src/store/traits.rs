//! Store capability traits — the relational email store and the
//! vector/search store, plus the row and filter types they exchange.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::extract::EntityRecord;

// ── Relational store ────────────────────────────────────────────────

/// One email ready to be persisted. The store generates the id — callers
/// never supply one.
#[derive(Debug, Clone)]
pub struct EmailRecord {
    pub mailbox_id: String,
    pub message_id: String,
    pub thread_id: Option<String>,
    pub subject: String,
    pub body: String,
    pub sender: String,
    pub recipients: Vec<String>,
    pub received_at: String,
    pub headers: serde_json::Value,
    pub entities: EntityRecord,
    pub processing_status: String,
    pub confidence_score: f64,
    pub extraction_model_version: String,
}

/// A persisted email read back from the store.
#[derive(Debug, Clone)]
pub struct StoredEmail {
    pub id: String,
    pub record: EmailRecord,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic relational store for persisted emails.
#[async_trait]
pub trait EmailStore: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), StoreError>;

    /// Insert one email as a single atomic unit.
    ///
    /// Returns the store-generated id — the join key for the vector mirror.
    /// On failure the row is rolled back and nothing is persisted.
    async fn insert_email(&self, record: &EmailRecord) -> Result<String, StoreError>;

    /// Fetch one email by id.
    async fn get_email(&self, id: &str) -> Result<Option<StoredEmail>, StoreError>;

    /// Most recently persisted emails first, up to `limit`.
    async fn list_recent(&self, limit: usize) -> Result<Vec<StoredEmail>, StoreError>;

    /// Delete one email by id.
    async fn delete_email(&self, id: &str) -> Result<(), StoreError>;
}

// ── Vector store ────────────────────────────────────────────────────

/// One ranked match from a vector query.
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub id: String,
    pub document: String,
    pub metadata: HashMap<String, String>,
    pub distance: f32,
}

/// Collection statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorStoreStats {
    pub name: String,
    pub count: usize,
}

/// A single metadata condition. Values compare as strings; `Gte`/`Lte` rely
/// on lexicographic order, which holds for the `YYYY-MM-DD` dates stored in
/// metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterCondition {
    Eq { key: String, value: String },
    Contains { key: String, value: String },
    Gte { key: String, value: String },
    Lte { key: String, value: String },
}

/// Conjunction of metadata conditions applied to vector query results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    pub conditions: Vec<FilterCondition>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push(FilterCondition::Eq {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn contains(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push(FilterCondition::Contains {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn gte(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push(FilterCondition::Gte {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn lte(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push(FilterCondition::Lte {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// True when every condition holds against the given metadata.
    /// A condition on a missing key never matches.
    pub fn matches(&self, metadata: &HashMap<String, String>) -> bool {
        self.conditions.iter().all(|condition| match condition {
            FilterCondition::Eq { key, value } => {
                metadata.get(key).is_some_and(|v| v == value)
            }
            FilterCondition::Contains { key, value } => {
                metadata.get(key).is_some_and(|v| v.contains(value.as_str()))
            }
            FilterCondition::Gte { key, value } => {
                metadata.get(key).is_some_and(|v| v.as_str() >= value.as_str())
            }
            FilterCondition::Lte { key, value } => {
                metadata.get(key).is_some_and(|v| v.as_str() <= value.as_str())
            }
        })
    }
}

/// Vector/search store for the searchable mirror of persisted emails.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace the document keyed by `id`.
    async fn upsert(
        &self,
        id: &str,
        document: &str,
        metadata: HashMap<String, String>,
        vector: Vec<f32>,
    ) -> Result<(), StoreError>;

    /// Ranked nearest matches for `vector`, closest first.
    async fn query(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorMatch>, StoreError>;

    /// Collection statistics.
    async fn stats(&self) -> Result<VectorStoreStats, StoreError>;

    /// Remove the document keyed by `id`, if present.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(MetadataFilter::new().matches(&metadata(&[])));
        assert!(MetadataFilter::new().matches(&metadata(&[("a", "b")])));
    }

    #[test]
    fn eq_requires_exact_value() {
        let filter = MetadataFilter::new().eq("intent", "place_order");
        assert!(filter.matches(&metadata(&[("intent", "place_order")])));
        assert!(!filter.matches(&metadata(&[("intent", "complaint")])));
        assert!(!filter.matches(&metadata(&[])));
    }

    #[test]
    fn contains_is_substring_match() {
        let filter = MetadataFilter::new().contains("people", "John");
        assert!(filter.matches(&metadata(&[("people", r#"["John Doe","Eve"]"#)])));
        assert!(!filter.matches(&metadata(&[("people", r#"["Eve"]"#)])));
    }

    #[test]
    fn date_range_uses_lexicographic_order() {
        let filter = MetadataFilter::new()
            .gte("date_time", "2026-01-01")
            .lte("date_time", "2026-12-31");
        assert!(filter.matches(&metadata(&[("date_time", "2026-06-05")])));
        assert!(!filter.matches(&metadata(&[("date_time", "2025-06-05")])));
        assert!(!filter.matches(&metadata(&[("date_time", "2027-01-01")])));
    }

    #[test]
    fn all_conditions_must_hold() {
        let filter = MetadataFilter::new()
            .eq("intent", "place_order")
            .contains("people", "John");
        assert!(filter.matches(&metadata(&[
            ("intent", "place_order"),
            ("people", "John Doe"),
        ])));
        assert!(!filter.matches(&metadata(&[("intent", "place_order")])));
    }
}
