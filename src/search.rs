//! Search over persisted emails — semantic similarity plus structured
//! entity/date filtering, backed by the vector store mirror.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::embedding::embed_text;
use crate::error::SearchError;
use crate::store::traits::{MetadataFilter, VectorMatch, VectorStore, VectorStoreStats};

/// Metadata keys entity filters may target. Everything else is rejected
/// rather than silently matching nothing.
const FILTERABLE_FIELDS: &[&str] = &[
    "intent",
    "customer_organization",
    "producer_organization",
    "people",
    "products",
    "monetary_values",
    "addresses",
    "phone_numbers",
    "email_addresses",
];

/// Structured search request: semantic query text combined with entity
/// `contains` filters and an optional extracted-date range.
#[derive(Debug, Clone, Default)]
pub struct AdvancedQuery {
    pub query: String,
    /// (metadata field, value) pairs; each becomes a substring condition.
    pub entities: Vec<(String, String)>,
    /// Inclusive `YYYY-MM-DD` lower bound on the extracted date.
    pub date_from: Option<String>,
    /// Inclusive `YYYY-MM-DD` upper bound on the extracted date.
    pub date_to: Option<String>,
    pub limit: usize,
}

/// Query surface over the vector store.
pub struct SearchService {
    vectors: Arc<dyn VectorStore>,
}

impl SearchService {
    pub fn new(vectors: Arc<dyn VectorStore>) -> Self {
        Self { vectors }
    }

    /// Ranked semantically-similar emails for a free-text query.
    pub async fn semantic(
        &self,
        query: &str,
        limit: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorMatch>, SearchError> {
        self.vectors
            .query(&embed_text(query), limit, filter)
            .await
            .map_err(|e| SearchError::Query(e.to_string()))
    }

    /// Semantic search narrowed by entity and date-range filters.
    pub async fn advanced(&self, request: &AdvancedQuery) -> Result<Vec<VectorMatch>, SearchError> {
        let filter = build_filter(request)?;
        let filter_ref = (!filter.is_empty()).then_some(&filter);
        self.vectors
            .query(&embed_text(&request.query), request.limit, filter_ref)
            .await
            .map_err(|e| SearchError::Query(e.to_string()))
    }

    pub async fn stats(&self) -> Result<VectorStoreStats, SearchError> {
        self.vectors
            .stats()
            .await
            .map_err(|e| SearchError::Query(e.to_string()))
    }
}

/// Translate an advanced request into metadata conditions, validating field
/// names and date bounds up front.
fn build_filter(request: &AdvancedQuery) -> Result<MetadataFilter, SearchError> {
    let mut filter = MetadataFilter::new();

    for (field, value) in &request.entities {
        if !FILTERABLE_FIELDS.contains(&field.as_str()) {
            return Err(SearchError::InvalidFilter(format!(
                "unknown entity field '{field}'"
            )));
        }
        filter = filter.contains(field.clone(), value.clone());
    }

    if let Some(from) = &request.date_from {
        validate_date(from)?;
        filter = filter.gte("date_time", from.clone());
    }
    if let Some(to) = &request.date_to {
        validate_date(to)?;
        filter = filter.lte("date_time", to.clone());
    }

    Ok(filter)
}

/// Date bounds must already be `YYYY-MM-DD` so the store's lexicographic
/// comparison is a real date comparison.
fn validate_date(value: &str) -> Result<(), SearchError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| SearchError::InvalidFilter(format!("bad date bound '{value}'")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::store::vector::InMemoryVectorStore;

    fn metadata(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn seeded_service() -> SearchService {
        let store = Arc::new(InMemoryVectorStore::default());
        store
            .upsert(
                "e1",
                "Order 40 widgets\nPlease ship 40 widgets.",
                metadata(&[
                    ("intent", "place_order"),
                    ("people", r#"["Alice Smith"]"#),
                    ("date_time", "2026-06-05"),
                ]),
                embed_text("Order 40 widgets\nPlease ship 40 widgets."),
            )
            .await
            .unwrap();
        store
            .upsert(
                "e2",
                "Invoice overdue\nPlease settle invoice 1234.",
                metadata(&[
                    ("intent", "request_invoice"),
                    ("people", r#"["Bob Jones"]"#),
                    ("date_time", "2025-01-10"),
                ]),
                embed_text("Invoice overdue\nPlease settle invoice 1234."),
            )
            .await
            .unwrap();
        SearchService::new(store)
    }

    #[tokio::test]
    async fn semantic_search_ranks_exact_text_first() {
        let service = seeded_service().await;
        let matches = service
            .semantic("Order 40 widgets\nPlease ship 40 widgets.", 5, None)
            .await
            .unwrap();
        assert_eq!(matches[0].id, "e1");
    }

    #[tokio::test]
    async fn advanced_search_filters_by_entity() {
        let service = seeded_service().await;
        let matches = service
            .advanced(&AdvancedQuery {
                query: "invoice".into(),
                entities: vec![("people".into(), "Bob".into())],
                limit: 5,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "e2");
    }

    #[tokio::test]
    async fn advanced_search_filters_by_date_range() {
        let service = seeded_service().await;
        let matches = service
            .advanced(&AdvancedQuery {
                query: "order".into(),
                date_from: Some("2026-01-01".into()),
                date_to: Some("2026-12-31".into()),
                limit: 5,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "e1");
    }

    #[tokio::test]
    async fn unknown_entity_field_is_rejected() {
        let service = seeded_service().await;
        let err = service
            .advanced(&AdvancedQuery {
                query: "order".into(),
                entities: vec![("favourite_colour".into(), "blue".into())],
                limit: 5,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidFilter(_)));
    }

    #[tokio::test]
    async fn bad_date_bound_is_rejected() {
        let service = seeded_service().await;
        let err = service
            .advanced(&AdvancedQuery {
                query: "order".into(),
                date_from: Some("last tuesday".into()),
                limit: 5,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidFilter(_)));
    }

    #[tokio::test]
    async fn stats_reports_document_count() {
        let service = seeded_service().await;
        assert_eq!(service.stats().await.unwrap().count, 2);
    }
}
