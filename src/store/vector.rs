//! In-process vector store — cosine similarity over stored vectors with
//! scalar metadata filtering. The searchable mirror for persisted emails;
//! substitutable for an external engine behind the same trait.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::traits::{MetadataFilter, VectorMatch, VectorStore, VectorStoreStats};

#[derive(Debug, Clone)]
struct StoredDoc {
    document: String,
    metadata: HashMap<String, String>,
    vector: Vec<f32>,
}

/// In-memory vector collection.
pub struct InMemoryVectorStore {
    name: String,
    docs: Mutex<HashMap<String, StoredDoc>>,
}

impl InMemoryVectorStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docs: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new("emails")
    }
}

/// Cosine distance in [0, 2]; zero-norm vectors compare as orthogonal.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(
        &self,
        id: &str,
        document: &str,
        metadata: HashMap<String, String>,
        vector: Vec<f32>,
    ) -> Result<(), StoreError> {
        let mut docs = self
            .docs
            .lock()
            .map_err(|_| StoreError::Vector("collection lock poisoned".into()))?;
        docs.insert(
            id.to_string(),
            StoredDoc {
                document: document.to_string(),
                metadata,
                vector,
            },
        );
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<VectorMatch>, StoreError> {
        let docs = self
            .docs
            .lock()
            .map_err(|_| StoreError::Vector("collection lock poisoned".into()))?;

        let mut matches: Vec<VectorMatch> = docs
            .iter()
            .filter(|(_, doc)| filter.is_none_or(|f| f.matches(&doc.metadata)))
            .map(|(id, doc)| VectorMatch {
                id: id.clone(),
                document: doc.document.clone(),
                metadata: doc.metadata.clone(),
                distance: cosine_distance(vector, &doc.vector),
            })
            .collect();

        matches.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(limit);
        Ok(matches)
    }

    async fn stats(&self) -> Result<VectorStoreStats, StoreError> {
        let docs = self
            .docs
            .lock()
            .map_err(|_| StoreError::Vector("collection lock poisoned".into()))?;
        Ok(VectorStoreStats {
            name: self.name.clone(),
            count: docs.len(),
        })
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut docs = self
            .docs
            .lock()
            .map_err(|_| StoreError::Vector("collection lock poisoned".into()))?;
        docs.remove(id);
        Ok(())
    }
}
