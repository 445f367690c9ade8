//! Persistence — relational email store, vector/search store, and the
//! dual-store writer that keeps them joined by one id.

pub mod libsql_backend;
mod migrations;
pub mod traits;
pub mod vector;
pub mod writer;

pub use libsql_backend::LibSqlStore;
pub use traits::{
    EmailRecord, EmailStore, FilterCondition, MetadataFilter, StoredEmail, VectorMatch,
    VectorStore, VectorStoreStats,
};
pub use vector::InMemoryVectorStore;
pub use writer::{DualStoreWriter, MessageMeta, PersistOutcome};
