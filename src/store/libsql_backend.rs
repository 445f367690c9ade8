//! libSQL backend — async `EmailStore` implementation.
//!
//! Array and structured entity fields are stored as JSON text columns;
//! optional scalars map to nullable columns. The insert is a single
//! statement, atomic in SQLite: it either commits the whole row (returning
//! the generated id) or nothing.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::extract::{EntityRecord, Intent, Product};
use crate::store::migrations;
use crate::store::traits::{EmailRecord, EmailStore, StoredEmail};

/// Column list shared by every SELECT, in row-mapping order.
const EMAIL_COLUMNS: &str = "id, mailbox_id, subject, body, sender, recipients, received_at, \
message_id, thread_id, headers, intent, customer_organization, producer_organization, people, \
extracted_date, products, monetary_values, addresses, phone_numbers, email_addresses, \
processing_status, confidence_score, extraction_model_version, created_at";

/// libSQL email store.
///
/// Holds a single connection reused for all operations;
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.run_migrations().await?;
        info!(path = %path.display(), "Email store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.run_migrations().await?;
        Ok(store)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str, column: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw)
        .map_err(|e| StoreError::Serialization(format!("bad {column} column: {e}")))
}

fn parse_intent(raw: &str) -> Result<Intent, StoreError> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| StoreError::Serialization(format!("unknown intent '{raw}'")))
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn opt_text(value: Option<&str>) -> libsql::Value {
    match value {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Map a libsql row to a StoredEmail. Column order matches `EMAIL_COLUMNS`.
fn row_to_email(row: &libsql::Row) -> Result<StoredEmail, StoreError> {
    let get_text = |idx: i32| -> Result<String, StoreError> {
        row.get::<String>(idx)
            .map_err(|e| StoreError::Query(format!("column {idx}: {e}")))
    };

    let recipients: Vec<String> = from_json(&get_text(5)?, "recipients")?;
    let headers: serde_json::Value = from_json(&get_text(9)?, "headers")?;
    let people: Vec<String> = from_json(&get_text(13)?, "people")?;
    let products: Vec<Product> = from_json(&get_text(15)?, "products")?;
    let monetary_values: Vec<String> = from_json(&get_text(16)?, "monetary_values")?;
    let addresses: Vec<String> = from_json(&get_text(17)?, "addresses")?;
    let phone_numbers: Vec<String> = from_json(&get_text(18)?, "phone_numbers")?;
    let email_addresses: Vec<String> = from_json(&get_text(19)?, "email_addresses")?;

    let entities = EntityRecord {
        intent: parse_intent(&get_text(10)?)?,
        customer_organization: get_text(11)?,
        producer_organization: get_text(12)?,
        people,
        date_time: row.get::<String>(14).ok(),
        products,
        monetary_values,
        addresses,
        phone_numbers,
        email_addresses,
    };

    let confidence_score: f64 = row
        .get::<f64>(21)
        .map_err(|e| StoreError::Query(format!("confidence_score: {e}")))?;

    Ok(StoredEmail {
        id: get_text(0)?,
        record: EmailRecord {
            mailbox_id: get_text(1)?,
            subject: get_text(2)?,
            body: get_text(3)?,
            sender: get_text(4)?,
            recipients,
            received_at: get_text(6)?,
            message_id: get_text(7)?,
            thread_id: row.get::<String>(8).ok(),
            headers,
            entities,
            processing_status: get_text(20)?,
            confidence_score,
            extraction_model_version: get_text(22)?,
        },
        created_at: parse_datetime(&get_text(23)?),
    })
}

// ── EmailStore implementation ───────────────────────────────────────

#[async_trait]
impl EmailStore for LibSqlStore {
    async fn run_migrations(&self) -> Result<(), StoreError> {
        migrations::run(self.conn()).await
    }

    async fn insert_email(&self, record: &EmailRecord) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let entities = &record.entities;

        self.conn()
            .execute(
                "INSERT INTO emails (id, mailbox_id, subject, body, sender, recipients, \
                 received_at, message_id, thread_id, headers, intent, customer_organization, \
                 producer_organization, people, extracted_date, products, monetary_values, \
                 addresses, phone_numbers, email_addresses, processing_status, confidence_score, \
                 extraction_model_version, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
                 ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
                params![
                    id.clone(),
                    record.mailbox_id.clone(),
                    record.subject.clone(),
                    record.body.clone(),
                    record.sender.clone(),
                    to_json(&record.recipients)?,
                    record.received_at.clone(),
                    record.message_id.clone(),
                    opt_text(record.thread_id.as_deref()),
                    record.headers.to_string(),
                    entities.intent.as_str(),
                    entities.customer_organization.clone(),
                    entities.producer_organization.clone(),
                    to_json(&entities.people)?,
                    opt_text(entities.date_time.as_deref()),
                    to_json(&entities.products)?,
                    to_json(&entities.monetary_values)?,
                    to_json(&entities.addresses)?,
                    to_json(&entities.phone_numbers)?,
                    to_json(&entities.email_addresses)?,
                    record.processing_status.clone(),
                    record.confidence_score,
                    record.extraction_model_version.clone(),
                    now,
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("insert_email: {e}")))?;

        debug!(id = %id, message_id = %record.message_id, "Email inserted");
        Ok(id)
    }

    async fn get_email(&self, id: &str) -> Result<Option<StoredEmail>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {EMAIL_COLUMNS} FROM emails WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| StoreError::Query(format!("get_email: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_email(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("get_email: {e}"))),
        }
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<StoredEmail>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {EMAIL_COLUMNS} FROM emails ORDER BY created_at DESC, id LIMIT ?1"
                ),
                params![limit as i64],
            )
            .await
            .map_err(|e| StoreError::Query(format!("list_recent: {e}")))?;

        let mut emails = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            emails.push(row_to_email(&row)?);
        }
        Ok(emails)
    }

    async fn delete_email(&self, id: &str) -> Result<(), StoreError> {
        self.conn()
            .execute("DELETE FROM emails WHERE id = ?1", params![id])
            .await
            .map_err(|e| StoreError::Query(format!("delete_email: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entities() -> EntityRecord {
        EntityRecord {
            intent: Intent::PlaceOrder,
            customer_organization: "Acme Corp".into(),
            producer_organization: "Widget Works".into(),
            people: vec!["Alice Smith".into()],
            date_time: Some("2026-06-05".into()),
            products: vec![Product {
                product_name: "Widget".into(),
                model: Some("W-100".into()),
                quantity: Some(40.0),
            }],
            monetary_values: vec!["$4,000".into()],
            addresses: vec!["1 Main St, Springfield".into()],
            phone_numbers: vec!["555-0100".into()],
            email_addresses: vec!["alice@acme.test".into()],
        }
    }

    fn sample_record(entities: EntityRecord) -> EmailRecord {
        EmailRecord {
            mailbox_id: "mb-1".into(),
            message_id: "<msg-1@acme.test>".into(),
            thread_id: Some("<thread-1@acme.test>".into()),
            subject: "Order 40 widgets".into(),
            body: "Please ship 40 widgets.".into(),
            sender: "Alice Smith <alice@acme.test>".into(),
            recipients: vec!["sales@widgetworks.test".into()],
            received_at: "2026-06-01T09:00:00+00:00".into(),
            headers: serde_json::json!({"from": "Alice Smith <alice@acme.test>"}),
            entities,
            processing_status: "processed".into(),
            confidence_score: 1.0,
            extraction_model_version: "test-model".into(),
        }
    }

    #[tokio::test]
    async fn insert_returns_generated_id_and_round_trips() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let record = sample_record(sample_entities());

        let id = store.insert_email(&record).await.unwrap();
        assert!(!id.is_empty());

        let stored = store.get_email(&id).await.unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.record.subject, "Order 40 widgets");
        assert_eq!(stored.record.entities.intent, Intent::PlaceOrder);
        assert_eq!(stored.record.entities.date_time.as_deref(), Some("2026-06-05"));
        assert_eq!(stored.record.entities.products[0].quantity, Some(40.0));
        assert_eq!(stored.record.recipients, vec!["sales@widgetworks.test".to_string()]);
        assert_eq!(stored.record.processing_status, "processed");
    }

    #[tokio::test]
    async fn two_inserts_generate_distinct_ids() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let record = sample_record(sample_entities());
        let first = store.insert_email(&record).await.unwrap();
        let second = store.insert_email(&record).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn absent_date_persists_as_null() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let mut entities = sample_entities();
        entities.date_time = None;
        let record = sample_record(entities);

        let id = store.insert_email(&record).await.unwrap();
        let stored = store.get_email(&id).await.unwrap().unwrap();
        assert!(stored.record.entities.date_time.is_none());
    }

    #[tokio::test]
    async fn absent_thread_id_round_trips_as_none() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let mut record = sample_record(sample_entities());
        record.thread_id = None;

        let id = store.insert_email(&record).await.unwrap();
        let stored = store.get_email(&id).await.unwrap().unwrap();
        assert!(stored.record.thread_id.is_none());
    }

    #[tokio::test]
    async fn get_missing_email_is_none() {
        let store = LibSqlStore::new_memory().await.unwrap();
        assert!(store.get_email("no-such-id").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_recent_respects_limit() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let record = sample_record(sample_entities());
        for _ in 0..3 {
            store.insert_email(&record).await.unwrap();
        }
        let listed = store.list_recent(2).await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let id = store
            .insert_email(&sample_record(sample_entities()))
            .await
            .unwrap();
        store.delete_email(&id).await.unwrap();
        assert!(store.get_email(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let store = LibSqlStore::new_memory().await.unwrap();
        store.run_migrations().await.unwrap();
        store.run_migrations().await.unwrap();
    }
}
