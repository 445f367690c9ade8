use std::sync::Arc;

use ordersift::config::{ExtractionConfig, IngestConfig};
use ordersift::extract::{EntityExtractor, OpenAiProvider};
use ordersift::mailbox::{self, MailboxConfig};
use ordersift::pipeline::IngestPipeline;
use ordersift::search::SearchService;
use ordersift::store::{
    DualStoreWriter, EmailStore, InMemoryVectorStore, LibSqlStore, VectorStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = IngestConfig::from_env()?;
    let extraction_config = ExtractionConfig::from_env()?;
    let mailbox_config = MailboxConfig::from_env()?;

    let mailbox_id =
        std::env::var("ORDERSIFT_MAILBOX_ID").unwrap_or_else(|_| "default".to_string());
    let db_path =
        std::env::var("ORDERSIFT_DB_PATH").unwrap_or_else(|_| "./data/ordersift.db".to_string());

    eprintln!("📬 ordersift v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Provider: {}", config.provider);
    eprintln!("   Model: {}", extraction_config.model);
    eprintln!("   Database: {}", db_path);
    eprintln!("   Concurrency: {}\n", config.concurrency);

    // ── Stores ──────────────────────────────────────────────────────────
    let emails: Arc<dyn EmailStore> =
        Arc::new(LibSqlStore::new_local(std::path::Path::new(&db_path)).await?);
    let vectors: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::default());

    // ── Extraction ──────────────────────────────────────────────────────
    let provider = Arc::new(OpenAiProvider::new(&extraction_config));
    let extractor = Arc::new(EntityExtractor::new(provider));

    // ── Pipeline ────────────────────────────────────────────────────────
    let writer = Arc::new(DualStoreWriter::new(
        Arc::clone(&emails),
        Arc::clone(&vectors),
        extractor.model_name(),
    ));
    let mailbox = mailbox::create_client(config.provider, mailbox_config)?;
    let pipeline = IngestPipeline::new(mailbox, extractor, writer, config);

    let summary = pipeline.run_batch(&mailbox_id).await?;
    eprintln!(
        "Batch done: {} fetched, {} persisted ({} unmirrored), {} extraction failures, {} persist failures",
        summary.fetched,
        summary.persisted_count(),
        summary.unmirrored_count(),
        summary.extraction_failed_count(),
        summary.persist_failed_count(),
    );
    for email_id in summary.saved_emails() {
        eprintln!("   saved {email_id}");
    }

    let search = SearchService::new(vectors);
    let stats = search.stats().await?;
    eprintln!("Vector store '{}': {} document(s)", stats.name, stats.count);

    Ok(())
}
