//! Weekly property sync example
//!
//! Seeds a SQLite store, writes an export that drops one property and adds
//! another, runs the job once and prints the queued report.

use property_sync::logging::init_logging;
use property_sync::notify::OutboxNotifier;
use property_sync::store::SqliteStore;
use property_sync::{
    Attributes, LoggingConfig, MailConfig, PropertyStore, Record, ReportConfig, StoreConfig,
    SyncConfig, SyncJob,
};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let workdir = tempfile::tempdir()?;
    let outbox_dir = workdir.path().join("outbox");

    let config = SyncConfig {
        source_path: workdir.path().join("zillow_export.json"),
        id_field: "zpid".to_string(),
        store: StoreConfig {
            database_path: workdir.path().join("properties.db"),
        },
        mail: MailConfig {
            sender: "support@example.com".to_string(),
            recipient: "ops@example.com".to_string(),
            outbox_dir: outbox_dir.clone(),
        },
        report: ReportConfig {
            inline_limit: 100,
            attachment_dir: workdir.path().join("reports"),
        },
        logging: LoggingConfig {
            directory: workdir.path().join("logs"),
            ..LoggingConfig::default()
        },
    };
    let _log_guard = init_logging(&config.logging)?;

    // 1. Last week's properties
    println!("Seeding store with last week's properties...");
    let mut store = SqliteStore::open(&config.store.database_path)?;
    let seed: Vec<Record> = (1..=3)
        .map(|id| Record::with_id(id, &config.id_field, Attributes::new()))
        .collect();
    store.insert_many(&seed).await?;
    store.close().await?;

    // 2. This week's export: property 1 is gone, property 4 is new
    let export = json!([
        {"zpid": 2, "address": "12 Oak Ave", "price": 410000},
        {"zpid": 3, "address": "9 Elm St", "price": 289000},
        {"zpid": 4, "address": "77 Pine Rd", "price": 515000},
        {"address": "listing without an id"},
    ]);
    std::fs::write(&config.source_path, serde_json::to_string_pretty(&export)?)?;

    // 3. Run once, the way a scheduler would
    let mut job = SyncJob::from_config(&config)?;
    let summary = job.run().await?;

    println!("\nRun {}", summary.report.run_id);
    println!("  New properties added:     {}", summary.report.inserted);
    println!("  Missing properties found: {}", summary.report.missing_count());
    println!("  Skipped records:          {}", summary.report.skipped);

    // 4. What the mail relay will pick up
    for envelope in OutboxNotifier::new(&outbox_dir).queued()? {
        println!("\nTo: {}\nSubject: {}\n", envelope.recipient, envelope.subject);
        for line in envelope.body {
            println!("{line}");
        }
    }

    for entry in std::fs::read_dir(&config.logging.directory)? {
        println!("\nRun log: {}", entry?.path().display());
    }

    Ok(())
}
