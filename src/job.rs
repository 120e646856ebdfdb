//! The sync job: one linear pass from export file to delivered report

use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::SyncConfig;
use crate::notify::OutboxNotifier;
use crate::reconciliation::Reconciler;
use crate::report::{DeliveryReceipt, ReportComposer, ReportMailer};
use crate::source::read_batch;
use crate::store::SqliteStore;
use crate::traits::*;
use crate::types::*;

/// Result of a complete run
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSummary {
    pub report: ReportResult,
    pub delivery: DeliveryReceipt,
}

/// A configured reconciliation job
///
/// `run` is the entry point a scheduler invokes. The two halves are also
/// exposed on their own: `reconcile` commits inserts and returns the report,
/// `notify` delivers a report and can be retried without touching the store.
pub struct SyncJob<S: PropertyStore, N: Notifier> {
    source_path: PathBuf,
    id_field: String,
    reconciler: Reconciler<S>,
    mailer: ReportMailer<N>,
}

impl SyncJob<SqliteStore, OutboxNotifier> {
    /// Build a job backed by the configured SQLite database and outbox directory
    ///
    /// Outbox and attachment directories are created before the store is opened.
    pub fn from_config(config: &SyncConfig) -> SyncResult<Self> {
        config.validate()?;
        prepare_dir("outbox", &config.mail.outbox_dir)?;
        prepare_dir("attachment", &config.report.attachment_dir)?;
        let store = SqliteStore::open(&config.store.database_path)?;
        let notifier = OutboxNotifier::new(&config.mail.outbox_dir);
        Ok(Self::new(config, store, notifier))
    }
}

fn prepare_dir(label: &str, dir: &Path) -> SyncResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        SyncError::Config(format!("cannot create {label} directory {}: {e}", dir.display()))
    })
}

impl<S: PropertyStore, N: Notifier> SyncJob<S, N> {
    /// Build a job over any store and notifier
    pub fn new(config: &SyncConfig, store: S, notifier: N) -> Self {
        let composer = ReportComposer::new(
            config.mail.sender.clone(),
            config.mail.recipient.clone(),
            config.report.attachment_dir.clone(),
        )
        .with_inline_limit(config.report.inline_limit);

        Self {
            source_path: config.source_path.clone(),
            id_field: config.id_field.clone(),
            reconciler: Reconciler::new(store),
            mailer: ReportMailer::new(composer, notifier),
        }
    }

    pub fn store(&self) -> &S {
        self.reconciler.store()
    }

    pub fn notifier(&self) -> &N {
        self.mailer.notifier()
    }

    /// Read the batch, reconcile it against the store, then close the store
    ///
    /// The store is closed whether or not reconciliation succeeded.
    pub async fn reconcile(&mut self) -> SyncResult<ReportResult> {
        let outcome = match read_batch(&self.source_path, &self.id_field) {
            Ok(batch) => self.reconciler.reconcile(&batch).await,
            Err(e) => Err(e),
        };

        if let Err(e) = self.reconciler.store_mut().close().await {
            warn!(error = %e, "failed to close store");
        }

        match outcome {
            Ok(report) => {
                info!(
                    run_id = %report.run_id,
                    inserted = report.inserted,
                    missing = report.missing_count(),
                    "reconciliation finished"
                );
                Ok(report)
            }
            Err(e) => {
                error!(source = %self.source_path.display(), error = %e, "reconciliation failed");
                Err(e)
            }
        }
    }

    /// Deliver the report for a finished reconciliation
    pub async fn notify(&self, report: &ReportResult) -> SyncResult<DeliveryReceipt> {
        self.mailer.deliver(report).await.map_err(|e| {
            error!(run_id = %report.run_id, error = %e, "report delivery failed");
            e
        })
    }

    /// Run the whole job: reconcile, then notify
    ///
    /// A notification failure after a successful reconcile leaves the inserts
    /// in place; the error is returned as-is.
    pub async fn run(&mut self) -> SyncResult<SyncSummary> {
        info!(source = %self.source_path.display(), "starting property sync");
        let report = self.reconcile().await?;
        let delivery = self.notify(&report).await?;
        info!(run_id = %report.run_id, "property sync completed");
        Ok(SyncSummary { report, delivery })
    }
}
