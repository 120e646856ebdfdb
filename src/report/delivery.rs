//! Delivering reports and cleaning up their attachments

use std::path::PathBuf;
use tracing::{info, warn};

use crate::report::ReportComposer;
use crate::traits::*;
use crate::types::*;

/// What happened when a report was delivered
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReceipt {
    pub subject: String,
    pub recipient: String,
    /// Attachment sent with the report, if any
    pub attachment: Option<PathBuf>,
    /// Whether the attachment was removed from disk afterwards
    pub attachment_removed: bool,
}

/// Composes reports and hands them to a notifier
pub struct ReportMailer<N: Notifier> {
    composer: ReportComposer,
    notifier: N,
}

impl<N: Notifier> ReportMailer<N> {
    pub fn new(composer: ReportComposer, notifier: N) -> Self {
        Self { composer, notifier }
    }

    pub fn composer(&self) -> &ReportComposer {
        &self.composer
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Compose and send the report for a reconciliation pass
    ///
    /// Attachments are removed only after the notifier accepted the message;
    /// on failure they stay on disk.
    pub async fn deliver(&self, report: &ReportResult) -> SyncResult<DeliveryReceipt> {
        let notification = self.composer.compose(report)?;
        self.notifier.send(&notification).await?;
        info!(
            run_id = %report.run_id,
            recipient = %notification.recipient,
            "report delivered"
        );

        let mut attachment_removed = false;
        for path in &notification.attachments {
            match std::fs::remove_file(path) {
                Ok(()) => attachment_removed = true,
                Err(e) => warn!(path = %path.display(), error = %e, "cannot remove attachment"),
            }
        }

        Ok(DeliveryReceipt {
            subject: notification.subject,
            recipient: notification.recipient,
            attachment: notification.attachments.into_iter().next(),
            attachment_removed,
        })
    }
}
