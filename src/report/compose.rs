//! Turning a reconciliation result into a notification

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::traits::Notification;
use crate::types::*;

/// How many missing identifiers are listed in the body before falling back to an attachment
pub const DEFAULT_INLINE_LIMIT: usize = 100;

/// Header row of the missing-identifier attachment
pub const ATTACHMENT_HEADER: &str = "id";

/// Builds report notifications
#[derive(Debug, Clone)]
pub struct ReportComposer {
    sender: String,
    recipient: String,
    inline_limit: usize,
    attachment_dir: PathBuf,
}

impl ReportComposer {
    /// Create a composer with the default inline limit, writing attachments to `attachment_dir`
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        attachment_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            inline_limit: DEFAULT_INLINE_LIMIT,
            attachment_dir: attachment_dir.into(),
        }
    }

    /// Override how many identifiers are listed inline
    pub fn with_inline_limit(mut self, inline_limit: usize) -> Self {
        self.inline_limit = inline_limit;
        self
    }

    pub fn inline_limit(&self) -> usize {
        self.inline_limit
    }

    /// Subject line for a run started at `started_at`
    pub fn subject(started_at: &DateTime<Utc>) -> String {
        format!(
            "Property Data Sync Report - {}",
            started_at.format("%Y-%m-%d")
        )
    }

    /// Body lines for a report
    ///
    /// At most `inline_limit` identifiers are listed; past that the body
    /// points at the attachment.
    pub fn body(&self, report: &ReportResult) -> Vec<String> {
        let mut body = vec![
            "Property Data Synchronization Report".to_string(),
            String::new(),
            format!("New properties added: {}", report.inserted),
            String::new(),
            format!("Missing properties found: {}", report.missing_count()),
            String::new(),
            "Missing Property IDs:".to_string(),
        ];
        body.extend(
            report
                .missing
                .iter()
                .take(self.inline_limit)
                .map(|id| id.to_string()),
        );
        if self.needs_attachment(report) {
            body.push(String::new());
            body.push("Full list attached in CSV file.".to_string());
        }
        body
    }

    /// Whether the missing list is too long to send inline
    pub fn needs_attachment(&self, report: &ReportResult) -> bool {
        report.missing_count() > self.inline_limit
    }

    /// Path the attachment for a run started at `started_at` is written to
    pub fn attachment_path(&self, started_at: &DateTime<Utc>) -> PathBuf {
        self.attachment_dir
            .join(format!("missing_ids_{}.csv", started_at.format("%Y%m%d")))
    }

    /// Build the notification, writing the CSV attachment when one is needed
    pub fn compose(&self, report: &ReportResult) -> SyncResult<Notification> {
        let mut attachments = Vec::new();
        if self.needs_attachment(report) {
            let path = self.attachment_path(&report.started_at);
            write_missing_csv(&path, &report.missing)?;
            info!(
                run_id = %report.run_id,
                path = %path.display(),
                missing = report.missing_count(),
                "wrote missing-identifier attachment"
            );
            attachments.push(path);
        }

        Ok(Notification {
            sender: self.sender.clone(),
            recipient: self.recipient.clone(),
            subject: Self::subject(&report.started_at),
            body: self.body(report),
            attachments,
        })
    }
}

/// Write identifiers as a one-column CSV with an `id` header
pub fn write_missing_csv(path: &Path, missing: &[PropertyId]) -> SyncResult<()> {
    let attachment_error =
        |e: csv::Error| SyncError::Notification(format!("cannot write {}: {e}", path.display()));

    let mut writer = csv::Writer::from_path(path).map_err(attachment_error)?;
    writer
        .write_record([ATTACHMENT_HEADER])
        .map_err(attachment_error)?;
    for id in missing {
        writer
            .write_record([id.to_string()])
            .map_err(attachment_error)?;
    }
    writer.flush().map_err(|e| {
        SyncError::Notification(format!("cannot write {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn report(missing: Vec<PropertyId>) -> ReportResult {
        ReportResult {
            run_id: Uuid::new_v4(),
            started_at: Utc.with_ymd_and_hms(2024, 3, 4, 3, 0, 0).unwrap(),
            inserted: 1,
            missing,
            skipped: 0,
        }
    }

    #[test]
    fn test_subject_carries_run_date() {
        let r = report(vec![]);
        assert_eq!(
            ReportComposer::subject(&r.started_at),
            "Property Data Sync Report - 2024-03-04"
        );
    }

    #[test]
    fn test_small_report_is_inline() {
        let dir = tempfile::tempdir().unwrap();
        let composer = ReportComposer::new("sync@example.com", "ops@example.com", dir.path());
        let notification = composer.compose(&report(vec![1, 5])).unwrap();

        assert!(notification.attachments.is_empty());
        assert!(notification.body.contains(&"New properties added: 1".to_string()));
        assert!(notification.body.contains(&"Missing properties found: 2".to_string()));
        assert_eq!(&notification.body[notification.body.len() - 2..], ["1", "5"]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_limit_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let composer = ReportComposer::new("s@example.com", "r@example.com", dir.path());
        let notification = composer.compose(&report((1..=100).collect())).unwrap();

        assert!(notification.attachments.is_empty());
        assert!(!notification
            .body
            .contains(&"Full list attached in CSV file.".to_string()));
    }

    #[test]
    fn test_large_report_gets_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let composer = ReportComposer::new("s@example.com", "r@example.com", dir.path());
        let notification = composer.compose(&report((1..=150).collect())).unwrap();

        assert_eq!(
            notification.attachments,
            vec![dir.path().join("missing_ids_20240304.csv")]
        );
        let listed = notification
            .body
            .iter()
            .filter(|line| line.parse::<PropertyId>().is_ok())
            .count();
        assert_eq!(listed, 100);
        assert_eq!(
            notification.body.last().map(String::as_str),
            Some("Full list attached in CSV file.")
        );

        let contents = std::fs::read_to_string(&notification.attachments[0]).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 151);
        assert_eq!(lines[0], "id");
        assert_eq!(lines[150], "150");
    }

    #[test]
    fn test_custom_inline_limit() {
        let dir = tempfile::tempdir().unwrap();
        let composer =
            ReportComposer::new("s@example.com", "r@example.com", dir.path()).with_inline_limit(2);
        let r = report(vec![1, 2, 3]);

        assert!(composer.needs_attachment(&r));
        assert_eq!(composer.compose(&r).unwrap().attachments.len(), 1);
    }

    #[test]
    fn test_attachment_write_failure_is_notification_error() {
        let dir = tempfile::tempdir().unwrap();
        let composer = ReportComposer::new(
            "s@example.com",
            "r@example.com",
            dir.path().join("does-not-exist"),
        );
        let result = composer.compose(&report((1..=101).collect()));
        assert!(matches!(result, Err(SyncError::Notification(_))));
    }
}
