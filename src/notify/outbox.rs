//! Spool-directory notifier
//!
//! Each report becomes one JSON envelope in an outbox directory. A mail relay
//! outside this crate picks envelopes up and performs the actual delivery.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

/// An attachment carried inside an envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeAttachment {
    pub file_name: String,
    pub contents: String,
}

/// On-disk form of a spooled notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Uuid,
    pub queued_at: DateTime<Utc>,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: Vec<String>,
    pub attachments: Vec<EnvelopeAttachment>,
}

/// Notifier writing envelopes into a directory
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    outbox_dir: PathBuf,
}

impl OutboxNotifier {
    pub fn new(outbox_dir: impl Into<PathBuf>) -> Self {
        Self {
            outbox_dir: outbox_dir.into(),
        }
    }

    pub fn outbox_dir(&self) -> &Path {
        &self.outbox_dir
    }

    /// Read every envelope currently queued, oldest first
    pub fn queued(&self) -> SyncResult<Vec<Envelope>> {
        let entries = std::fs::read_dir(&self.outbox_dir).map_err(|e| {
            SyncError::Notification(format!(
                "cannot list {}: {e}",
                self.outbox_dir.display()
            ))
        })?;

        let mut envelopes = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| SyncError::Notification(e.to_string()))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|e| {
                SyncError::Notification(format!("cannot read {}: {e}", path.display()))
            })?;
            let envelope: Envelope = serde_json::from_str(&text).map_err(|e| {
                SyncError::Notification(format!("corrupt envelope {}: {e}", path.display()))
            })?;
            envelopes.push(envelope);
        }
        envelopes.sort_by_key(|envelope| envelope.queued_at);
        Ok(envelopes)
    }

    fn envelope_for(notification: &Notification) -> SyncResult<Envelope> {
        let attachments = notification
            .attachments
            .iter()
            .map(|path| {
                let contents = std::fs::read_to_string(path).map_err(|e| {
                    SyncError::Notification(format!(
                        "cannot read attachment {}: {e}",
                        path.display()
                    ))
                })?;
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "attachment.csv".to_string());
                Ok(EnvelopeAttachment {
                    file_name,
                    contents,
                })
            })
            .collect::<SyncResult<Vec<_>>>()?;

        Ok(Envelope {
            id: Uuid::new_v4(),
            queued_at: Utc::now(),
            sender: notification.sender.clone(),
            recipient: notification.recipient.clone(),
            subject: notification.subject.clone(),
            body: notification.body.clone(),
            attachments,
        })
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send(&self, notification: &Notification) -> SyncResult<()> {
        let envelope = Self::envelope_for(notification)?;
        let json = serde_json::to_string_pretty(&envelope)
            .map_err(|e| SyncError::Notification(format!("cannot encode envelope: {e}")))?;

        // Only complete envelopes carry the .json extension.
        let partial = self.outbox_dir.join(format!("{}.partial", envelope.id));
        let target = self.outbox_dir.join(format!("{}.json", envelope.id));
        std::fs::write(&partial, json).map_err(|e| {
            SyncError::Notification(format!("cannot write {}: {e}", partial.display()))
        })?;
        std::fs::rename(&partial, &target).map_err(|e| {
            SyncError::Notification(format!("cannot write {}: {e}", target.display()))
        })?;

        info!(path = %target.display(), recipient = %envelope.recipient, "queued notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_envelope_inlines_attachments() {
        let outbox = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let attachment = scratch.path().join("missing_ids_20240101.csv");
        std::fs::write(&attachment, "id\n1\n").unwrap();

        let notifier = OutboxNotifier::new(outbox.path());
        notifier
            .send(&Notification {
                sender: "sync@example.com".to_string(),
                recipient: "ops@example.com".to_string(),
                subject: "Property Data Sync Report - 2024-01-01".to_string(),
                body: vec!["hello".to_string()],
                attachments: vec![attachment],
            })
            .await
            .unwrap();

        let queued = notifier.queued().unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].recipient, "ops@example.com");
        assert_eq!(queued[0].attachments[0].file_name, "missing_ids_20240101.csv");
        assert_eq!(queued[0].attachments[0].contents, "id\n1\n");
    }

    #[tokio::test]
    async fn test_missing_outbox_is_notification_error() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = OutboxNotifier::new(dir.path().join("absent"));
        let result = notifier
            .send(&Notification {
                sender: "a@example.com".to_string(),
                recipient: "b@example.com".to_string(),
                subject: "s".to_string(),
                body: Vec::new(),
                attachments: Vec::new(),
            })
            .await;
        assert!(matches!(result, Err(SyncError::Notification(_))));
    }
}
