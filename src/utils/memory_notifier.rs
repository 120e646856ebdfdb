//! In-memory notifier for testing

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::traits::*;
use crate::types::*;

/// A notification as it looked when it was handed over
#[derive(Debug, Clone, PartialEq)]
pub struct SentNotification {
    pub notification: Notification,
    /// Attachment path and its contents at send time
    pub attachments: Vec<(PathBuf, String)>,
}

/// Notifier that keeps every delivered message in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    sent: Arc<Mutex<Vec<SentNotification>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered so far
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Make subsequent sends fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, notification: &Notification) -> SyncResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::Notification(
                "memory notifier rejected the message".to_string(),
            ));
        }

        let mut attachments = Vec::with_capacity(notification.attachments.len());
        for path in &notification.attachments {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                SyncError::Notification(format!(
                    "cannot read attachment {}: {e}",
                    path.display()
                ))
            })?;
            attachments.push((path.clone(), contents));
        }

        self.sent
            .lock()
            .map_err(|_| SyncError::Notification("memory notifier lock poisoned".to_string()))?
            .push(SentNotification {
                notification: notification.clone(),
                attachments,
            });
        Ok(())
    }
}
