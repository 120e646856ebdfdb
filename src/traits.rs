//! Traits for storage and notification backends

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::types::*;

/// Storage abstraction for previously accepted property records
///
/// The reconciliation job only ever reads identifiers and appends new
/// records; it never updates or deletes. Any backend (SQLite, a document
/// database, in-memory) can take part by implementing these methods.
#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Fetch every identifier currently stored
    async fn fetch_ids(&self) -> SyncResult<BTreeSet<PropertyId>>;

    /// Insert records as one bulk operation, returning how many were written
    ///
    /// Every record passed here carries an identifier not yet in the store.
    async fn insert_many(&mut self, records: &[Record]) -> SyncResult<usize>;

    /// Release the underlying connection
    ///
    /// A closed store reconnects on next use.
    async fn close(&mut self) -> SyncResult<()>;
}

/// A message handed to a notification sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    /// Body, one entry per line
    pub body: Vec<String>,
    /// Files to attach, read by the sink at send time
    pub attachments: Vec<PathBuf>,
}

impl Notification {
    /// Body lines joined into a single text
    pub fn body_text(&self) -> String {
        self.body.join("\n")
    }
}

/// Delivery abstraction for reports
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification; attachments must still exist when this is called
    async fn send(&self, notification: &Notification) -> SyncResult<()>;
}
