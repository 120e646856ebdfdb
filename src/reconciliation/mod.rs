//! Reconciliation of an incoming batch against the stored collection
//!
//! A run fetches the stored identifiers, splits the batch into records the
//! store has not seen yet, works out which stored identifiers the batch no
//! longer mentions, and appends the new records in one bulk insert.

use chrono::Utc;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

/// Set difference between a batch and the stored identifiers
#[derive(Debug, Clone, PartialEq)]
pub struct Diff {
    /// Batch records whose identifier is not stored yet, in batch order
    pub new: Vec<Record>,
    /// Stored identifiers absent from the batch, ascending
    pub missing: Vec<PropertyId>,
    /// Batch records without an identifier, or repeating an earlier one
    pub skipped: usize,
}

/// Compute the new and missing sets
///
/// Records without an identifier take no part. When an identifier repeats
/// within the batch only its first record counts.
pub fn diff(batch: &[Record], existing: &BTreeSet<PropertyId>) -> Diff {
    let mut seen: HashSet<PropertyId> = HashSet::with_capacity(batch.len());
    let mut new = Vec::new();
    let mut skipped = 0;

    for record in batch {
        let Some(id) = record.id else {
            skipped += 1;
            continue;
        };
        if !seen.insert(id) {
            warn!(id, "duplicate identifier in batch, keeping first occurrence");
            skipped += 1;
            continue;
        }
        if !existing.contains(&id) {
            new.push(record.clone());
        }
    }

    let missing = existing
        .iter()
        .copied()
        .filter(|id| !seen.contains(id))
        .collect();

    Diff {
        new,
        missing,
        skipped,
    }
}

/// Runs reconciliation passes against a store
pub struct Reconciler<S: PropertyStore> {
    store: S,
}

impl<S: PropertyStore> Reconciler<S> {
    /// Create a reconciler owning the given store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutably borrow the underlying store
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Give back the underlying store
    pub fn into_store(self) -> S {
        self.store
    }

    /// Reconcile a batch: fetch ids, diff, insert new records, report
    ///
    /// The insert is skipped entirely when nothing is new. Any store failure
    /// ends the pass with no report.
    pub async fn reconcile(&mut self, batch: &[Record]) -> SyncResult<ReportResult> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let existing = self.store.fetch_ids().await?;
        info!(%run_id, existing = existing.len(), "fetched stored identifiers");

        let Diff {
            new,
            missing,
            skipped,
        } = diff(batch, &existing);
        info!(
            %run_id,
            new = new.len(),
            missing = missing.len(),
            skipped,
            "computed batch difference"
        );

        let inserted = if new.is_empty() {
            debug!(%run_id, "no new records, skipping insert");
            0
        } else {
            let written = self.store.insert_many(&new).await?;
            info!(%run_id, inserted = written, "inserted new records");
            written
        };

        Ok(ReportResult {
            run_id,
            started_at,
            inserted,
            missing,
            skipped,
        })
    }
}
