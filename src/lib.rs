//! # Property Sync
//!
//! Reconciles a batch of property records, exported as JSON, against the
//! records already held in a store, and reports the outcome.
//!
//! ## Features
//!
//! - **Reconciliation**: new records are inserted in one bulk operation,
//!   stored identifiers missing from the batch are reported
//! - **Reports**: counts plus the missing identifiers, inline for short lists
//!   and as a CSV attachment for long ones
//! - **Storage abstraction**: trait-based store with SQLite and in-memory backends
//! - **Notification abstraction**: trait-based sink with outbox and in-memory backends
//! - **Explicit configuration**: TOML file with environment overrides
//! - **Logging**: dated daily log file plus console output, configured alongside the job
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use property_sync::{SyncConfig, SyncJob};
//!
//! # async fn run() -> Result<(), property_sync::SyncError> {
//! let config = SyncConfig::load("property-sync.toml")?;
//! let _guard = property_sync::logging::init_logging(&config.logging)?;
//! let mut job = SyncJob::from_config(&config)?;
//! let summary = job.run().await?;
//! println!("inserted {}", summary.report.inserted);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod job;
pub mod logging;
pub mod notify;
pub mod reconciliation;
pub mod report;
pub mod source;
pub mod store;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use job::*;
pub use reconciliation::{diff, Diff, Reconciler};
pub use report::*;
pub use traits::*;
pub use types::*;
