//! Notification sinks

pub mod outbox;

pub use outbox::{Envelope, EnvelopeAttachment, OutboxNotifier};
