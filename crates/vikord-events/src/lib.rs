//! `vikord-events`: inbound Vikunja webhook handling.
//!
//! Raw request bytes are authenticated ([`signature`]), parsed into an
//! envelope, and classified into a closed set of typed events
//! ([`classify`]). [`ingest::ingest`] chains the three steps for the HTTP layer.

pub mod classify;
pub mod error;
pub mod event;
pub mod ingest;
pub mod kind;
pub mod signature;

pub use classify::{classify, WebhookEnvelope};
pub use error::{ClassifyError, IngestError, SignatureError};
pub use event::{EventData, WebhookEvent};
pub use ingest::ingest;
pub use kind::{EventFamily, EventKind};
pub use signature::SignatureValidator;
