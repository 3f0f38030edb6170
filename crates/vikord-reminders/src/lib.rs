//! `vikord-reminders`: persisted reminders, digests and bindings, and the
//! engine that fires them.
//!
//! # Overview
//!
//! Records live in SQLite ([`store::ReminderStore`], [`bindings::BindingStore`]).
//! The [`engine::ReminderEngine`] registers one scheduler job per enabled
//! record (`reminder_<id>` / `digest_<id>`), re-fetches live Vikunja state on
//! every fire and persists the next run. The stored `next_run_at` gates every
//! fire, so a daily cron tick can drive an "every N days" digest.

pub mod bindings;
pub mod cadence;
pub mod db;
pub mod digest;
pub mod engine;
pub mod error;
pub mod records;
pub mod store;

pub use bindings::BindingStore;
pub use cadence::{parse_cadence, Cadence};
pub use engine::{DigestOutcome, ReminderEngine, ReminderOutcome};
pub use error::{ReminderError, Result};
pub use records::{DigestRecord, MentionMode, NewDigest, NewReminder, ReminderRecord, TargetType};
pub use store::ReminderStore;
