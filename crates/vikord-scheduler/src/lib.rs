//! `vikord-scheduler`: named recurring jobs driven by cron expressions.
//!
//! # Overview
//!
//! A [`recurrence::RecurrenceScheduler`] owns one Tokio task per job id.
//! Each task sleeps until the next occurrence of its expression (computed in
//! a single configured time zone), spawns the job callback and loops.
//! Scheduling an id that already exists replaces the old job.
//!
//! # Expressions
//!
//! | Fields | Layout                                   |
//! |--------|------------------------------------------|
//! | 5      | `min hour day-of-month month day-of-week` |
//! | 6      | `sec min hour day-of-month month day-of-week` |

pub mod cron;
pub mod error;
pub mod recurrence;

pub use cron::{is_one_shot, is_valid_cron};
pub use error::{Result, SchedulerError};
pub use recurrence::{JobCallback, JobFuture, RecurrenceScheduler, ScheduleOptions};
