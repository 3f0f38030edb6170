use std::sync::Arc;

use chrono_tz::Tz;
use vikord_core::TaskApi;
use vikord_reminders::{BindingStore, ReminderEngine};
use vikord_users::IdentityStore;

/// Everything a slash command can touch.
pub struct BotContext {
    pub identities: Arc<IdentityStore>,
    pub bindings: Arc<BindingStore>,
    pub engine: Arc<ReminderEngine>,
    pub api: Arc<dyn TaskApi>,
    /// Zone user-entered times are read in.
    pub timezone: Tz,
}
