use std::sync::{Arc, Weak};

use chrono::{DateTime, Days, Duration, Utc};
use tracing::{debug, info, warn};
use vikord_core::types::Task;
use vikord_core::TaskApi;
use vikord_notify::builder::MAX_DIGEST_TASKS;
use vikord_notify::delivery::DeliveryTarget;
use vikord_notify::{format, Delivery, NotificationContext, NotificationPayload, PayloadBuilder, RenderedMessage};
use vikord_scheduler::{is_one_shot, JobCallback, JobFuture, RecurrenceScheduler, ScheduleOptions};

use crate::bindings::BindingStore;
use crate::digest::select_digest_tasks;
use crate::error::{ReminderError, Result};
use crate::records::{
    DigestRecord, MentionMode, NewDigest, NewReminder, ReminderRecord, TargetType,
};
use crate::store::ReminderStore;

/// A fire this close before the stored `next_run_at` still counts as due.
const GATE_TOLERANCE_SECS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderOutcome {
    Delivered,
    DeliveryFailed,
    NotDue,
    /// The task no longer exists upstream; the reminder was disabled.
    TaskGone,
    Missing,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestOutcome {
    Delivered { tasks: usize },
    DeliveryFailed,
    NotDue,
    /// No task qualified; nothing was sent.
    Empty,
    /// The project no longer exists upstream; the digest was disabled.
    ProjectGone,
    Missing,
    Disabled,
}

pub fn reminder_job_id(id: i64) -> String {
    format!("reminder_{id}")
}

pub fn digest_job_id(id: i64) -> String {
    format!("digest_{id}")
}

fn gate_open(next_run_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    next_run_at.map_or(true, |next| now + Duration::seconds(GATE_TOLERANCE_SECS) >= next)
}

/// Message content for a reminder. The embed is the same in every mode;
/// only this prefix changes.
pub fn mention_content(mode: MentionMode, payload: &NotificationPayload) -> Option<String> {
    match mode {
        MentionMode::Everyone => Some("@everyone".to_string()),
        MentionMode::Assignees => {
            let Some(NotificationContext::Task(ctx)) = &payload.context else {
                return None;
            };
            let mentions: Vec<String> = ctx
                .assignees
                .iter()
                .map(|a| match &a.chat_user_id {
                    Some(id) => format!("<@{id}>"),
                    None => a.username.clone(),
                })
                .collect();
            (!mentions.is_empty()).then(|| mentions.join(" "))
        }
    }
}

/// Lifecycle of persisted reminders and digests: startup load, creation,
/// firing and deletion.
pub struct ReminderEngine {
    store: Arc<ReminderStore>,
    bindings: Arc<BindingStore>,
    scheduler: Arc<RecurrenceScheduler>,
    builder: Arc<PayloadBuilder>,
    api: Arc<dyn TaskApi>,
    delivery: Arc<dyn Delivery>,
}

impl ReminderEngine {
    pub fn new(
        store: Arc<ReminderStore>,
        bindings: Arc<BindingStore>,
        scheduler: Arc<RecurrenceScheduler>,
        builder: Arc<PayloadBuilder>,
        api: Arc<dyn TaskApi>,
        delivery: Arc<dyn Delivery>,
    ) -> Self {
        Self {
            store,
            bindings,
            scheduler,
            builder,
            api,
            delivery,
        }
    }

    pub fn scheduler(&self) -> &RecurrenceScheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &ReminderStore {
        &self.store
    }

    /// Register a job for every enabled record. Records whose expression no
    /// longer schedules are logged and skipped. Returns how many reminders
    /// and digests were scheduled.
    pub fn start(self: &Arc<Self>) -> Result<(usize, usize)> {
        let mut reminders = 0;
        for r in self.store.list_enabled_reminders()? {
            match self.schedule_reminder(&r) {
                Ok(()) => reminders += 1,
                Err(e) => warn!(reminder_id = r.id, error = %e, "reminder not scheduled at startup"),
            }
        }

        let mut digests = 0;
        for d in self.store.list_enabled_digests()? {
            match self.schedule_digest(&d) {
                Ok(()) => digests += 1,
                Err(e) => warn!(digest_id = d.id, error = %e, "digest not scheduled at startup"),
            }
        }

        info!(reminders, digests, "reminder engine started");
        Ok((reminders, digests))
    }

    fn schedule_reminder(self: &Arc<Self>, r: &ReminderRecord) -> Result<()> {
        let engine = Arc::downgrade(self);
        let id = r.id;
        let callback: JobCallback = Arc::new(move || -> JobFuture {
            let engine: Weak<Self> = engine.clone();
            Box::pin(async move {
                let Some(engine) = engine.upgrade() else {
                    return Ok(());
                };
                let outcome = engine.fire_reminder(id).await?;
                debug!(reminder_id = id, ?outcome, "reminder fired");
                Ok(())
            })
        });

        self.scheduler.schedule(
            &reminder_job_id(r.id),
            &r.cron_expression,
            callback,
            ScheduleOptions {
                starts_at: r.starts_at,
            },
        )?;
        Ok(())
    }

    fn schedule_digest(self: &Arc<Self>, d: &DigestRecord) -> Result<()> {
        let engine = Arc::downgrade(self);
        let id = d.id;
        let callback: JobCallback = Arc::new(move || -> JobFuture {
            let engine: Weak<Self> = engine.clone();
            Box::pin(async move {
                let Some(engine) = engine.upgrade() else {
                    return Ok(());
                };
                let outcome = engine.fire_digest(id).await?;
                debug!(digest_id = id, ?outcome, "digest fired");
                Ok(())
            })
        });

        self.scheduler.schedule(
            &digest_job_id(d.id),
            &d.cron_expression,
            callback,
            ScheduleOptions::default(),
        )?;
        Ok(())
    }

    /// Persist and schedule a reminder. A future `starts_at` is the literal
    /// first run; otherwise the expression's next occurrence is.
    pub fn create_reminder(self: &Arc<Self>, new: NewReminder) -> Result<ReminderRecord> {
        if !self.scheduler.is_valid_cron(&new.cron_expression) {
            return Err(ReminderError::InvalidCadence(format!(
                "Expressão cron inválida: `{}`",
                new.cron_expression
            )));
        }

        let next_run_at = self
            .scheduler
            .get_next_run(&new.cron_expression, new.starts_at)
            .ok_or_else(|| {
                ReminderError::InvalidCadence(format!(
                    "A expressão `{}` não tem próxima execução",
                    new.cron_expression
                ))
            })?;

        let record = self.store.insert_reminder(&new, Some(next_run_at))?;
        self.schedule_reminder(&record)?;
        info!(reminder_id = record.id, task_id = record.task_id, next_run_at = %next_run_at, "reminder created");
        Ok(record)
    }

    pub fn create_digest(self: &Arc<Self>, new: NewDigest) -> Result<DigestRecord> {
        if !self.scheduler.is_valid_cron(&new.cron_expression) {
            return Err(ReminderError::InvalidCadence(format!(
                "Expressão cron inválida: `{}`",
                new.cron_expression
            )));
        }

        let next_run_at = self.next_occurrence(&new.cron_expression)?;
        let record = self.store.insert_digest(&new, Some(next_run_at))?;
        self.schedule_digest(&record)?;
        info!(digest_id = record.id, project_id = record.project_id, next_run_at = %next_run_at, "digest created");
        Ok(record)
    }

    fn next_occurrence(&self, expression: &str) -> Result<DateTime<Utc>> {
        self.scheduler.get_next_run(expression, None).ok_or_else(|| {
            ReminderError::InvalidCadence(format!("A expressão `{expression}` não tem próxima execução"))
        })
    }

    pub async fn fire_reminder(&self, id: i64) -> Result<ReminderOutcome> {
        let Some(r) = self.store.get_reminder(id)? else {
            self.scheduler.cancel(&reminder_job_id(id));
            warn!(reminder_id = id, "reminder fired without a stored record, job cancelled");
            return Ok(ReminderOutcome::Missing);
        };
        if !r.enabled {
            self.scheduler.cancel(&reminder_job_id(id));
            return Ok(ReminderOutcome::Disabled);
        }

        let now = Utc::now();
        if !gate_open(r.next_run_at, now) {
            debug!(reminder_id = id, next_run_at = ?r.next_run_at, "reminder not due yet");
            return Ok(ReminderOutcome::NotDue);
        }

        let Some(task) = self.api.get_task(r.task_id).await? else {
            self.store.disable_reminder(id)?;
            self.scheduler.cancel(&reminder_job_id(id));
            warn!(reminder_id = id, task_id = r.task_id, "task gone upstream, reminder disabled");
            return Ok(ReminderOutcome::TaskGone);
        };

        let project = self.builder.project_info(task.project_id).await;
        let payload = self.builder.build_reminder(&task, project, r.message.as_deref());
        let mut message = format(&payload);
        if let Some(content) = mention_content(r.mention_mode, &payload) {
            message = message.with_content(content);
        }

        let outcome = match self.reminder_target(&r, &task)? {
            Some(target) => {
                if self.deliver(&target, &message).await {
                    ReminderOutcome::Delivered
                } else {
                    ReminderOutcome::DeliveryFailed
                }
            }
            None => {
                warn!(reminder_id = id, project_id = task.project_id, "no channel bound for reminder");
                ReminderOutcome::DeliveryFailed
            }
        };

        if is_one_shot(&r.cron_expression) {
            self.scheduler.cancel(&reminder_job_id(id));
            self.store.delete_reminder(id)?;
            info!(reminder_id = id, "one-shot reminder fired and removed");
        } else {
            let next = self.scheduler.get_next_run(&r.cron_expression, None);
            self.store.set_reminder_next_run(id, next)?;
            debug!(reminder_id = id, next_run_at = ?next, "reminder rescheduled");
        }

        Ok(outcome)
    }

    fn reminder_target(&self, r: &ReminderRecord, task: &Task) -> Result<Option<DeliveryTarget>> {
        match (r.target_type, &r.guild_id) {
            (TargetType::Dm, _) => Ok(Some(DeliveryTarget::DirectMessage(r.owner_discord_id.clone()))),
            (TargetType::Guild, Some(guild)) => Ok(self
                .bindings
                .channel_for_project(guild, task.project_id)?
                .map(DeliveryTarget::Channel)),
            (TargetType::Guild, None) => Ok(None),
        }
    }

    pub async fn fire_digest(&self, id: i64) -> Result<DigestOutcome> {
        let Some(d) = self.store.get_digest(id)? else {
            self.scheduler.cancel(&digest_job_id(id));
            warn!(digest_id = id, "digest fired without a stored record, job cancelled");
            return Ok(DigestOutcome::Missing);
        };
        if !d.enabled {
            self.scheduler.cancel(&digest_job_id(id));
            return Ok(DigestOutcome::Disabled);
        }

        let now = Utc::now();
        if !gate_open(d.next_run_at, now) {
            debug!(digest_id = id, next_run_at = ?d.next_run_at, "digest not due yet");
            return Ok(DigestOutcome::NotDue);
        }

        let Some(project) = self.api.get_project(d.project_id).await? else {
            self.store.disable_digest(id)?;
            self.scheduler.cancel(&digest_job_id(id));
            warn!(digest_id = id, project_id = d.project_id, "project gone upstream, digest disabled");
            return Ok(DigestOutcome::ProjectGone);
        };

        let tasks = self.api.get_project_tasks(d.project_id).await?;
        let selected = select_digest_tasks(tasks, d.min_priority);

        let outcome = if selected.is_empty() {
            debug!(digest_id = id, "no qualifying tasks, digest skipped");
            DigestOutcome::Empty
        } else {
            let message = format(&self.builder.build_digest(&project, &selected));
            match self.digest_target(&d)? {
                Some(target) => {
                    if self.deliver(&target, &message).await {
                        DigestOutcome::Delivered {
                            tasks: selected.len().min(MAX_DIGEST_TASKS),
                        }
                    } else {
                        DigestOutcome::DeliveryFailed
                    }
                }
                None => {
                    warn!(digest_id = id, project_id = d.project_id, "no channel bound for digest");
                    DigestOutcome::DeliveryFailed
                }
            }
        };

        let next = self.next_digest_run(&d, now);
        self.store.set_digest_next_run(id, next)?;
        debug!(digest_id = id, next_run_at = ?next, "digest rescheduled");
        Ok(outcome)
    }

    fn digest_target(&self, d: &DigestRecord) -> Result<Option<DeliveryTarget>> {
        if d.target_type == TargetType::Dm {
            return Ok(Some(DeliveryTarget::DirectMessage(d.owner_discord_id.clone())));
        }
        if let Some(channel) = &d.channel_id {
            return Ok(Some(DeliveryTarget::Channel(channel.clone())));
        }
        match &d.guild_id {
            Some(guild) => Ok(self
                .bindings
                .channel_for_project(guild, d.project_id)?
                .map(DeliveryTarget::Channel)),
            None => Ok(None),
        }
    }

    /// Interval digests step the previous `next_run_at` forward in local
    /// calendar days until it is in the future; the rest follow the
    /// expression.
    fn next_digest_run(&self, d: &DigestRecord, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if let (Some(days), Some(prev)) = (d.interval_days, d.next_run_at) {
            let tz = self.scheduler.timezone();
            let step = Days::new(u64::from(days.max(1)));
            let mut next = prev.with_timezone(&tz);
            loop {
                next = next.checked_add_days(step)?;
                if next.with_timezone(&Utc) > now {
                    return Some(next.with_timezone(&Utc));
                }
            }
        }
        self.scheduler.get_next_run(&d.cron_expression, None)
    }

    async fn deliver(&self, target: &DeliveryTarget, message: &RenderedMessage) -> bool {
        match self.delivery.send(target, message).await {
            Ok(()) => true,
            Err(e) => {
                warn!(target = %target, error = %e, "delivery failed, dropped");
                false
            }
        }
    }

    pub fn reminders_for(&self, owner_discord_id: &str) -> Result<Vec<ReminderRecord>> {
        self.store.list_reminders_by_owner(owner_discord_id)
    }

    pub fn digests_for(&self, owner_discord_id: &str) -> Result<Vec<DigestRecord>> {
        self.store.list_digests_by_owner(owner_discord_id)
    }

    /// Cancel the job, then remove the record.
    pub fn delete_reminder(&self, id: i64, owner_discord_id: &str) -> Result<()> {
        let r = self
            .store
            .get_reminder(id)?
            .ok_or(ReminderError::NotFound { kind: "reminder", id })?;
        if r.owner_discord_id != owner_discord_id {
            return Err(ReminderError::NotOwner { kind: "reminder", id });
        }
        self.scheduler.cancel(&reminder_job_id(id));
        self.store.delete_reminder(id)?;
        info!(reminder_id = id, "reminder deleted");
        Ok(())
    }

    /// Cancel the job, then remove the record.
    pub fn delete_digest(&self, id: i64, owner_discord_id: &str) -> Result<()> {
        let d = self
            .store
            .get_digest(id)?
            .ok_or(ReminderError::NotFound { kind: "digest", id })?;
        if d.owner_discord_id != owner_discord_id {
            return Err(ReminderError::NotOwner { kind: "digest", id });
        }
        self.scheduler.cancel(&digest_job_id(id));
        self.store.delete_digest(id)?;
        info!(digest_id = id, "digest deleted");
        Ok(())
    }
}
