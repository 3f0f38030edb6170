use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use croner::Cron;
use dashmap::DashMap;
use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cron;
use crate::error::{Result, SchedulerError};

/// Longest single sleep; the wall clock is re-checked after each one.
const MAX_SLEEP: std::time::Duration = std::time::Duration::from_secs(60);

pub type JobFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Invoked once per fire. Errors and panics are logged and never stop the job.
pub type JobCallback = Arc<dyn Fn() -> JobFuture + Send + Sync>;

#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleOptions {
    /// Anchor for the first fire when in the future.
    pub starts_at: Option<DateTime<Utc>>,
}

struct JobHandle {
    generation: u64,
    expression: String,
    timer: JoinHandle<()>,
}

/// Registry of named recurring jobs, all computed in one time zone.
pub struct RecurrenceScheduler {
    tz: Tz,
    jobs: Arc<DashMap<String, JobHandle>>,
    generation: AtomicU64,
}

impl RecurrenceScheduler {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            jobs: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Register `job_id`, replacing any job already registered under it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule(
        &self,
        job_id: &str,
        expression: &str,
        callback: JobCallback,
        options: ScheduleOptions,
    ) -> Result<()> {
        let parsed = cron::parse(expression)?;
        let first = cron::next_run(expression, options.starts_at, Utc::now(), &self.tz)
            .ok_or_else(|| SchedulerError::Exhausted(expression.to_string()))?;

        self.cancel(job_id);

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let timer = tokio::spawn(run_job(
            job_id.to_string(),
            generation,
            parsed,
            self.tz,
            first,
            callback,
            Arc::clone(&self.jobs),
        ));

        // a concurrent schedule for the same id may have landed since cancel
        if let Some(old) = self.jobs.insert(
            job_id.to_string(),
            JobHandle {
                generation,
                expression: expression.to_string(),
                timer,
            },
        ) {
            old.timer.abort();
        }
        info!(job_id, expression, first_run = %first, "job scheduled");
        Ok(())
    }

    /// Stop and remove `job_id`. A callback already running is left to finish.
    pub fn cancel(&self, job_id: &str) -> bool {
        match self.jobs.remove(job_id) {
            Some((_, handle)) => {
                handle.timer.abort();
                debug!(job_id, expression = %handle.expression, "job cancelled");
                true
            }
            None => false,
        }
    }

    /// Next run for an expression without registering anything.
    pub fn get_next_run(
        &self,
        expression: &str,
        starts_at: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        cron::next_run(expression, starts_at, Utc::now(), &self.tz)
    }

    pub fn is_valid_cron(&self, expression: &str) -> bool {
        cron::is_valid_cron(expression)
    }

    pub fn has_job(&self, job_id: &str) -> bool {
        self.jobs.contains_key(job_id)
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Cancel every job. Used at shutdown.
    pub fn stop_all(&self) {
        let count = self.jobs.len();
        self.jobs.retain(|_, handle| {
            handle.timer.abort();
            false
        });
        info!(count, "all scheduled jobs stopped");
    }
}

impl Drop for RecurrenceScheduler {
    fn drop(&mut self) {
        for entry in self.jobs.iter() {
            entry.timer.abort();
        }
    }
}

async fn run_job(
    job_id: String,
    generation: u64,
    cron: Cron,
    tz: Tz,
    first: DateTime<Utc>,
    callback: JobCallback,
    jobs: Arc<DashMap<String, JobHandle>>,
) {
    let mut next = first;
    loop {
        sleep_until(next).await;

        let id = job_id.clone();
        let fire = callback();
        tokio::spawn(async move {
            match AssertUnwindSafe(fire).catch_unwind().await {
                Ok(Ok(())) => debug!(job_id = %id, "job run finished"),
                Ok(Err(e)) => error!(job_id = %id, error = %e, "job run failed"),
                Err(_) => error!(job_id = %id, "job run panicked"),
            }
        });

        match cron::next_after(&cron, &Utc::now().with_timezone(&tz)) {
            Some(n) => next = n,
            None => {
                warn!(job_id = %job_id, "no further occurrences, job retired");
                jobs.remove_if(&job_id, |_, h| h.generation == generation);
                return;
            }
        }
    }
}

async fn sleep_until(at: DateTime<Utc>) {
    loop {
        let remaining = match (at - Utc::now()).to_std() {
            Ok(d) if !d.is_zero() => d,
            _ => return,
        };
        tokio::time::sleep(remaining.min(MAX_SLEEP)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counting(counter: Arc<AtomicUsize>, fail: bool) -> JobCallback {
        Arc::new(move || -> JobFuture {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if fail {
                    anyhow::bail!("boom");
                }
                Ok(())
            })
        })
    }

    fn noop() -> JobCallback {
        Arc::new(|| -> JobFuture { Box::pin(async { Ok(()) }) })
    }

    #[tokio::test]
    async fn schedule_replaces_same_id() {
        let s = RecurrenceScheduler::new(chrono_tz::UTC);
        s.schedule("reminder_1", "0 9 * * *", noop(), ScheduleOptions::default())
            .unwrap();
        s.schedule("reminder_1", "0 10 * * *", noop(), ScheduleOptions::default())
            .unwrap();
        assert_eq!(s.job_count(), 1);
        assert!(s.has_job("reminder_1"));
    }

    #[tokio::test]
    async fn replaced_job_stops_firing() {
        let s = RecurrenceScheduler::new(chrono_tz::UTC);
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        s.schedule(
            "reminder_5",
            "* * * * * *",
            counting(Arc::clone(&first), false),
            ScheduleOptions::default(),
        )
        .unwrap();
        s.schedule(
            "reminder_5",
            "* * * * * *",
            counting(Arc::clone(&second), false),
            ScheduleOptions::default(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert!(second.load(Ordering::SeqCst) >= 2);
        s.stop_all();
    }

    #[tokio::test]
    async fn cancel_reports_presence() {
        let s = RecurrenceScheduler::new(chrono_tz::UTC);
        s.schedule("digest_2", "0 9 * * *", noop(), ScheduleOptions::default())
            .unwrap();
        assert!(s.cancel("digest_2"));
        assert!(!s.cancel("digest_2"));
        assert!(!s.has_job("digest_2"));
    }

    #[tokio::test]
    async fn invalid_expression_is_rejected_without_registering() {
        let s = RecurrenceScheduler::new(chrono_tz::UTC);
        let err = s
            .schedule("reminder_3", "every tuesday", noop(), ScheduleOptions::default())
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidExpression { .. }));
        assert_eq!(s.job_count(), 0);
        assert_eq!(s.get_next_run("every tuesday", None), None);
    }

    #[tokio::test]
    async fn failing_callback_keeps_job_alive() {
        let s = RecurrenceScheduler::new(chrono_tz::UTC);
        let counter = Arc::new(AtomicUsize::new(0));
        s.schedule(
            "reminder_4",
            "* * * * * *",
            counting(Arc::clone(&counter), true),
            ScheduleOptions::default(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(counter.load(Ordering::SeqCst) >= 2);
        assert!(s.has_job("reminder_4"));
        s.stop_all();
    }

    #[tokio::test]
    async fn stop_all_silences_everything() {
        let s = RecurrenceScheduler::new(chrono_tz::UTC);
        let counter = Arc::new(AtomicUsize::new(0));
        for id in ["a", "b"] {
            s.schedule(
                id,
                "* * * * * *",
                counting(Arc::clone(&counter), false),
                ScheduleOptions::default(),
            )
            .unwrap();
        }
        s.stop_all();
        assert_eq!(s.job_count(), 0);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
