//! Periodic jobs.
//!
//! A [`JobScheduler`] accepts `(job, trigger, job_id)` and fires the job on every
//! trigger. [`TokioScheduler`] runs one sequential loop per job, so a single job
//! never overlaps with itself; a failed run is logged and the loop keeps going.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc, Weekday};
use cron::Schedule;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// When a job fires. Cron expressions carry a seconds field and are evaluated in UTC.
#[derive(Debug, Clone)]
pub enum Trigger {
    Interval(Duration),
    Cron(Box<Schedule>),
}

impl Trigger {
    pub fn every(period: Duration) -> Result<Self, JobError> {
        if period.is_zero() {
            return Err(JobError::InvalidTrigger("interval must be positive".into()));
        }
        Ok(Self::Interval(period))
    }

    /// `sec min hour day-of-month month day-of-week [year]`.
    pub fn cron(expr: &str) -> Result<Self, JobError> {
        Schedule::from_str(expr)
            .map(|schedule| Self::Cron(Box::new(schedule)))
            .map_err(|e| JobError::InvalidTrigger(format!("'{expr}': {e}")))
    }

    pub fn daily(hour: u32, minute: u32) -> Result<Self, JobError> {
        check_time_of_day(hour, minute)?;
        Self::cron(&format!("0 {minute} {hour} * * *"))
    }

    pub fn weekly(weekday: Weekday, hour: u32, minute: u32) -> Result<Self, JobError> {
        check_time_of_day(hour, minute)?;
        Self::cron(&format!("0 {minute} {hour} * * {weekday}"))
    }

    /// Next firing strictly after `now`; `None` once a bounded schedule is exhausted.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Interval(period) => {
                chrono::Duration::from_std(*period).ok().map(|period| now + period)
            }
            Trigger::Cron(schedule) => schedule.after(&now).next(),
        }
    }

    /// How long to sleep from `now` until the next firing.
    pub fn delay_from(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self {
            Trigger::Interval(period) => Some(*period),
            Trigger::Cron(_) => self
                .next_after(now)
                .map(|next| (next - now).to_std().unwrap_or_default()),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Interval(period) => write!(f, "every {}s", period.as_secs()),
            Trigger::Cron(schedule) => write!(f, "cron '{schedule}'"),
        }
    }
}

fn check_time_of_day(hour: u32, minute: u32) -> Result<(), JobError> {
    if hour > 23 || minute > 59 {
        return Err(JobError::InvalidTrigger(format!(
            "invalid time of day {hour:02}:{minute:02}"
        )));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("job '{0}' is already scheduled")]
    DuplicateJob(String),
    #[error("invalid trigger: {0}")]
    InvalidTrigger(String),
    #[error("scheduler is shut down")]
    ShutDown,
}

#[async_trait]
pub trait Job: Send + Sync + 'static {
    async fn run(&self) -> anyhow::Result<()>;
}

pub trait JobScheduler: Send + Sync {
    fn schedule(&self, job: Arc<dyn Job>, trigger: Trigger, job_id: &str) -> Result<(), JobError>;
}

/// Hands rotated log files to whatever ships them off-host.
#[async_trait]
pub trait LogShipper: Send + Sync {
    async fn ship(&self, files: Vec<PathBuf>) -> anyhow::Result<()>;
}

/// Scheduler backed by tokio tasks.
pub struct TokioScheduler {
    cancel: CancellationToken,
    handles: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TokioScheduler {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn job_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.handles.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Cancel every loop and wait up to `timeout` for the in-flight runs to finish.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn shutdown(&self, timeout: Duration) {
        self.cancel.cancel();
        let handles: Vec<(String, JoinHandle<()>)> = self.handles.lock().drain().collect();
        for (job_id, mut handle) in handles {
            tokio::select! {
                res = &mut handle => {
                    if let Err(e) = res {
                        tracing::warn!(job_id, error = %e, "job task join error");
                    }
                }
                _ = tokio::time::sleep(timeout) => {
                    tracing::warn!(job_id, "job did not stop in time; aborting");
                    handle.abort();
                }
            }
        }
        tracing::info!("scheduler stopped");
    }
}

impl JobScheduler for TokioScheduler {
    fn schedule(&self, job: Arc<dyn Job>, trigger: Trigger, job_id: &str) -> Result<(), JobError> {
        if self.cancel.is_cancelled() {
            return Err(JobError::ShutDown);
        }
        let mut handles = self.handles.lock();
        if handles.contains_key(job_id) {
            return Err(JobError::DuplicateJob(job_id.to_string()));
        }

        tracing::info!(job_id, trigger = %trigger, "job scheduled");
        let cancel = self.cancel.child_token();
        let id = job_id.to_string();
        let handle = tokio::spawn(async move {
            loop {
                let Some(delay) = trigger.delay_from(Utc::now()) else {
                    tracing::info!(job_id = %id, "trigger has no further firings");
                    break;
                };
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                tracing::info!(job_id = %id, "running job");
                if let Err(e) = job.run().await {
                    tracing::error!(job_id = %id, error = %e, "job failed");
                }
            }
            tracing::debug!(job_id = %id, "job loop exited");
        });
        handles.insert(job_id.to_string(), handle);
        Ok(())
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
        for (_, handle) in self.handles.get_mut().drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod jobs_tests;
