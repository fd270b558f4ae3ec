//! Job completion waiter
//!
//! Polls the server job listing until every job of a batch is present and
//! terminal. Two states, `Waiting` and `Done`. A rejected bearer token stops
//! the loop immediately; any other fetch failure is retried on the next
//! tick. The sleep between ticks goes through [`Sleeper`] so tests can run
//! hundreds of ticks without real delays.

use crate::api::IngestApi;
use crate::error::ClientError;
use crate::models::ImportJob;
use async_trait::async_trait;
use spedup_common::events::{EventBus, IngestEvent, JobStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Pause between poll ticks
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Waiter state for one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaiterState {
    Waiting,
    Done,
}

/// How the wait ended
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    /// Every batch job reached `completed` or `error`
    Done { jobs: Vec<ImportJob> },
    /// Job listing answered 401; the caller must re-authenticate
    AuthenticationRequired,
    /// `max_ticks` polls passed without reaching `Done`
    TimedOut { ticks: u32 },
    /// Cancellation token fired
    Cancelled,
}

/// Evaluate the gating rule for one fetched job list
///
/// `Done` only when every id is listed and its status is terminal.
pub fn evaluate(job_ids: &[String], jobs: &HashMap<String, ImportJob>) -> WaiterState {
    let all_terminal = job_ids
        .iter()
        .all(|id| jobs.get(id).map(ImportJob::is_terminal).unwrap_or(false));

    if all_terminal {
        WaiterState::Done
    } else {
        WaiterState::Waiting
    }
}

/// Polls job status for a batch
pub struct JobCompletionWaiter {
    interval: Duration,
    max_ticks: Option<u32>,
    sleeper: Arc<dyn Sleeper>,
    /// Last observed record of every listed job; only `wait` writes it
    cache: HashMap<String, ImportJob>,
    state: WaiterState,
}

impl JobCompletionWaiter {
    pub fn new(interval: Duration, max_ticks: Option<u32>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            interval,
            max_ticks,
            sleeper,
            cache: HashMap::new(),
            state: WaiterState::Waiting,
        }
    }

    pub fn state(&self) -> WaiterState {
        self.state
    }

    /// Last observed record for `job_id`
    pub fn job(&self, job_id: &str) -> Option<&ImportJob> {
        self.cache.get(job_id)
    }

    /// Poll until the batch jobs are terminal
    ///
    /// The first poll happens immediately, later polls one interval apart.
    pub async fn wait(
        &mut self,
        api: &dyn IngestApi,
        batch_id: Uuid,
        job_ids: &[String],
        events: &EventBus,
        cancel: &CancellationToken,
    ) -> WaitOutcome {
        self.state = WaiterState::Waiting;
        let mut tick: u32 = 0;

        tracing::info!(
            batch_id = %batch_id,
            jobs = job_ids.len(),
            interval_ms = self.interval.as_millis() as u64,
            "Waiting for batch jobs"
        );

        loop {
            if cancel.is_cancelled() {
                return WaitOutcome::Cancelled;
            }
            if let Some(max) = self.max_ticks {
                if tick >= max {
                    tracing::warn!(batch_id = %batch_id, ticks = tick, "Gave up waiting for batch jobs");
                    return WaitOutcome::TimedOut { ticks: tick };
                }
            }
            tick += 1;

            match api.list_jobs(cancel).await {
                Ok(jobs) => {
                    self.update_cache(&jobs, job_ids, events);
                    // Gate on this tick's listing only; the cache may hold
                    // jobs the server no longer reports
                    let listed: HashMap<String, ImportJob> =
                        jobs.into_iter().map(|job| (job.id.clone(), job)).collect();
                    self.state = evaluate(job_ids, &listed);

                    let terminal = job_ids
                        .iter()
                        .filter(|id| listed.get(*id).map(ImportJob::is_terminal).unwrap_or(false))
                        .count();
                    events.emit_lossy(IngestEvent::JobsPolled {
                        batch_id,
                        tick,
                        terminal,
                        total: job_ids.len(),
                    });

                    if self.state == WaiterState::Done {
                        return self.finish(batch_id, job_ids, &listed, events);
                    }
                }
                Err(ClientError::Cancelled) => return WaitOutcome::Cancelled,
                Err(e) if e.is_auth_failure() => {
                    tracing::error!(batch_id = %batch_id, "Job listing rejected the token, stopping");
                    events.emit_lossy(IngestEvent::AuthenticationRequired { batch_id });
                    return WaitOutcome::AuthenticationRequired;
                }
                Err(e) => {
                    tracing::warn!(batch_id = %batch_id, tick, error = %e, "Job listing failed, retrying next tick");
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return WaitOutcome::Cancelled,
                _ = self.sleeper.sleep(self.interval) => {}
            }
        }
    }

    fn update_cache(&mut self, jobs: &[ImportJob], job_ids: &[String], events: &EventBus) {
        for job in jobs {
            let previous = self.cache.get(&job.id).map(|prev| prev.status);
            let tracked = job_ids.contains(&job.id);

            if let Some(prev) = previous {
                if tracked && job.status.rank() < prev.rank() {
                    tracing::warn!(
                        job_id = %job.id,
                        from = %prev,
                        to = %job.status,
                        "Job status moved backwards"
                    );
                }
            }

            if tracked && previous != Some(job.status) {
                tracing::debug!(job_id = %job.id, status = %job.status, "Job status changed");
                events.emit_lossy(IngestEvent::JobStatusChanged {
                    job_id: job.id.clone(),
                    filename: job.filename.clone(),
                    status: job.status,
                    message: job.message.clone(),
                });
            }
            self.cache.insert(job.id.clone(), job.clone());
        }
    }

    fn finish(
        &self,
        batch_id: Uuid,
        job_ids: &[String],
        listed: &HashMap<String, ImportJob>,
        events: &EventBus,
    ) -> WaitOutcome {
        let jobs: Vec<ImportJob> = job_ids
            .iter()
            .filter_map(|id| listed.get(id).cloned())
            .collect();
        let errored = jobs.iter().filter(|j| j.status == JobStatus::Error).count();
        let completed = jobs.len() - errored;

        tracing::info!(batch_id = %batch_id, completed, errored, "All batch jobs terminal");
        events.emit_lossy(IngestEvent::BatchJobsTerminal {
            batch_id,
            completed,
            errored,
        });

        WaitOutcome::Done { jobs }
    }
}
