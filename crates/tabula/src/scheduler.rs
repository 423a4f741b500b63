//! Cascade scheduling
//!
//! A [`CascadeScheduler`] decides when a [`CascadeJob`] runs relative to the
//! save that produced it. Failures inside a job are logged and never reach
//! the writer.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Notify};

use crate::cascade::{CascadeJob, CascadeRunner};
use crate::error::{Error, Result};

/// Accepts cascade jobs
pub trait CascadeScheduler: Send + Sync + fmt::Debug {
    /// Queue or run a job; an error means the job was not accepted
    fn schedule(&self, job: CascadeJob) -> Result<()>;
}

/// Runs each job before `schedule` returns
#[derive(Debug, Clone)]
pub struct InlineScheduler {
    runner: CascadeRunner,
}

impl InlineScheduler {
    pub fn new(runner: CascadeRunner) -> Self {
        Self { runner }
    }
}

impl CascadeScheduler for InlineScheduler {
    fn schedule(&self, job: CascadeJob) -> Result<()> {
        if let Err(e) = self.runner.run(&job) {
            tracing::warn!(job_id = %job.job_id, cell = %job.cell, error = %e, "cascade failed");
        }
        Ok(())
    }
}

/// Runs jobs on a tokio task, in submission order
///
/// Must be created inside a tokio runtime.
#[derive(Debug)]
pub struct BackgroundScheduler {
    tx: mpsc::UnboundedSender<CascadeJob>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl BackgroundScheduler {
    /// Spawn the worker task
    pub fn spawn(runner: CascadeRunner) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<CascadeJob>();
        let pending = Arc::new(AtomicUsize::new(0));
        let idle = Arc::new(Notify::new());

        let worker_pending = Arc::clone(&pending);
        let worker_idle = Arc::clone(&idle);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let runner = runner.clone();
                let outcome = tokio::task::spawn_blocking(move || runner.run(&job)).await;
                match outcome {
                    Ok(Ok(stats)) => {
                        tracing::debug!(job_id = %job.job_id, updated = stats.cells_updated, "background cascade done")
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(job_id = %job.job_id, cell = %job.cell, error = %e, "cascade failed")
                    }
                    Err(e) => {
                        tracing::error!(job_id = %job.job_id, error = %e, "cascade task panicked")
                    }
                }
                if worker_pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                    worker_idle.notify_waiters();
                }
            }
            tracing::debug!("cascade worker stopped");
        });

        Self { tx, pending, idle }
    }

    /// Jobs accepted but not finished
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Wait until every accepted job has finished
    pub async fn settle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl CascadeScheduler for BackgroundScheduler {
    fn schedule(&self, job: CascadeJob) -> Result<()> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.tx.send(job).map_err(|e| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            Error::Scheduler(format!("cascade worker is gone: {}", e))
        })
    }
}
