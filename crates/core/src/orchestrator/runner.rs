//! Concurrent supervision of a batch of conversion jobs.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::container::Container;
use crate::runner::{ConverterConfig, JobError, JobHandle, JobOutcome, JobRunner, MissingSpec};

use super::config::OrchestratorConfig;
use super::monitor::JobMonitor;
use super::types::{AggregateStatus, OrchestratorError, RunSummary};

/// Runs one [`JobRunner`] per Container, concurrently.
///
/// Failures stay local to their job; the orchestrator only collects outcomes.
/// Dropping it cancels every job that is still running.
pub struct Orchestrator {
    config: OrchestratorConfig,
    converter: Arc<ConverterConfig>,
    limiter: Option<Arc<Semaphore>>,
    jobs: Vec<JobHandle>,
    tasks: Vec<JoinHandle<JobOutcome>>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, converter: Arc<ConverterConfig>) -> Self {
        let limiter = config.limit().map(|n| Arc::new(Semaphore::new(n)));
        Self {
            config,
            converter,
            limiter,
            jobs: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Starts a job for every Container that carries a conversion spec.
    ///
    /// Containers without a spec are skipped. The whole batch is rejected,
    /// before anything starts, if a source file would get a second concurrent
    /// job or two jobs would write the same file. Returns the number of jobs
    /// started.
    pub fn start(&mut self, containers: Vec<Container>) -> Result<usize, OrchestratorError> {
        self.check_duplicates(&containers)?;

        let mut started = 0;
        for container in containers {
            let runner = match JobRunner::new(container, Arc::clone(&self.converter)) {
                Ok(runner) => runner,
                Err(MissingSpec(container)) => {
                    warn!(
                        "Skipping {}: nothing selected for conversion",
                        container.path().display()
                    );
                    continue;
                }
            };

            let handle = runner.handle();
            debug!("Queueing conversion of {}", handle.label());
            let task = spawn_job(runner, handle.clone(), self.limiter.clone());
            self.jobs.push(handle);
            self.tasks.push(task);
            started += 1;
        }

        info!("Started {} conversion job(s)", started);
        Ok(started)
    }

    fn check_duplicates(&self, containers: &[Container]) -> Result<(), OrchestratorError> {
        let mut claimed: Vec<(&Path, &Path)> = self
            .jobs
            .iter()
            .filter(|job| !job.is_done())
            .map(|job| (job.path(), job.output_path()))
            .collect();
        for container in containers {
            let Some(spec) = container.spec() else {
                continue;
            };
            let (path, output) = (container.path(), spec.output_path.as_path());
            for &(other_path, other_output) in &claimed {
                if other_path == path {
                    return Err(OrchestratorError::DuplicateContainer {
                        path: path.to_path_buf(),
                    });
                }
                if other_output == output || other_path == output || other_output == path {
                    return Err(OrchestratorError::OutputCollision {
                        path: path.to_path_buf(),
                        output: output.to_path_buf(),
                    });
                }
            }
            claimed.push((path, output));
        }
        Ok(())
    }

    /// Current counts per run state.
    pub fn status(&self) -> AggregateStatus {
        self.monitor().status()
    }

    /// Reader over every job started so far.
    pub fn monitor(&self) -> JobMonitor {
        JobMonitor::new(self.jobs.clone())
    }

    /// Cancels every job that is still pending or running.
    pub fn cancel_all(&self) {
        info!("Cancelling all conversions");
        self.monitor().cancel_all();
    }

    /// Waits for every started job and returns their outcomes in start order.
    pub async fn wait_all(&mut self) -> RunSummary {
        let tasks = std::mem::take(&mut self.tasks);
        let first = self.jobs.len() - tasks.len();
        let mut outcomes = Vec::with_capacity(tasks.len());

        for (task, job) in tasks.into_iter().zip(&self.jobs[first..]) {
            match task.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!("Conversion task for {} died: {}", job.label(), e);
                    let now = Utc::now();
                    outcomes.push(JobOutcome {
                        path: job.path().to_path_buf(),
                        label: job.label().to_string(),
                        output_path: job.path().to_path_buf(),
                        result: Err(JobError::process(None, e.to_string())),
                        started_at: now,
                        finished_at: now,
                    });
                }
            }
        }

        RunSummary {
            outcomes,
            interrupted: false,
        }
    }

    /// Like [`wait_all`](Self::wait_all), but cancels everything as soon as
    /// `interrupt` resolves, then still waits for every job to wind down.
    pub async fn wait_all_or_interrupt<F>(&mut self, interrupt: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        let monitor = self.monitor();
        let interrupted = tokio::select! {
            _ = monitor.wait_all_terminal() => false,
            _ = interrupt => {
                info!("Interrupted, cancelling {} running job(s)", monitor.status().running);
                monitor.cancel_all();
                true
            }
        };

        let mut summary = self.wait_all().await;
        summary.interrupted = interrupted;
        summary
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if self.tasks.iter().any(|task| !task.is_finished()) {
            warn!("Orchestrator dropped with jobs in flight, cancelling them");
            self.monitor().cancel_all();
        }
    }
}

fn spawn_job(
    runner: JobRunner,
    handle: JobHandle,
    limiter: Option<Arc<Semaphore>>,
) -> JoinHandle<JobOutcome> {
    tokio::spawn(async move {
        // A job cancelled while queued skips the wait and ends as Cancelled.
        let _permit = match limiter {
            Some(limiter) => tokio::select! {
                biased;
                _ = handle.cancellation_token().cancelled() => None,
                permit = limiter.acquire_owned() => permit.ok(),
            },
            None => None,
        };
        runner.run().await
    })
}
