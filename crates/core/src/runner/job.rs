//! Supervision of one ffmpeg process per Container.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[cfg(unix)]
use nix::sys::signal::{killpg, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

use super::command::FfmpegCommand;
use super::config::ConverterConfig;
use super::error::{JobError, MissingSpec};
use super::progress::{fraction, parse_progress_line, ProgressLine};
use crate::container::{Container, ConversionSpec, RunState, StateReceiver, StateWriter};

/// Runs and supervises the conversion of a single Container.
///
/// The runner owns the Container for the whole job and is the only writer of
/// its run state. Use [`JobRunner::handle`] before [`JobRunner::run`] to keep a
/// way to observe and cancel the job.
#[derive(Debug)]
pub struct JobRunner {
    container: Container,
    spec: ConversionSpec,
    config: Arc<ConverterConfig>,
    cancel: CancellationToken,
}

/// Observation and cancellation handle for a running job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    path: PathBuf,
    output_path: PathBuf,
    label: String,
    duration: Option<Duration>,
    cancel: CancellationToken,
    state: StateReceiver,
}

impl JobHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file this job writes.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Source duration, used to weight aggregate progress.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Latest known run state.
    pub fn state(&self) -> RunState {
        self.state.borrow().clone()
    }

    /// A fresh receiver for state changes.
    pub fn subscribe(&self) -> StateReceiver {
        self.state.clone()
    }

    /// Requests cancellation. Idempotent; a no-op once the job is terminal.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() && !self.state().is_terminal() {
            info!("Cancelling conversion of {}", self.label);
        }
        self.cancel.cancel();
    }

    /// Terminal, or abandoned by a runner that went away without finishing.
    pub fn is_done(&self) -> bool {
        self.state().is_terminal() || self.state.has_changed().is_err()
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the job reached a terminal state, returning it.
    pub async fn wait(&self) -> RunState {
        let mut rx = self.state.clone();
        let result = rx.wait_for(RunState::is_terminal).await.map(|s| s.clone());
        match result {
            Ok(state) => state,
            // The runner was dropped without finishing; report what we last saw.
            Err(_) => rx.borrow().clone(),
        }
    }

    pub(crate) fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Final result of one job.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub path: PathBuf,
    pub label: String,
    pub output_path: PathBuf,
    pub result: Result<(), JobError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(&self.result, Err(e) if e.is_cancelled())
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

impl JobRunner {
    /// Creates a runner. Fails, handing the container back, when no
    /// conversion spec is attached.
    pub fn new(container: Container, config: Arc<ConverterConfig>) -> Result<Self, MissingSpec> {
        let Some(spec) = container.spec().cloned() else {
            return Err(MissingSpec(container));
        };
        Ok(Self {
            container,
            spec,
            config,
            cancel: CancellationToken::new(),
        })
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn handle(&self) -> JobHandle {
        JobHandle {
            path: self.container.path().to_path_buf(),
            output_path: self.spec.output_path.clone(),
            label: self.container.label(),
            duration: self.container.duration(),
            cancel: self.cancel.clone(),
            state: self.container.subscribe(),
        }
    }

    /// The ffmpeg command this runner will execute.
    pub fn command(&self) -> FfmpegCommand {
        FfmpegCommand::build(&self.config, self.container.path(), &self.spec)
    }

    /// Runs the conversion to completion, failure or cancellation.
    pub async fn run(self) -> JobOutcome {
        let started_at = Utc::now();
        let label = self.container.label();
        let state = self.container.state_writer();
        state.begin();

        let result = supervise(
            &label,
            self.command(),
            &self.config,
            self.container.duration(),
            state,
            &self.cancel,
        )
        .await;

        match &result {
            Ok(()) => {
                info!("Finished converting {}", label);
                state.succeed();
            }
            Err(JobError::Cancelled) => {
                info!("Conversion of {} cancelled", label);
                state.fail(JobError::Cancelled);
            }
            Err(e) => {
                info!("Conversion of {} failed: {}", label, e);
                state.fail(e.clone());
            }
        }

        JobOutcome {
            path: self.container.path().to_path_buf(),
            label,
            output_path: self.spec.output_path.clone(),
            result,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

async fn supervise(
    label: &str,
    command: FfmpegCommand,
    config: &ConverterConfig,
    total: Option<Duration>,
    state: &StateWriter,
    cancel: &CancellationToken,
) -> Result<(), JobError> {
    if cancel.is_cancelled() {
        return Err(JobError::Cancelled);
    }

    info!("Starting conversion of {}", label);
    debug!("Running {}", command);

    let mut process = Command::new(&command.program);
    process
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    // Keep ffmpeg out of the terminal's foreground group: Ctrl+C must reach
    // only us, so the job ends as cancelled rather than crashed.
    #[cfg(unix)]
    {
        process.process_group(0);
    }

    let mut child = process
        .spawn()
        .map_err(|e| JobError::Spawn {
            program: command.program.clone(),
            reason: e.to_string(),
        })?;

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        terminate(&mut child, config.grace_period(), label).await;
        return Err(JobError::Spawn {
            program: command.program.clone(),
            reason: "child output pipes were not captured".to_string(),
        });
    };

    let stderr_tail = tokio::spawn(collect_tail(stderr, config.error_tail_lines));
    let mut progress = BufReader::new(stdout).split(b'\n');

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                terminate(&mut child, config.grace_period(), label).await;
                stderr_tail.abort();
                return Err(JobError::Cancelled);
            }
            segment = progress.next_segment() => match segment {
                Ok(Some(bytes)) => apply_progress(&String::from_utf8_lossy(&bytes), total, state),
                Ok(None) => break,
                Err(e) => {
                    warn!("Lost progress output for {}: {}", label, e);
                    break;
                }
            },
        }
    }

    let status: ExitStatus = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            terminate(&mut child, config.grace_period(), label).await;
            stderr_tail.abort();
            return Err(JobError::Cancelled);
        }
        status = child.wait() => status.map_err(|e| JobError::process(None, e.to_string()))?,
    };

    let tail = stderr_tail.await.unwrap_or_default();

    // A cancel racing with a clean exit still counts as a cancellation.
    if cancel.is_cancelled() {
        return Err(JobError::Cancelled);
    }

    debug!("ffmpeg for {} exited with {}", label, status);
    if status.success() {
        Ok(())
    } else {
        Err(JobError::process(status.code(), tail.join("\n")))
    }
}

fn apply_progress(line: &str, total: Option<Duration>, state: &StateWriter) {
    match parse_progress_line(line) {
        ProgressLine::OutTime(elapsed) => {
            if let Some(fraction) = fraction(elapsed, total) {
                state.advance(fraction);
            }
        }
        ProgressLine::Ignored => {
            let line = line.trim();
            if !line.is_empty() {
                debug!("Ignoring progress line {:?}", line);
            }
        }
        ProgressLine::Speed(_) | ProgressLine::Continue | ProgressLine::End => {}
    }
}

/// Keeps the last `limit` non-empty lines of a stream.
async fn collect_tail<R>(reader: R, limit: usize) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let limit = limit.max(1);
    let mut segments = BufReader::new(reader).split(b'\n');
    let mut tail = VecDeque::with_capacity(limit);
    while let Ok(Some(bytes)) = segments.next_segment().await {
        let line = String::from_utf8_lossy(&bytes).trim_end().to_string();
        if line.is_empty() {
            continue;
        }
        if tail.len() == limit {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    tail.into()
}

/// SIGTERM first, then a hard kill once the grace period runs out.
async fn terminate(child: &mut Child, grace: Duration, label: &str) {
    #[cfg(unix)]
    {
        if signal_group(child, Signal::SIGTERM) {
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(Ok(status)) => {
                    debug!("ffmpeg for {} stopped with {}", label, status);
                    return;
                }
                Ok(Err(e)) => warn!("Failed waiting for ffmpeg of {}: {}", label, e),
                Err(_) => {
                    warn!(
                        "ffmpeg for {} ignored SIGTERM for {:?}, killing it",
                        label, grace
                    );
                    signal_group(child, Signal::SIGKILL);
                }
            }
        }
    }
    #[cfg(not(unix))]
    let _ = grace;

    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    if let Err(e) = child.kill().await {
        warn!("Failed to kill ffmpeg for {}: {}", label, e);
    }
}

/// Signals the process group the child leads.
#[cfg(unix)]
fn signal_group(child: &Child, signal: Signal) -> bool {
    let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) else {
        return false;
    };
    match killpg(Pid::from_raw(pid), signal) {
        Ok(()) => true,
        Err(e) => {
            debug!("Could not send {:?} to process group {}: {}", signal, pid, e);
            false
        }
    }
}
