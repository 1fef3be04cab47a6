//! Plain line-based status output.

use std::io::{self, Write};

use crate::container::RunState;
use crate::orchestrator::JobSnapshot;

/// Prints one line per job whenever its state changes or its progress crosses
/// a 10% step.
pub struct LineReporter<W: Write> {
    out: W,
    width: usize,
    last: Vec<Option<(&'static str, u8)>>,
}

impl<W: Write> LineReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            width: 0,
            last: Vec::new(),
        }
    }

    /// Writes lines for every job that changed since the previous call.
    pub fn update(&mut self, jobs: &[JobSnapshot]) -> io::Result<()> {
        if self.last.len() < jobs.len() {
            self.last.resize(jobs.len(), None);
            self.width = label_width(jobs);
        }

        for (job, last) in jobs.iter().zip(self.last.iter_mut()) {
            let key = (job.state.name(), step(&job.state));
            if *last == Some(key) {
                continue;
            }
            *last = Some(key);
            writeln!(
                self.out,
                "{:<width$}  {}",
                job.label,
                describe(&job.state),
                width = self.width
            )?;
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

pub(crate) fn label_width(jobs: &[JobSnapshot]) -> usize {
    jobs.iter()
        .map(|job| console::measure_text_width(&job.label))
        .max()
        .unwrap_or(0)
}

fn step(state: &RunState) -> u8 {
    match state {
        RunState::Running { progress } => (progress * 10.0).floor() as u8,
        _ => 0,
    }
}

fn describe(state: &RunState) -> String {
    match state {
        RunState::Pending => "queued".to_string(),
        RunState::Running { progress } => format!("running {:>3.0}%", progress * 100.0),
        RunState::Succeeded => "done".to_string(),
        RunState::Failed(e) if e.is_cancelled() => "cancelled".to_string(),
        RunState::Failed(e) => format!("failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::JobError;
    use std::path::PathBuf;

    fn job(label: &str, state: RunState) -> JobSnapshot {
        JobSnapshot {
            path: PathBuf::from(format!("/media/{}", label)),
            label: label.to_string(),
            duration: None,
            state,
        }
    }

    #[test]
    fn test_prints_on_change_and_each_step() {
        let mut reporter = LineReporter::new(Vec::new());
        let running = |p| RunState::Running { progress: p };

        reporter
            .update(&[job("a.mkv", RunState::Pending), job("long.mkv", running(0.0))])
            .unwrap();
        reporter
            .update(&[job("a.mkv", running(0.02)), job("long.mkv", running(0.05))])
            .unwrap();
        reporter
            .update(&[job("a.mkv", running(0.08)), job("long.mkv", running(0.15))])
            .unwrap();
        reporter
            .update(&[
                job("a.mkv", RunState::Succeeded),
                job("long.mkv", RunState::Failed(JobError::process(Some(1), "x"))),
            ])
            .unwrap();
        reporter
            .update(&[
                job("a.mkv", RunState::Succeeded),
                job("long.mkv", RunState::Failed(JobError::process(Some(1), "x"))),
            ])
            .unwrap();

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(
            out,
            "a.mkv     queued\n\
             long.mkv  running   0%\n\
             a.mkv     running   2%\n\
             long.mkv  running  15%\n\
             a.mkv     done\n\
             long.mkv  failed: ffmpeg exited with code 1\n"
        );
    }

    #[test]
    fn test_cancelled_is_distinct_from_failed() {
        let mut reporter = LineReporter::new(Vec::new());
        reporter
            .update(&[job("a.mkv", RunState::Failed(JobError::Cancelled))])
            .unwrap();
        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(out, "a.mkv  cancelled\n");
    }
}
