//! Terminal progress bars.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::container::RunState;
use crate::orchestrator::{overall_progress, JobSnapshot};

use super::lines::label_width;

const SCALE: u64 = 1000;

const OVERALL_TEMPLATE: &str =
    "{prefix:.bold} [{bar:30.cyan/blue}] {percent:>3}% {elapsed_precise} eta {eta:<4} {msg}";
const RUNNING_TEMPLATE: &str = "{prefix} [{bar:30.cyan/blue}] {percent:>3}% eta {eta:<4} {msg}";

struct Styles {
    overall: ProgressStyle,
    pending: ProgressStyle,
    running: ProgressStyle,
    succeeded: ProgressStyle,
    failed: ProgressStyle,
}

impl Styles {
    fn new() -> Self {
        Self {
            overall: style(OVERALL_TEMPLATE),
            pending: style("{prefix} [{bar:30.dim}]      {msg:.dim}"),
            running: style(RUNNING_TEMPLATE),
            succeeded: style("{prefix} [{bar:30.green}] {msg:.green}"),
            failed: style("{prefix} {msg:.red}"),
        }
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
}

/// One overall bar above one bar per job.
pub struct BarDisplay {
    multi: MultiProgress,
    overall: ProgressBar,
    bars: Vec<ProgressBar>,
    last: Vec<Option<&'static str>>,
    styles: Styles,
    width: usize,
}

impl BarDisplay {
    pub fn new(target: ProgressDrawTarget) -> Self {
        let styles = Styles::new();
        let multi = MultiProgress::with_draw_target(target);
        let overall = multi.add(ProgressBar::new(SCALE));
        overall.set_style(styles.overall.clone());
        Self {
            multi,
            overall,
            bars: Vec::new(),
            last: Vec::new(),
            styles,
            width: 0,
        }
    }

    pub fn update(&mut self, jobs: &[JobSnapshot]) {
        if self.bars.len() < jobs.len() {
            self.width = label_width(jobs).max("overall".len());
            for _ in self.bars.len()..jobs.len() {
                self.bars.push(self.multi.add(ProgressBar::new(SCALE)));
                self.last.push(None);
            }
            for (bar, job) in self.bars.iter().zip(jobs) {
                bar.set_prefix(format!("{:<width$}", job.label, width = self.width));
            }
            self.overall
                .set_prefix(format!("{:<width$}", "overall", width = self.width));
        }

        let mut settled = 0;
        for ((bar, last), job) in self.bars.iter().zip(self.last.iter_mut()).zip(jobs) {
            if job.state.is_terminal() {
                settled += 1;
            }
            let name = job.state.name();
            if *last != Some(name) {
                *last = Some(name);
                apply_state(&self.styles, bar, &job.state);
            }
            if let Some(progress) = job.state.progress() {
                bar.set_position(scaled(progress));
            }
        }

        self.overall.set_position(scaled(overall_progress(jobs)));
        self.overall
            .set_message(format!("{}/{} finished", settled, jobs.len()));
    }

    /// Leaves the final frame on screen.
    pub fn finish(&self) {
        self.overall.finish();
    }

    /// Removes every bar from the screen.
    pub fn clear(&self) {
        let _ = self.multi.clear();
    }

    #[cfg(test)]
    fn bars(&self) -> &[ProgressBar] {
        &self.bars
    }
}

fn apply_state(styles: &Styles, bar: &ProgressBar, state: &RunState) {
    match state {
        RunState::Pending => {
            bar.set_style(styles.pending.clone());
            bar.set_message("queued");
        }
        RunState::Running { .. } => {
            bar.set_style(styles.running.clone());
            bar.set_message("");
            bar.reset_elapsed();
            bar.reset_eta();
        }
        RunState::Succeeded => {
            bar.set_style(styles.succeeded.clone());
            bar.finish_with_message("done");
        }
        RunState::Failed(e) if e.is_cancelled() => {
            bar.set_style(styles.failed.clone());
            bar.abandon_with_message("- cancelled");
        }
        RunState::Failed(e) => {
            bar.set_style(styles.failed.clone());
            bar.abandon_with_message(format!("✗ {}", e));
        }
    }
}

fn scaled(fraction: f64) -> u64 {
    (fraction.clamp(0.0, 1.0) * SCALE as f64).round() as u64
}
