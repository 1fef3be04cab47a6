//! The periodic redraw loop.

use std::io::{self, Write};

use console::Term;
use indicatif::ProgressDrawTarget;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::orchestrator::{JobMonitor, JobSnapshot};

use super::bars::BarDisplay;
use super::config::{RenderMode, RendererConfig};
use super::lines::LineReporter;

type BoxedWriter = Box<dyn Write + Send>;

/// Redraws the state of every job at a fixed interval until all of them are
/// terminal, then draws once more and returns.
///
/// Rendering only reads job state, so a slow terminal never holds up a job.
/// Failures to draw are logged and otherwise ignored.
pub struct ProgressRenderer {
    config: RendererConfig,
    writer: Option<BoxedWriter>,
}

enum Display {
    Bars(BarDisplay),
    Lines { reporter: LineReporter<BoxedWriter>, broken: bool },
}

impl ProgressRenderer {
    /// Renders to stderr.
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            writer: None,
        }
    }

    /// Renders status lines into `writer`, whatever the configured mode.
    pub fn with_writer(config: RendererConfig, writer: impl Write + Send + 'static) -> Self {
        Self {
            config,
            writer: Some(Box::new(writer)),
        }
    }

    pub async fn run(mut self, monitor: JobMonitor) {
        let mut display = self.initial_display();
        let mut ticker = tokio::time::interval(self.config.refresh_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if monitor.all_terminal() {
                break;
            }
            if let Display::Bars(bars) = &display {
                if !self.terminal_fits() {
                    debug!("Terminal too small or gone, switching to line output");
                    bars.clear();
                    display = lines(Box::new(io::stderr()));
                }
            }
            display.draw(&monitor.snapshot());
        }

        display.draw(&monitor.snapshot());
        display.finish();
    }

    fn initial_display(&mut self) -> Display {
        if let Some(writer) = self.writer.take() {
            return lines(writer);
        }
        let use_bars = match self.config.mode {
            RenderMode::Lines => false,
            RenderMode::Bars => Term::stderr().is_term(),
            RenderMode::Auto => self.terminal_fits(),
        };
        if use_bars {
            Display::Bars(BarDisplay::new(ProgressDrawTarget::stderr()))
        } else {
            lines(Box::new(io::stderr()))
        }
    }

    fn terminal_fits(&self) -> bool {
        let term = Term::stderr();
        if !term.is_term() {
            return false;
        }
        match term.size_checked() {
            Some((_, columns)) => {
                self.config.mode == RenderMode::Bars || columns >= self.config.min_bar_columns
            }
            None => false,
        }
    }
}

fn lines(writer: BoxedWriter) -> Display {
    Display::Lines {
        reporter: LineReporter::new(writer),
        broken: false,
    }
}

impl Display {
    fn draw(&mut self, jobs: &[JobSnapshot]) {
        match self {
            Display::Bars(bars) => bars.update(jobs),
            Display::Lines { reporter, broken } => {
                if *broken {
                    return;
                }
                if let Err(e) = reporter.update(jobs) {
                    warn!("Progress output failed, no further updates: {}", e);
                    *broken = true;
                }
            }
        }
    }

    fn finish(&self) {
        if let Display::Bars(bars) = self {
            bars.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{ConverterConfig, JobError, JobRunner};
    use crate::testing::fixtures;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn runner(name: &str) -> JobRunner {
        let container = fixtures::configured_container(format!("/media/{}", name), 60);
        JobRunner::new(container, Arc::new(ConverterConfig::default())).unwrap()
    }

    fn config() -> RendererConfig {
        RendererConfig::default().with_refresh_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_runs_until_all_terminal_then_draws_final_state() {
        let a = runner("a.mkv");
        let b = runner("b.mkv");
        let monitor = JobMonitor::new(vec![a.handle(), b.handle()]);
        let out = SharedBuf::default();

        let render = tokio::spawn(ProgressRenderer::with_writer(config(), out.clone()).run(monitor));

        let a_state = a.container().state_writer();
        let b_state = b.container().state_writer();
        a_state.begin();
        b_state.begin();
        a_state.advance(0.55);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!render.is_finished());

        a_state.succeed();
        b_state.fail(JobError::process(Some(1), "boom"));
        tokio::time::timeout(Duration::from_secs(2), render)
            .await
            .expect("renderer stops once all jobs are terminal")
            .unwrap();

        let text = out.text();
        assert!(text.contains("a.mkv  running  55%\n"), "{}", text);
        assert!(
            text.ends_with("a.mkv  done\nb.mkv  failed: ffmpeg exited with code 1\n"),
            "{}",
            text
        );
    }

    #[tokio::test]
    async fn test_stops_when_runner_is_dropped() {
        let a = runner("a.mkv");
        let monitor = JobMonitor::new(vec![a.handle()]);
        let render = tokio::spawn(
            ProgressRenderer::with_writer(config(), SharedBuf::default()).run(monitor),
        );
        drop(a);
        tokio::time::timeout(Duration::from_secs(2), render)
            .await
            .expect("renderer does not wait for an abandoned job")
            .unwrap();
    }

    #[tokio::test]
    async fn test_broken_writer_does_not_fail_the_run() {
        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::BrokenPipe))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let a = runner("a.mkv");
        let monitor = JobMonitor::new(vec![a.handle()]);
        let render = tokio::spawn(ProgressRenderer::with_writer(config(), Closed).run(monitor));
        a.container().state_writer().begin();
        a.container().state_writer().succeed();
        tokio::time::timeout(Duration::from_secs(2), render)
            .await
            .unwrap()
            .unwrap();
    }
}
