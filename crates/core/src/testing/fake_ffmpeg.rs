//! Scripted stand-in for the ffmpeg binary.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::runner::ConverterConfig;

/// Writes a POSIX shell script that behaves like a scripted ffmpeg run and
/// points a [`ConverterConfig`] at it.
///
/// The script is run through `/bin/sh` with its path as the first global
/// argument, so it never needs to be executable itself.
///
/// ```rust,ignore
/// let dir = tempfile::tempdir()?;
/// let fake = FakeFfmpeg::new(dir.path())
///     .progress_secs(&[15, 30])
///     .stderr_lines(&["Conversion failed!"])
///     .exit_code(1);
/// let runner = JobRunner::new(container, Arc::new(fake.config()))?;
/// ```
#[derive(Debug, Clone)]
pub struct FakeFfmpeg {
    script: PathBuf,
    marker: PathBuf,
    pids: PathBuf,
    stdout: Vec<String>,
    stderr: Vec<String>,
    pause_ms: u64,
    sleep_ms: u64,
    exit_code: i32,
    ignore_sigterm: bool,
    failures: Vec<ScriptedFailure>,
}

#[derive(Debug, Clone)]
struct ScriptedFailure {
    output_contains: String,
    code: i32,
    stderr: Vec<String>,
}

impl FakeFfmpeg {
    /// Creates a fake that exits 0 without output. Files are written into `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            script: dir.join("fake-ffmpeg.sh"),
            marker: dir.join("fake-ffmpeg.calls"),
            pids: dir.join("fake-ffmpeg.pids"),
            stdout: Vec::new(),
            stderr: Vec::new(),
            pause_ms: 0,
            sleep_ms: 0,
            exit_code: 0,
            ignore_sigterm: false,
            failures: Vec::new(),
        }
    }

    /// Emits one `out_time_us` block per entry, in seconds of processed media.
    pub fn progress_secs(mut self, secs: &[u64]) -> Self {
        for s in secs {
            self.stdout.push(format!("out_time_us={}", s * 1_000_000));
            self.stdout.push("speed=2.5x".to_string());
            self.stdout.push("progress=continue".to_string());
        }
        self
    }

    /// Emits these stdout lines verbatim.
    pub fn raw_stdout(mut self, lines: &[&str]) -> Self {
        self.stdout.extend(lines.iter().map(|l| l.to_string()));
        self
    }

    pub fn stderr_lines(mut self, lines: &[&str]) -> Self {
        self.stderr.extend(lines.iter().map(|l| l.to_string()));
        self
    }

    /// Pause after every `progress=` line.
    pub fn pause_ms(mut self, ms: u64) -> Self {
        self.pause_ms = ms;
        self
    }

    /// Sleep before exiting, after all output was written.
    pub fn sleep_ms(mut self, ms: u64) -> Self {
        self.sleep_ms = ms;
        self
    }

    pub fn sleep_secs(self, secs: u64) -> Self {
        self.sleep_ms(secs * 1000)
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Ignore SIGTERM so only a hard kill stops the process.
    pub fn ignore_sigterm(mut self) -> Self {
        self.ignore_sigterm = true;
        self
    }

    /// Exit immediately with `code` when the output path contains `pattern`.
    pub fn fail_for_output(mut self, pattern: &str, code: i32, stderr: &[&str]) -> Self {
        self.failures.push(ScriptedFailure {
            output_contains: pattern.to_string(),
            code,
            stderr: stderr.iter().map(|l| l.to_string()).collect(),
        });
        self
    }

    /// Writes the script and returns a converter config that runs it.
    pub fn config(&self) -> ConverterConfig {
        std::fs::write(&self.script, self.render()).expect("write fake ffmpeg script");
        ConverterConfig {
            ffmpeg_path: PathBuf::from("/bin/sh"),
            global_args: vec![self.script.to_string_lossy().into_owned()],
            cancel_grace_period_ms: 2000,
            ..ConverterConfig::default()
        }
    }

    pub fn script_path(&self) -> &Path {
        &self.script
    }

    /// How many times the script was started.
    pub fn invocation_count(&self) -> usize {
        std::fs::read_to_string(&self.marker)
            .map(|calls| calls.lines().count())
            .unwrap_or(0)
    }

    pub fn was_invoked(&self) -> bool {
        self.invocation_count() > 0
    }

    /// Process ids of every run of the script, in start order.
    pub fn pids(&self) -> Vec<i32> {
        std::fs::read_to_string(&self.pids)
            .map(|pids| pids.lines().filter_map(|l| l.trim().parse().ok()).collect())
            .unwrap_or_default()
    }

    /// Runs of the script whose process still exists.
    #[cfg(unix)]
    pub fn live_processes(&self) -> Vec<i32> {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        self.pids()
            .into_iter()
            .filter(|&pid| kill(Pid::from_raw(pid), None).is_ok())
            .collect()
    }

    fn render(&self) -> String {
        let mut script = String::from("#!/bin/sh\n");
        let _ = writeln!(script, "echo call >> {}", quote(&self.marker.to_string_lossy()));
        let _ = writeln!(script, "echo $$ >> {}", quote(&self.pids.to_string_lossy()));
        if self.ignore_sigterm {
            script.push_str("trap '' TERM\n");
        }

        if !self.failures.is_empty() {
            script.push_str("for output; do :; done\ncase \"$output\" in\n");
            for failure in &self.failures {
                let _ = writeln!(script, "  *{}*)", quote(&failure.output_contains));
                for line in &failure.stderr {
                    let _ = writeln!(script, "    printf '%s\\n' {} >&2", quote(line));
                }
                let _ = writeln!(script, "    exit {} ;;", failure.code);
            }
            script.push_str("esac\n");
        }

        for line in &self.stdout {
            let _ = writeln!(script, "printf '%s\\n' {}", quote(line));
            if self.pause_ms > 0 && line.starts_with("progress=") {
                let _ = writeln!(script, "sleep {}", seconds(self.pause_ms));
            }
        }
        if self.sleep_ms == 0 && self.exit_code == 0 {
            script.push_str("printf '%s\\n' 'progress=end'\n");
        }
        for line in &self.stderr {
            let _ = writeln!(script, "printf '%s\\n' {} >&2", quote(line));
        }

        if self.sleep_ms > 0 {
            if self.exit_code == 0 {
                // Replace the shell so signals reach the sleeping process.
                let _ = writeln!(script, "exec sleep {}", seconds(self.sleep_ms));
            } else {
                let _ = writeln!(script, "sleep {}", seconds(self.sleep_ms));
            }
        }
        let _ = writeln!(script, "exit {}", self.exit_code);
        script
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn seconds(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_contents() {
        let fake = FakeFfmpeg::new("/tmp/x")
            .progress_secs(&[30])
            .stderr_lines(&["it's broken"])
            .exit_code(1);
        let script = fake.render();
        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains("printf '%s\\n' 'out_time_us=30000000'"));
        assert!(script.contains(r"'it'\''s broken' >&2"));
        assert!(script.trim_end().ends_with("exit 1"));
        assert!(!script.contains("progress=end"));
    }

    #[test]
    fn test_sleep_uses_exec() {
        let script = FakeFfmpeg::new("/tmp/x").sleep_ms(1500).render();
        assert!(script.contains("exec sleep 1.500"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_runs_under_sh() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeFfmpeg::new(dir.path())
            .progress_secs(&[1])
            .fail_for_output("bad", 3, &["nope"]);
        let config = fake.config();

        let ok = tokio::process::Command::new(&config.ffmpeg_path)
            .args(&config.global_args)
            .args(["-i", "in.mkv", "good.mp4"])
            .output()
            .await
            .unwrap();
        assert!(ok.status.success());
        assert!(String::from_utf8_lossy(&ok.stdout).contains("progress=end"));

        let bad = tokio::process::Command::new(&config.ffmpeg_path)
            .args(&config.global_args)
            .args(["-i", "in.mkv", "bad.mp4"])
            .output()
            .await
            .unwrap();
        assert_eq!(bad.status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&bad.stderr), "nope\n");
        assert_eq!(fake.invocation_count(), 2);
        assert_eq!(fake.pids().len(), 2);
        assert!(fake.live_processes().is_empty());
    }
}
