//! End-to-end runs of the `filmalize` binary against scripted tools.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn filmalize() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_filmalize"));
    cmd.env_remove("FILMALIZE_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_help_lists_commands() {
    let output = filmalize().arg("--help").output().unwrap();
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("display"));
    assert!(text.contains("convert"));
}

#[test]
fn test_file_and_directory_conflict() {
    let output = filmalize()
        .args(["-f", "a.mkv", "-d", ".", "display"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_missing_file_is_an_error() {
    let output = filmalize()
        .args(["-f", "/nonexistent/movie.mkv", "display"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("is not a readable file"));
}

#[cfg(unix)]
mod scripted {
    use super::*;
    use filmalize_core::testing::FakeFfmpeg;
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;
    use std::os::unix::fs::PermissionsExt;
    use std::os::unix::process::CommandExt;

    const PROBE_JSON: &str = r#"{
  "streams": [
    {"index": 0, "codec_type": "video", "codec_name": "hevc", "width": 1920, "height": 1080,
     "avg_frame_rate": "24000/1001", "disposition": {"default": 1}},
    {"index": 1, "codec_type": "audio", "codec_name": "ac3", "sample_rate": "48000",
     "channels": 6, "channel_layout": "5.1(side)", "bit_rate": "448000",
     "tags": {"language": "eng"}}
  ],
  "format": {"filename": "movie.mkv", "duration": "60.000000", "size": "52428800",
             "bit_rate": "6990506", "format_long_name": "Matroska / WebM",
             "tags": {"title": "Scripted Movie"}}
}"#;

    /// A media folder with one "movie" ffprobe understands and one file it rejects.
    struct Fixture {
        dir: tempfile::TempDir,
        config: PathBuf,
    }

    impl Fixture {
        fn new(ffmpeg: impl FnOnce(&Path) -> FakeFfmpeg) -> (Self, FakeFfmpeg) {
            let dir = tempfile::tempdir().unwrap();
            let media = dir.path().join("media");
            fs::create_dir(&media).unwrap();
            fs::write(media.join("movie.mkv"), b"not really matroska").unwrap();
            fs::write(media.join("notes.txt"), b"shopping list").unwrap();

            let ffprobe = dir.path().join("ffprobe");
            fs::write(
                &ffprobe,
                format!(
                    "#!/bin/sh\nfor input; do :; done\ncase \"$input\" in\n  *.mkv) cat <<'JSON'\n{}\nJSON\n  ;;\n  *) echo \"$input: Invalid data found when processing input\" >&2; exit 1 ;;\nesac\n",
                    PROBE_JSON
                ),
            )
            .unwrap();
            fs::set_permissions(&ffprobe, fs::Permissions::from_mode(0o755)).unwrap();

            let fake = ffmpeg(dir.path());
            let converter = fake.config();
            let config = dir.path().join("filmalize.toml");
            fs::write(
                &config,
                format!(
                    "[converter]\nffprobe_path = {:?}\nffmpeg_path = {:?}\nglobal_args = [{:?}]\ncancel_grace_period_ms = 500\n",
                    ffprobe.to_string_lossy(),
                    converter.ffmpeg_path.to_string_lossy(),
                    converter.global_args[0],
                ),
            )
            .unwrap();

            (Self { dir, config }, fake)
        }

        fn media(&self) -> PathBuf {
            self.dir.path().join("media")
        }

        fn run(&self, args: &[&str]) -> Output {
            filmalize()
                .arg("-c")
                .arg(&self.config)
                .arg("-d")
                .arg(self.media())
                .args(args)
                .output()
                .unwrap()
        }
    }

    #[test]
    fn test_display_shows_streams_and_skips_unreadable_files() {
        let (fixture, _) = Fixture::new(|dir| FakeFfmpeg::new(dir));
        let output = fixture.run(&["display"]);

        assert!(output.status.success(), "{}", stderr(&output));
        let text = stdout(&output);
        assert!(text.contains("*** File: movie.mkv ***"), "{}", text);
        assert!(text.contains("Title: Scripted Movie"));
        assert!(text.contains("#0 video hevc 1920x1080 23.976fps (default)"));
        assert!(text.contains("#1 audio ac3 48000Hz 5.1(side) 448kb/s [eng]"));
        assert!(!text.contains("notes.txt"));
        assert!(stderr(&output).contains("unable to process"));
    }

    #[test]
    fn test_dry_run_prints_command_without_converting() {
        let (fixture, fake) = Fixture::new(|dir| FakeFfmpeg::new(dir));
        let output = fixture.run(&["convert", "--dry-run", "--crf", "20"]);

        assert!(output.status.success(), "{}", stderr(&output));
        let text = stdout(&output);
        assert!(text.contains("Stream 0: transcode -> libx264, crf=20"), "{}", text);
        assert!(text.contains("Stream 1: transcode -> aac, bitrate=448kb/s"));
        assert!(text.contains("-progress pipe:1"));
        assert!(text.contains("movie.mp4"));
        assert!(!fake.was_invoked());
        assert!(!fixture.media().join("movie.mp4").exists());
    }

    #[test]
    fn test_convert_succeeds() {
        let (fixture, fake) = Fixture::new(|dir| {
            FakeFfmpeg::new(dir).progress_secs(&[20, 40, 60]).pause_ms(20)
        });
        let output = fixture.run(&["convert", "--plain"]);

        assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
        assert_eq!(fake.invocation_count(), 1);
        let text = stdout(&output);
        assert!(text.contains("1 succeeded, 0 failed, 0 cancelled"), "{}", text);
        assert!(stderr(&output).contains("movie.mkv  done"));
    }

    #[test]
    fn test_convert_failure_sets_exit_status() {
        let (fixture, _) = Fixture::new(|dir| {
            FakeFfmpeg::new(dir)
                .progress_secs(&[10])
                .stderr_lines(&["Error while decoding stream #0:0"])
                .exit_code(1)
        });
        let output = fixture.run(&["convert", "--plain"]);

        assert_eq!(output.status.code(), Some(1));
        let text = stdout(&output);
        assert!(text.contains("0 succeeded, 1 failed, 0 cancelled"), "{}", text);
        assert!(text.contains("✗ movie.mkv: ffmpeg exited with code 1"));
        assert!(text.contains("Error while decoding stream #0:0"));
    }

    #[test]
    fn test_sigterm_cancels_and_exits_130() {
        let (fixture, _) = Fixture::new(|dir| FakeFfmpeg::new(dir).progress_secs(&[5]).sleep_secs(30));
        let mut child = filmalize()
            .arg("-c")
            .arg(&fixture.config)
            .arg("-d")
            .arg(fixture.media())
            .args(["convert", "--plain"])
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(1500));
        kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM).unwrap();

        let started = std::time::Instant::now();
        let output = child.wait_with_output().unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
        assert_eq!(output.status.code(), Some(130), "{}", stderr(&output));
        assert!(stdout(&output).contains("0 succeeded, 0 failed, 1 cancelled"));
    }

    #[test]
    fn test_terminal_interrupt_cancels_jobs() {
        let (fixture, fake) =
            Fixture::new(|dir| FakeFfmpeg::new(dir).progress_secs(&[5]).sleep_secs(30));
        // Stand in for a terminal's foreground group, so SIGINT goes to the
        // whole group as it does on Ctrl+C.
        let mut child = filmalize()
            .arg("-c")
            .arg(&fixture.config)
            .arg("-d")
            .arg(fixture.media())
            .args(["convert", "--plain"])
            .process_group(0)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(1500));
        killpg(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();

        let output = child.wait_with_output().unwrap();
        assert_eq!(output.status.code(), Some(130), "{}", stderr(&output));
        let text = stdout(&output);
        assert!(text.contains("0 succeeded, 0 failed, 1 cancelled"), "{}", text);
        assert_eq!(fake.invocation_count(), 1);
        assert!(fake.live_processes().is_empty());
    }
}
