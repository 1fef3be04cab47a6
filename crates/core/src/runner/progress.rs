//! Parser for ffmpeg's `-progress` key/value output.
//!
//! ffmpeg writes blocks of `key=value` lines, each block closed by
//! `progress=continue` or `progress=end`. Only the keys that matter for a
//! completion estimate are recognised; every other line, including garbled or
//! partial ones, parses to [`ProgressLine::Ignored`].

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::time::Duration;

/// `out_time=HH:MM:SS.ffffff`
static OUT_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+):([0-5]\d):([0-5]\d(?:\.\d+)?)$").expect("static regex is valid")
});

/// `speed=1.23x`
static SPEED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)x$").expect("static regex is valid"));

/// One parsed progress line.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressLine {
    /// Duration of source media processed so far.
    OutTime(Duration),
    /// Encoding speed relative to realtime.
    Speed(f64),
    /// End of a progress block, more to come.
    Continue,
    /// Final progress block.
    End,
    Ignored,
}

/// Parses a single line of `-progress` output.
pub fn parse_progress_line(line: &str) -> ProgressLine {
    let Some((key, value)) = line.trim().split_once('=') else {
        return ProgressLine::Ignored;
    };
    let value = value.trim();

    match key.trim() {
        // out_time_ms is in microseconds as well, a long-standing ffmpeg quirk.
        "out_time_us" | "out_time_ms" => value
            .parse::<u64>()
            .map(|us| ProgressLine::OutTime(Duration::from_micros(us)))
            .unwrap_or(ProgressLine::Ignored),
        "out_time" => parse_clock(value)
            .map(ProgressLine::OutTime)
            .unwrap_or(ProgressLine::Ignored),
        "speed" => SPEED
            .captures(value)
            .and_then(|caps| caps[1].parse::<f64>().ok())
            .map(ProgressLine::Speed)
            .unwrap_or(ProgressLine::Ignored),
        "progress" => match value {
            "continue" => ProgressLine::Continue,
            "end" => ProgressLine::End,
            _ => ProgressLine::Ignored,
        },
        _ => ProgressLine::Ignored,
    }
}

fn parse_clock(value: &str) -> Option<Duration> {
    let caps = OUT_TIME.captures(value)?;
    let hours: u64 = caps[1].parse().ok()?;
    let minutes: u64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    let whole = hours.checked_mul(3600)?.checked_add(minutes * 60)?;
    Duration::from_secs(whole).checked_add(Duration::try_from_secs_f64(seconds).ok()?)
}

/// Completion fraction for `elapsed` out of `total`, capped at 1.0.
///
/// Returns `None` when the total is unknown or zero.
pub fn fraction(elapsed: Duration, total: Option<Duration>) -> Option<f64> {
    let total = total.filter(|t| !t.is_zero())?;
    Some((elapsed.as_secs_f64() / total.as_secs_f64()).min(1.0))
}
