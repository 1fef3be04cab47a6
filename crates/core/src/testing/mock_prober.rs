//! Mock prober for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::container::ProbeReport;
use crate::probe::{ProbeError, Prober};

/// In-memory [`Prober`] returning canned reports.
///
/// Paths without a configured report fail the way ffprobe does on a file it
/// cannot read.
///
/// ```rust,ignore
/// use filmalize_core::testing::{fixtures, MockProber};
///
/// let prober = MockProber::new();
/// prober.set_report("/media/a.mkv", fixtures::movie_report(60));
/// let (containers, errors) = build_containers(&prober, paths).await;
/// ```
#[derive(Debug, Default)]
pub struct MockProber {
    reports: Mutex<HashMap<PathBuf, ProbeReport>>,
    failures: Mutex<HashMap<PathBuf, ProbeError>>,
    probes: AtomicUsize,
}

impl MockProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the report returned for a path.
    pub fn set_report(&self, path: impl AsRef<Path>, report: ProbeReport) {
        self.reports
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), report);
    }

    /// Make probing a path fail with a specific error.
    pub fn set_failure(&self, path: impl AsRef<Path>, error: ProbeError) {
        self.failures
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), error);
    }

    /// Number of probe calls so far.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for MockProber {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<ProbeReport, ProbeError> {
        self.probes.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.failures.lock().unwrap().remove(path) {
            return Err(error);
        }
        match self.reports.lock().unwrap().get(path) {
            Some(report) => Ok(report.clone()),
            None => Err(ProbeError::Failed {
                path: path.to_path_buf(),
                stderr: "Invalid data found when processing input".to_string(),
            }),
        }
    }
}
