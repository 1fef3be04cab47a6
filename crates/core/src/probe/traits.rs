//! Trait definitions for the probe module.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::info;

use super::error::ProbeError;
use crate::container::{Container, ProbeReport};

/// How many files are probed at once by [`build_containers`].
const PROBE_CONCURRENCY: usize = 4;

/// Extracts stream metadata from a media file.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Returns the name of this prober implementation.
    fn name(&self) -> &str;

    /// Probes a media file. No retries: a failure is final for that file.
    async fn probe(&self, path: &Path) -> Result<ProbeReport, ProbeError>;
}

/// Probes every path and builds a Container for each file that probed cleanly.
///
/// Containers come back sorted by path. Files that fail are returned as errors
/// alongside and never abort the batch.
pub async fn build_containers<P>(prober: &P, paths: Vec<PathBuf>) -> (Vec<Container>, Vec<ProbeError>)
where
    P: Prober + ?Sized,
{
    let results: Vec<(PathBuf, Result<ProbeReport, ProbeError>)> = stream::iter(paths)
        .map(|path| async move {
            let result = prober.probe(&path).await;
            (path, result)
        })
        .buffered(PROBE_CONCURRENCY)
        .collect()
        .await;

    let mut containers = Vec::new();
    let mut errors = Vec::new();
    for (path, result) in results {
        match result {
            Ok(report) => containers.push(Container::from_probe(path, report)),
            Err(e) => {
                info!("Skipping {}: {}", path.display(), e);
                errors.push(e);
            }
        }
    }
    containers.sort_by(|a, b| a.path().cmp(b.path()));
    (containers, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockProber};

    #[tokio::test]
    async fn test_build_containers_sorts_and_collects_errors() {
        let prober = MockProber::new();
        prober.set_report("/m/b.mkv", fixtures::movie_report(60));
        prober.set_report("/m/a.mkv", fixtures::movie_report(90));

        let (containers, errors) = build_containers(
            &prober,
            vec![
                PathBuf::from("/m/b.mkv"),
                PathBuf::from("/m/notes.txt"),
                PathBuf::from("/m/a.mkv"),
            ],
        )
        .await;

        let names: Vec<_> = containers.iter().map(|c| c.label()).collect();
        assert_eq!(names, vec!["a.mkv", "b.mkv"]);
        assert_eq!(containers[0].streams().len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), Path::new("/m/notes.txt"));
        assert_eq!(prober.probe_count(), 3);
    }

    #[tokio::test]
    async fn test_build_containers_empty_input() {
        let prober = MockProber::new();
        let (containers, errors) = build_containers(&prober, Vec::new()).await;
        assert!(containers.is_empty());
        assert!(errors.is_empty());
    }
}
