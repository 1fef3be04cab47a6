//! Source file discovery.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Resolves the files to operate on, sorted by path.
///
/// A single file must exist. Otherwise every regular file of `directory`
/// (default `.`) is returned, descending into subdirectories when `recursive`.
pub fn discover(
    file: Option<&Path>,
    directory: Option<&Path>,
    recursive: bool,
) -> Result<Vec<PathBuf>> {
    if let Some(file) = file {
        if !file.is_file() {
            bail!("{} is not a readable file", file.display());
        }
        return Ok(vec![file.to_path_buf()]);
    }

    let directory = directory.unwrap_or(Path::new("."));
    if !directory.is_dir() {
        bail!("{} is not a directory", directory.display());
    }

    let mut walker = WalkDir::new(directory).min_depth(1).follow_links(true);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry =
            entry.with_context(|| format!("Failed to read directory {}", directory.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.mkv"), b"").unwrap();
        fs::write(dir.path().join("a.avi"), b"").unwrap();
        fs::create_dir(dir.path().join("season1")).unwrap();
        fs::write(dir.path().join("season1").join("e01.mkv"), b"").unwrap();
        dir
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_directory_is_flat_by_default() {
        let dir = tree();
        let files = discover(None, Some(dir.path()), false).unwrap();
        assert_eq!(names(dir.path(), &files), ["a.avi", "b.mkv"]);
    }

    #[test]
    fn test_recursive() {
        let dir = tree();
        let files = discover(None, Some(dir.path()), true).unwrap();
        assert_eq!(names(dir.path(), &files), ["a.avi", "b.mkv", "season1/e01.mkv"]);
    }

    #[test]
    fn test_single_file() {
        let dir = tree();
        let file = dir.path().join("b.mkv");
        assert_eq!(discover(Some(&file), None, false).unwrap(), vec![file]);
        assert!(discover(Some(&dir.path().join("missing.mkv")), None, false).is_err());
        assert!(discover(Some(dir.path()), None, false).is_err());
    }

    #[test]
    fn test_missing_directory() {
        assert!(discover(None, Some(Path::new("/nonexistent/videos")), false).is_err());
    }
}
