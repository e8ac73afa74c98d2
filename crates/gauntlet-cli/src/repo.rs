//! Repository root detection

use std::path::{Path, PathBuf};

/// Marker files that identify a repository root.
const INDICATORS: [&str; 6] = [
    ".git",
    "pyproject.toml",
    "setup.py",
    "requirements.txt",
    "Cargo.toml",
    "package.json",
];

/// Walk `start` and its ancestors for the nearest directory containing a
/// repository marker.
pub fn detect_root(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().ok()?;
    start
        .ancestors()
        .find(|dir| INDICATORS.iter().any(|marker| dir.join(marker).exists()))
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_detects_root_from_nested_directory() {
        let repo = TempDir::new().unwrap();
        fs::write(repo.path().join("pyproject.toml"), "").unwrap();
        let nested = repo.path().join("src/deep");
        fs::create_dir_all(&nested).unwrap();

        let root = detect_root(&nested).unwrap();
        assert_eq!(root, repo.path().canonicalize().unwrap());
    }

    #[test]
    fn test_nearest_marker_wins() {
        let outer = TempDir::new().unwrap();
        fs::write(outer.path().join("setup.py"), "").unwrap();
        let inner = outer.path().join("vendored");
        fs::create_dir_all(&inner).unwrap();
        fs::write(inner.join("package.json"), "{}").unwrap();

        let root = detect_root(&inner).unwrap();
        assert_eq!(root, inner.canonicalize().unwrap());
    }
}
