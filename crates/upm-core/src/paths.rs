use crate::error::Error;
use std::path::{Path, PathBuf};

/// Directory holding the project manifest.
pub const PACKAGES_DIR: &str = "Packages";

/// Manifest file name inside [`PACKAGES_DIR`].
pub const MANIFEST_FILE: &str = "manifest.json";

/// Find the project root by walking up from `cwd` looking for
/// `Packages/manifest.json`.
///
/// Returns the first directory containing the manifest, or `None`.
#[must_use]
pub fn project_root(cwd: &Path) -> Option<PathBuf> {
    let mut current = cwd.to_path_buf();

    loop {
        if manifest_path(&current).is_file() {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Like [`project_root`], but an error when no project is found.
pub fn require_project_root(cwd: &Path) -> Result<PathBuf, Error> {
    project_root(cwd).ok_or_else(|| Error::ProjectNotFound {
        start: cwd.to_path_buf(),
    })
}

/// `<project>/Packages/manifest.json`.
#[must_use]
pub fn manifest_path(project_root: &Path) -> PathBuf {
    project_root.join(PACKAGES_DIR).join(MANIFEST_FILE)
}

/// `<project>/ProjectSettings/ProjectVersion.txt`, which records the editor
/// version the project was last opened with.
#[must_use]
pub fn project_version_path(project_root: &Path) -> PathBuf {
    project_root
        .join("ProjectSettings")
        .join("ProjectVersion.txt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_project_root_from_nested_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("Assets").join("Scripts");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(dir.path().join(PACKAGES_DIR)).unwrap();
        fs::write(manifest_path(dir.path()), "{}").unwrap();

        assert_eq!(project_root(&nested), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_packages_dir_without_manifest_is_not_a_root() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(PACKAGES_DIR)).unwrap();
        // May still find a root above the temp dir on odd systems.
        assert_ne!(project_root(dir.path()), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_require_project_root_error() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nowhere");
        fs::create_dir_all(&nested).unwrap();
        if let Err(e) = require_project_root(&nested) {
            assert!(matches!(e, Error::ProjectNotFound { .. }));
        }
    }

    #[test]
    fn test_project_version_path() {
        let path = project_version_path(Path::new("/project"));
        assert!(path.ends_with("ProjectSettings/ProjectVersion.txt"));
    }
}
