//! Candidate discovery for a scan root.
//!
//! A directory becomes a candidate only when one of its dependency manifests
//! declares the fastmcp framework at a detectable version.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::CandidateDir;
use crate::error::{MenagerieError, Result};
use crate::fs::FileSystem;

/// Manifest files probed for the framework dependency, in priority order.
pub const MANIFEST_FILES: &[&str] = &["pyproject.toml", "requirements.txt", "setup.py"];

/// Directory names never considered candidates or scanned for signals.
pub const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "__pycache__",
    "venv",
    ".venv",
    "env",
    "dist",
    "build",
    "target",
    ".tox",
    ".mypy_cache",
    ".ruff_cache",
    "site-packages",
];

/// Strict pin: `fastmcp==X`.
static STRICT_VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bfastmcp\s*==\s*["']?([0-9][0-9A-Za-z.\-]*)"#).expect("strict version regex")
});

/// Loose fallback: `fastmcp` followed by a version-like number within the
/// same line (covers `>=`, `~=`, `^` and TOML table forms).
static LOOSE_VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bfastmcp\b[^0-9\r\n]{0,24}([0-9]+\.[0-9][0-9A-Za-z.\-]*)"#)
        .expect("loose version regex")
});

/// Whether a directory name is hidden or in the exclusion set.
pub fn is_excluded_dir(name: &str) -> bool {
    name.starts_with('.') || EXCLUDED_DIRS.contains(&name)
}

/// Whether any component of a path is an excluded directory name.
pub fn is_excluded_path(path: &Path) -> bool {
    path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .map(is_excluded_dir)
            .unwrap_or(false)
    })
}

/// Enumerate candidate repositories under a scan root.
///
/// Fails only when the root itself is not a directory. Children without a
/// detectable framework version are absent from the result, not errors.
pub fn locate<F: FileSystem>(fs: &F, root: &Path) -> Result<Vec<CandidateDir>> {
    locate_with_skipped(fs, root).map(|(candidates, _)| candidates)
}

/// As [`locate`], also reporting how many eligible children were dropped for
/// lacking a detectable framework version.
pub fn locate_with_skipped<F: FileSystem>(
    fs: &F,
    root: &Path,
) -> Result<(Vec<CandidateDir>, usize)> {
    if !fs.is_dir(root) {
        return Err(MenagerieError::InvalidRoot(root.to_path_buf()));
    }

    let mut candidates = Vec::new();
    let mut skipped = 0;
    for dir in fs.list_dirs(root)? {
        let Some(name) = dir_name(&dir) else {
            continue;
        };
        if is_excluded_dir(&name) {
            continue;
        }
        match detect_framework_version(fs, &dir) {
            Some(framework_version) => candidates.push(CandidateDir {
                name,
                path: dir,
                framework_version,
            }),
            None => skipped += 1,
        }
    }

    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    Ok((candidates, skipped))
}

/// Probe a single directory for a declared framework version.
///
/// Unreadable manifests are treated as "no version found" for that file.
pub fn detect_framework_version<F: FileSystem>(fs: &F, dir: &Path) -> Option<String> {
    for manifest in MANIFEST_FILES {
        let path = dir.join(manifest);
        if !fs.is_file(&path) {
            continue;
        }
        let contents = match fs.read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) => {
                log::debug!("unreadable manifest {}: {err}", path.display());
                continue;
            }
        };
        if let Some(version) = extract_version(&contents) {
            return Some(version);
        }
    }
    None
}

fn extract_version(contents: &str) -> Option<String> {
    if let Some(caps) = STRICT_VERSION_RE.captures(contents) {
        return Some(caps[1].to_string());
    }
    LOOSE_VERSION_RE
        .captures(contents)
        .map(|caps| caps[1].to_string())
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{extract_version, is_excluded_path, locate, locate_with_skipped};
    use crate::error::MenagerieError;
    use crate::fs::MockFileSystem;
    use std::io;
    use std::path::{Path, PathBuf};

    #[test]
    fn extract_version_prefers_strict_pin() {
        let contents = "dependencies = [\n  \"fastmcp==2.3.0\",\n  \"httpx>=0.27\",\n]\n";
        assert_eq!(extract_version(contents), Some("2.3.0".to_string()));
    }

    #[test]
    fn extract_version_falls_back_to_loose_match() {
        assert_eq!(
            extract_version("fastmcp>=2.0.0\n"),
            Some("2.0.0".to_string())
        );
        assert_eq!(
            extract_version("fastmcp = \"^1.9.2\"\n"),
            Some("1.9.2".to_string())
        );
    }

    #[test]
    fn extract_version_returns_none_without_framework() {
        assert_eq!(extract_version("requests==2.31.0\n"), None);
        assert_eq!(extract_version("fastmcp\n"), None);
    }

    #[test]
    fn locate_rejects_missing_root() {
        let mut fs = MockFileSystem::new();
        fs.expect_is_dir().return_const(false);

        let result = locate(&fs, Path::new("/missing"));
        assert!(matches!(result, Err(MenagerieError::InvalidRoot(_))));
    }

    #[test]
    fn locate_keeps_only_versioned_children() {
        let mut fs = MockFileSystem::new();
        fs.expect_is_dir().return_const(true);
        fs.expect_list_dirs().returning(|_| {
            Ok(vec![
                PathBuf::from("/zoo/beta"),
                PathBuf::from("/zoo/alpha"),
                PathBuf::from("/zoo/node_modules"),
                PathBuf::from("/zoo/.cache"),
                PathBuf::from("/zoo/plain"),
            ])
        });
        fs.expect_is_file()
            .returning(|path| path.ends_with("pyproject.toml"));
        fs.expect_read_to_string().returning(|path| {
            if path.starts_with("/zoo/plain") {
                Ok("dependencies = [\"requests==2.31.0\"]".to_string())
            } else {
                Ok("dependencies = [\"fastmcp==2.1.0\"]".to_string())
            }
        });

        let (candidates, skipped) = locate_with_skipped(&fs, Path::new("/zoo")).expect("locate");

        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(candidates[0].framework_version, "2.1.0");
        // Only the versionless child counts as skipped; excluded and hidden
        // directories are not candidates at all.
        assert_eq!(skipped, 1);
    }

    #[test]
    fn locate_treats_unreadable_manifest_as_absent() {
        let mut fs = MockFileSystem::new();
        fs.expect_is_dir().return_const(true);
        fs.expect_list_dirs()
            .returning(|_| Ok(vec![PathBuf::from("/zoo/locked")]));
        fs.expect_is_file()
            .returning(|path| path.ends_with("pyproject.toml"));
        fs.expect_read_to_string().returning(|_| {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied").into())
        });

        let candidates = locate(&fs, Path::new("/zoo")).expect("locate");
        assert!(candidates.is_empty());
    }

    #[test]
    fn excluded_path_matches_any_component() {
        assert!(is_excluded_path(Path::new("/zoo/repo/__pycache__/mod.py")));
        assert!(is_excluded_path(Path::new("/zoo/repo/.venv/lib/x.py")));
        assert!(!is_excluded_path(Path::new("/zoo/repo/src/server.py")));
    }
}
