//! Structural signal extraction: layout, tests, CI, packaging, VCS.
//!
//! All checks are presence/count checks over the candidate's layout; file
//! contents are only consulted for the lint section of the project manifest
//! and the VCS remote configuration.

use std::path::{Path, PathBuf};

use crate::domain::{CandidateDir, StructureSignals};
use crate::fs::FileSystem;

const README_FILES: &[&str] = &["README.md", "README.rst", "README.txt", "README"];
const LICENSE_FILES: &[&str] = &["LICENSE", "LICENSE.md", "LICENSE.txt", "COPYING"];
const LINT_CONFIG_FILES: &[&str] = &[".ruff.toml", "ruff.toml", ".flake8", ".pylintrc"];
const LINT_MANIFEST_SECTIONS: &[&str] = &["[tool.ruff", "[tool.flake8", "[tool.pylint"];

/// Extract layout and packaging signals for one candidate.
pub fn extract_structure<F: FileSystem>(fs: &F, candidate: &CandidateDir) -> StructureSignals {
    let root = &candidate.path;
    let tests_dir = find_tests_dir(fs, root);
    let workflows = root.join(".github").join("workflows");
    let has_ci = fs.is_dir(&workflows);

    StructureSignals {
        has_source_layout: fs.is_dir(&root.join("src")),
        has_tests: tests_dir.is_some(),
        has_unit_tests: subdir_exists(fs, tests_dir.as_deref(), "unit"),
        has_integration_tests: subdir_exists(fs, tests_dir.as_deref(), "integration"),
        test_file_count: tests_dir
            .as_deref()
            .map(|dir| count_test_files(fs, dir))
            .unwrap_or(0),
        has_ci,
        ci_workflow_count: if has_ci {
            count_workflow_files(fs, &workflows)
        } else {
            0
        },
        has_lint_config: detect_lint_config(fs, root),
        has_packaging_manifest: fs.is_file(&root.join("pyproject.toml")),
        has_deprecated_packaging_format: fs.is_file(&root.join("setup.py")),
        has_readme: any_file(fs, root, README_FILES),
        has_license: any_file(fs, root, LICENSE_FILES),
        has_vcs: fs.is_dir(&root.join(".git")),
        has_vcs_remote: detect_vcs_remote(fs, root),
    }
}

fn find_tests_dir<F: FileSystem>(fs: &F, root: &Path) -> Option<PathBuf> {
    ["tests", "test"]
        .iter()
        .map(|name| root.join(name))
        .find(|dir| fs.is_dir(dir))
}

fn subdir_exists<F: FileSystem>(fs: &F, dir: Option<&Path>, name: &str) -> bool {
    dir.map(|dir| fs.is_dir(&dir.join(name))).unwrap_or(false)
}

fn count_test_files<F: FileSystem>(fs: &F, dir: &Path) -> usize {
    match fs.list_files(dir) {
        Ok(files) => files.iter().filter(|file| is_test_file(file)).count(),
        Err(_) => 0,
    }
}

fn count_workflow_files<F: FileSystem>(fs: &F, dir: &Path) -> usize {
    match fs.list_files(dir) {
        Ok(files) => files.iter().filter(|file| is_workflow_file(file)).count(),
        Err(_) => 0,
    }
}

fn detect_lint_config<F: FileSystem>(fs: &F, root: &Path) -> bool {
    if any_file(fs, root, LINT_CONFIG_FILES) {
        return true;
    }
    let manifest = root.join("pyproject.toml");
    if !fs.is_file(&manifest) {
        return false;
    }
    match fs.read_to_string(&manifest) {
        Ok(contents) => LINT_MANIFEST_SECTIONS
            .iter()
            .any(|section| contents.contains(section)),
        Err(_) => false,
    }
}

/// A remote counts only when a `[remote ...]` section carries a url line.
fn detect_vcs_remote<F: FileSystem>(fs: &F, root: &Path) -> bool {
    let config = root.join(".git").join("config");
    if !fs.is_file(&config) {
        return false;
    }
    let Ok(contents) = fs.read_to_string(&config) else {
        return false;
    };
    let mut in_remote = false;
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            in_remote = trimmed.starts_with("[remote ");
        } else if in_remote && trimmed.starts_with("url") && trimmed.contains('=') {
            return true;
        }
    }
    false
}

fn any_file<F: FileSystem>(fs: &F, root: &Path, names: &[&str]) -> bool {
    names.iter().any(|name| fs.is_file(&root.join(name)))
}

fn is_test_file(path: &Path) -> bool {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_lowercase())
        .unwrap_or_default();
    let is_python = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("py"))
        .unwrap_or(false);
    is_python && (stem.starts_with("test_") || stem.ends_with("_test"))
}

fn is_workflow_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::extract_structure;
    use crate::domain::CandidateDir;
    use crate::fs::StdFileSystem;
    use std::path::{Path, PathBuf};

    #[test]
    fn detects_full_layout() {
        let root = temp_repo();
        std::fs::create_dir_all(root.join("src/demo")).expect("src");
        std::fs::create_dir_all(root.join("tests/unit")).expect("tests/unit");
        std::fs::create_dir_all(root.join("tests/integration")).expect("tests/integration");
        write(&root, "tests/test_server.py", "def test_ok():\n    pass\n");
        write(&root, "tests/unit/test_tools.py", "def test_ok():\n    pass\n");
        std::fs::create_dir_all(root.join(".github/workflows")).expect("workflows");
        write(&root, ".github/workflows/ci.yml", "on: push\n");
        write(&root, "pyproject.toml", "[project]\nname = \"demo\"\n\n[tool.ruff]\nline-length = 100\n");
        write(&root, "README.md", "# demo\n");
        write(&root, "LICENSE", "MIT\n");
        std::fs::create_dir_all(root.join(".git")).expect("git");
        write(
            &root,
            ".git/config",
            "[core]\n\trepositoryformatversion = 0\n[remote \"origin\"]\n\turl = git@example.com:zoo/demo.git\n",
        );

        let signals = extract_structure(&StdFileSystem::new(), &candidate(&root));

        assert!(signals.has_source_layout);
        assert!(signals.has_tests);
        assert!(signals.has_unit_tests);
        assert!(signals.has_integration_tests);
        assert_eq!(signals.test_file_count, 2);
        assert!(signals.has_ci);
        assert_eq!(signals.ci_workflow_count, 1);
        assert!(signals.has_lint_config);
        assert!(signals.has_packaging_manifest);
        assert!(!signals.has_deprecated_packaging_format);
        assert!(signals.has_readme);
        assert!(signals.has_license);
        assert!(signals.has_vcs);
        assert!(signals.has_vcs_remote);

        cleanup(&root);
    }

    #[test]
    fn missing_evidence_stays_false() {
        let root = temp_repo();
        write(&root, "server.py", "print('hi')\n");

        let signals = extract_structure(&StdFileSystem::new(), &candidate(&root));

        assert!(!signals.has_tests);
        assert!(!signals.has_ci);
        assert_eq!(signals.ci_workflow_count, 0);
        assert!(!signals.has_lint_config);
        assert!(!signals.has_vcs_remote);

        cleanup(&root);
    }

    #[test]
    fn deprecated_packaging_and_bare_remote_config() {
        let root = temp_repo();
        write(&root, "setup.py", "from setuptools import setup\n");
        std::fs::create_dir_all(root.join(".git")).expect("git");
        write(&root, ".git/config", "[core]\n\tbare = false\n");

        let signals = extract_structure(&StdFileSystem::new(), &candidate(&root));

        assert!(signals.has_deprecated_packaging_format);
        assert!(!signals.has_packaging_manifest);
        assert!(signals.has_vcs);
        assert!(!signals.has_vcs_remote);

        cleanup(&root);
    }

    #[test]
    fn lint_section_in_manifest_counts() {
        let root = temp_repo();
        write(&root, "pyproject.toml", "[tool.flake8]\nmax-line-length = 100\n");

        let signals = extract_structure(&StdFileSystem::new(), &candidate(&root));
        assert!(signals.has_lint_config);

        cleanup(&root);
    }

    fn candidate(root: &Path) -> CandidateDir {
        CandidateDir {
            name: "demo".to_string(),
            path: root.to_path_buf(),
            framework_version: "2.1.0".to_string(),
        }
    }

    fn temp_repo() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time")
            .as_nanos();
        let counter = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let root = std::env::temp_dir().join(format!("menagerie_structure_test_{nanos}_{counter}"));
        std::fs::create_dir_all(&root).expect("create temp repo");
        root
    }

    static COUNTER: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, contents).expect("write file");
    }

    fn cleanup(root: &Path) {
        std::fs::remove_dir_all(root).expect("cleanup temp repo");
    }
}
