//! Tool and docstring signal extraction.
//!
//! Locates the tool-defining source set for a candidate through an ordered
//! list of strategies (first non-empty result wins, so a repository is never
//! counted twice), then counts tool definitions, portmanteau operations and
//! docstring compliance within that set.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{CandidateDir, ToolSignals};
use crate::fs::{FileSystem, MAX_FILE_BYTES, MAX_FILES_PER_CANDIDATE};
use crate::locator::is_excluded_path;

/// Entry files probed by the monolithic and import strategies, in order.
const ENTRY_FILES: &[&str] = &["server.py", "main.py", "app.py"];

/// File-stem suffixes that mark a multi-operation tool module.
const PORTMANTEAU_SUFFIXES: &[&str] = &["_tools", "_ops", "_operations"];

/// Tool-definition marker: a fastmcp tool decorator line.
static TOOL_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*@[A-Za-z_]\w*\.tool\b").expect("tool marker regex"));

/// A `Literal[...]` annotation holding a closed set of operation names.
static LITERAL_SET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Literal\[([^\]]*)\]").expect("literal set regex"));

/// One quoted member inside a literal or list expression.
static QUOTED_MEMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["']([A-Za-z_][\w.\-]*)["']"#).expect("quoted member regex"));

/// First docstring in a span of source text.
static DOCSTRING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)("""|''')(.*?)("""|''')"#).expect("docstring regex"));

/// Docstring section headers that mark a tool as properly documented.
static DOC_SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(Args|Arguments|Parameters|Returns|Examples?)\s*:").expect("doc section regex")
});

/// Help-like capability definitions.
static HELP_TOOL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:async\s+)?def\s+(?:help|get_help|usage)\s*\(").expect("help tool regex")
});

/// Status-like capability definitions.
static STATUS_TOOL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:async\s+)?def\s+(?:status|get_status|health|healthcheck)\s*\(")
        .expect("status tool regex")
});

/// Import statements in an entry file, capturing the module path.
static IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*from\s+\.?([A-Za-z_][\w.]*)\s+import\s").expect("import regex"));

/// A module list declared in a package `__init__.py`.
static ALL_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)__all__\s*=\s*\[(.*?)\]").expect("__all__ regex"));

/// Extract tool signals for one candidate.
pub fn extract_tools<F: FileSystem>(fs: &F, candidate: &CandidateDir) -> ToolSignals {
    let mut signals = ToolSignals::default();
    for path in locate_tool_sources(fs, &candidate.path) {
        let Ok(contents) = fs.read_to_string(&path) else {
            continue;
        };
        if contents.len() > MAX_FILE_BYTES {
            continue;
        }
        scan_tool_file(&path, &contents, &mut signals);
    }
    signals.has_proper_docstrings = signals.tool_count_total > 0
        && signals.documented_tool_count * 2 > signals.tool_count_total;
    signals
}

/// Locate the tool-defining source set for a repository root.
///
/// Strategies are tried in order; the first one producing a non-empty file
/// set wins. Selecting more than one source would double-count tools when a
/// repository carries leftover files from refactors.
pub fn locate_tool_sources<F: FileSystem>(fs: &F, root: &Path) -> Vec<PathBuf> {
    let search = SourceSearch {
        root,
        package_roots: package_roots(fs, root),
    };
    let strategies: &[fn(&F, &SourceSearch) -> Vec<PathBuf>] = &[
        monolithic_entry,
        entry_imports,
        init_module_list,
        tools_subpackage,
        generic_tools_dir,
    ];
    for strategy in strategies {
        let files = strategy(fs, &search);
        if !files.is_empty() {
            return files;
        }
    }
    Vec::new()
}

struct SourceSearch<'a> {
    root: &'a Path,
    package_roots: Vec<PathBuf>,
}

/// Roots that may hold an entry file or tools sub-package: the repository
/// root, `src/` children, and direct child packages.
fn package_roots<F: FileSystem>(fs: &F, root: &Path) -> Vec<PathBuf> {
    let mut roots = vec![root.to_path_buf()];
    let src = root.join("src");
    if fs.is_dir(&src) {
        if let Ok(children) = fs.list_dirs(&src) {
            for child in children {
                if fs.is_file(&child.join("__init__.py")) {
                    roots.push(child);
                }
            }
        }
    }
    if let Ok(children) = fs.list_dirs(root) {
        for child in children {
            if is_excluded_child(root, &child) {
                continue;
            }
            if fs.is_file(&child.join("__init__.py")) {
                roots.push(child);
            }
        }
    }
    roots
}

/// Strategy (a): a single entry file that itself defines tools.
fn monolithic_entry<F: FileSystem>(fs: &F, search: &SourceSearch) -> Vec<PathBuf> {
    for root in &search.package_roots {
        for entry in ENTRY_FILES {
            let path = root.join(entry);
            if !fs.is_file(&path) {
                continue;
            }
            if file_has_marker(fs, &path) {
                return vec![path];
            }
        }
    }
    Vec::new()
}

/// Strategy (b): modules referenced by import statements in an entry file.
fn entry_imports<F: FileSystem>(fs: &F, search: &SourceSearch) -> Vec<PathBuf> {
    for root in &search.package_roots {
        for entry in ENTRY_FILES {
            let entry_path = root.join(entry);
            if !fs.is_file(&entry_path) {
                continue;
            }
            let Ok(contents) = fs.read_to_string(&entry_path) else {
                continue;
            };
            let mut files = Vec::new();
            for caps in IMPORT_RE.captures_iter(&contents) {
                let module: PathBuf = caps[1].split('.').collect();
                let module_file = root.join(module).with_extension("py");
                if fs.is_file(&module_file) && !files.contains(&module_file) {
                    files.push(module_file);
                }
            }
            files.retain(|file| file_has_marker(fs, file));
            if !files.is_empty() {
                return files;
            }
        }
    }
    Vec::new()
}

/// Strategy (c): a module list declared by name in a package `__init__.py`.
fn init_module_list<F: FileSystem>(fs: &F, search: &SourceSearch) -> Vec<PathBuf> {
    for root in &search.package_roots {
        let init = root.join("__init__.py");
        if !fs.is_file(&init) {
            continue;
        }
        let Ok(contents) = fs.read_to_string(&init) else {
            continue;
        };
        let Some(caps) = ALL_LIST_RE.captures(&contents) else {
            continue;
        };
        let mut files = Vec::new();
        for member in QUOTED_MEMBER_RE.captures_iter(&caps[1]) {
            let file = root.join(&member[1]).with_extension("py");
            if fs.is_file(&file) && !files.contains(&file) {
                files.push(file);
            }
        }
        files.retain(|file| file_has_marker(fs, file));
        if !files.is_empty() {
            return files;
        }
    }
    Vec::new()
}

/// Strategy (d): a dedicated tools sub-package whose files define tools.
fn tools_subpackage<F: FileSystem>(fs: &F, search: &SourceSearch) -> Vec<PathBuf> {
    for root in &search.package_roots {
        let Ok(children) = fs.list_dirs(root) else {
            continue;
        };
        for child in children {
            let Some(name) = dir_name(&child) else {
                continue;
            };
            if name != "tools" && !name.ends_with("_tools") {
                continue;
            }
            let Ok(files) = fs.list_files(&child) else {
                continue;
            };
            let mut sources: Vec<PathBuf> = files
                .into_iter()
                .take(MAX_FILES_PER_CANDIDATE)
                .filter(|file| is_python_file(file))
                .filter(|file| file_has_marker(fs, file))
                .collect();
            if !sources.is_empty() {
                sources.sort();
                return sources;
            }
        }
    }
    Vec::new()
}

/// Strategy (e): a root-level `tools/` directory as last resort.
fn generic_tools_dir<F: FileSystem>(fs: &F, search: &SourceSearch) -> Vec<PathBuf> {
    let dir = search.root.join("tools");
    if !fs.is_dir(&dir) {
        return Vec::new();
    }
    let Ok(files) = fs.list_files(&dir) else {
        return Vec::new();
    };
    let mut sources: Vec<PathBuf> = files
        .into_iter()
        .take(MAX_FILES_PER_CANDIDATE)
        .filter(|file| is_python_file(file))
        .collect();
    sources.sort();
    sources
}

/// Count tool markers, portmanteau operations, docstrings and capability
/// definitions in one source file.
fn scan_tool_file(path: &Path, contents: &str, signals: &mut ToolSignals) {
    if HELP_TOOL_RE.is_match(contents) {
        signals.has_help_tool = true;
    }
    if STATUS_TOOL_RE.is_match(contents) {
        signals.has_status_tool = true;
    }

    let marker_count = TOOL_MARKER_RE.find_iter(contents).count();
    if marker_count == 0 {
        return;
    }

    let operation_sets = literal_operation_sets(contents);
    let portmanteau = has_portmanteau_name(path) || !operation_sets.is_empty();

    signals.tool_count_total += marker_count;
    if portmanteau {
        signals.tool_count_portmanteau += marker_count;
        signals.portmanteau_operation_count += operation_sets.iter().sum::<usize>();
    } else {
        signals.tool_count_individual += marker_count;
    }

    signals.documented_tool_count += documented_tool_count(contents);
}

/// Sizes of closed operation sets with at least two members.
fn literal_operation_sets(contents: &str) -> Vec<usize> {
    LITERAL_SET_RE
        .captures_iter(contents)
        .map(|caps| QUOTED_MEMBER_RE.find_iter(&caps[1]).count())
        .filter(|count| *count >= 2)
        .collect()
}

/// Tools whose docstring, within the marker-to-next-marker span, carries a
/// recognized section header.
fn documented_tool_count(contents: &str) -> usize {
    let starts: Vec<usize> = TOOL_MARKER_RE.find_iter(contents).map(|m| m.start()).collect();
    let mut documented = 0;
    for (index, start) in starts.iter().enumerate() {
        let end = starts.get(index + 1).copied().unwrap_or(contents.len());
        let span = &contents[*start..end];
        if let Some(caps) = DOCSTRING_RE.captures(span) {
            if DOC_SECTION_RE.is_match(&caps[2]) {
                documented += 1;
            }
        }
    }
    documented
}

fn has_portmanteau_name(path: &Path) -> bool {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_lowercase())
        .unwrap_or_default();
    PORTMANTEAU_SUFFIXES
        .iter()
        .any(|suffix| stem.ends_with(suffix))
}

fn file_has_marker<F: FileSystem>(fs: &F, path: &Path) -> bool {
    match fs.read_to_string(path) {
        Ok(contents) => TOOL_MARKER_RE.is_match(&contents),
        Err(_) => false,
    }
}

fn is_python_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("py"))
        .unwrap_or(false)
}

fn is_excluded_child(root: &Path, child: &Path) -> bool {
    child
        .strip_prefix(root)
        .map(is_excluded_path)
        .unwrap_or(true)
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}
