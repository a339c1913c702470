//! Architectural Enforcement Integration Tests
//!
//! This package holds source-level checks that enforce architectural rules:
//! - The message reducer stays pure
//! - No blocking I/O inside async code
//! - No sleeping outside the TUI frame tick
//! - Code lines fit the rustfmt width
//! - Declared dev-dependencies are used
//!
//! The helpers below scan the workspace sources; the rules live in `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// Workspace root, two levels above this crate
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// All `.rs` files under a workspace-relative directory
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// A source file split into lines
pub struct SourceFile {
    /// Absolute path
    pub path: PathBuf,
    /// Every line of the file
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Read a file; unreadable files come back empty
    pub fn load(path: &Path) -> Self {
        let lines = fs::read_to_string(path)
            .map(|content| content.lines().map(str::to_string).collect())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            lines,
        }
    }

    /// Lines before the first `#[cfg(test)]`, with comments stripped
    ///
    /// Yields `(index, code)` pairs; `index` is zero-based.
    pub fn production_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines
            .iter()
            .take_while(|line| !line.trim_start().starts_with("#[cfg(test)]"))
            .enumerate()
            .map(|(idx, line)| (idx, line.split("//").next().unwrap_or(line)))
    }

    /// Whether the function enclosing line `idx` is `async`
    ///
    /// Lines outside any function count as not async.
    pub fn in_async_fn(&self, idx: usize) -> bool {
        self.lines[..=idx]
            .iter()
            .rev()
            .map(|line| line.trim())
            .find(|line| declares_fn(line))
            .is_some_and(|line| line.contains("async fn "))
    }

    /// `path:line - text` for reports
    pub fn describe(&self, idx: usize) -> String {
        format!("{}:{} - {}", self.path.display(), idx + 1, self.lines[idx].trim())
    }
}

/// Whether a trimmed line starts a function item
pub fn declares_fn(line: &str) -> bool {
    let line = line
        .trim_start_matches("pub(crate) ")
        .trim_start_matches("pub ");
    line.starts_with("fn ") || line.starts_with("async fn ")
}

/// Body of a top-level function, from its signature to the closing brace
pub fn function_body<'a>(source: &'a SourceFile, signature: &str) -> Option<&'a [String]> {
    let start = source
        .lines
        .iter()
        .position(|line| line.starts_with(signature))?;
    let len = source.lines[start..].iter().position(|line| line == "}")?;
    Some(&source.lines[start..=start + len])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(lines: &[&str]) -> SourceFile {
        SourceFile {
            path: PathBuf::from("mem.rs"),
            lines: lines.iter().map(|l| (*l).to_string()).collect(),
        }
    }

    #[test]
    fn test_async_detection() {
        let file = source(&[
            "pub async fn fetch() {",
            "    let x = 1;",
            "}",
            "fn load() {",
            "    let y = 2;",
            "}",
        ]);
        assert!(file.in_async_fn(1));
        assert!(!file.in_async_fn(4));
    }

    #[test]
    fn test_production_lines_stop_at_tests() {
        let file = source(&["fn a() {} // note", "#[cfg(test)]", "mod tests {}"]);
        let lines: Vec<_> = file.production_lines().collect();
        assert_eq!(lines, vec![(0, "fn a() {} ")]);
    }

    #[test]
    fn test_function_body() {
        let file = source(&[
            "use x;",
            "pub fn reduce(a: u8) -> u8 {",
            "    a",
            "}",
            "fn other() {}",
        ]);
        let body = function_body(&file, "pub fn reduce(").unwrap();
        assert_eq!(body.len(), 3);
    }
}
