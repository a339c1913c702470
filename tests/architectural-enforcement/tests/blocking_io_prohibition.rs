//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async code in the core and the TUI MUST NOT use blocking I/O.
//! **Required**: `tokio::fs`, `tokio::net`, `tokio::process`, async reqwest.
//!
//! Blocking calls in plain functions are allowed; configuration is read
//! that way before the runtime does any work.

use architectural_enforcement::{rust_files, SourceFile};

const BLOCKING: &[(&str, &str)] = &[
    ("std::fs::", "Blocking file I/O"),
    ("std::net::", "Blocking network I/O"),
    ("std::process::Command", "Blocking process I/O"),
    ("reqwest::blocking", "Blocking HTTP client"),
];

fn find_blocking_io_violations() -> Vec<String> {
    let mut violations = Vec::new();

    for dir in ["core/src", "tui/src"] {
        for path in rust_files(dir) {
            let file = SourceFile::load(&path);
            for (idx, code) in file.production_lines() {
                for (needle, what) in BLOCKING {
                    if code.contains(needle) && file.in_async_fn(idx) {
                        violations.push(format!("{what}: {}", file.describe(idx)));
                    }
                }
                if code.contains("reqwest::blocking") && !file.in_async_fn(idx) {
                    violations.push(format!("Blocking HTTP client: {}", file.describe(idx)));
                }
            }
        }
    }

    violations
}

#[test]
fn test_no_blocking_io_in_async_code() {
    let violations = find_blocking_io_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ Blocking I/O found in async code:\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ Use tokio::fs / tokio::net / async reqwest instead");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.",
            violations.len()
        );
    }
}

#[test]
fn test_sources_were_scanned() {
    assert!(!rust_files("core/src").is_empty());
    assert!(!rust_files("tui/src").is_empty());
}
