//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code waits on I/O, never on a timer.
//! **Exception**: The TUI frame tick in `tui/src/app.rs`.

use architectural_enforcement::{rust_files, SourceFile};

/// Files allowed to use `tokio::time::sleep`
const TICK_OWNERS: &[&str] = &["app.rs"];

#[test]
fn test_no_sleep_in_production_code() {
    let mut violations = Vec::new();

    for dir in ["core/src", "tui/src"] {
        for path in rust_files(dir) {
            let file = SourceFile::load(&path);
            let is_tick_owner = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| dir == "tui/src" && TICK_OWNERS.contains(&n));

            for (idx, code) in file.production_lines() {
                if code.contains("thread::sleep") {
                    violations.push(file.describe(idx));
                }
                if code.contains("time::sleep") && !is_tick_owner {
                    violations.push(file.describe(idx));
                }
            }
        }
    }

    if !violations.is_empty() {
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        panic!("\nFound {} sleep call(s) in production code.", violations.len());
    }
}
