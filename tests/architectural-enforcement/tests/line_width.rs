//! Integration Test: Line Width
//!
//! **Policy**: Code lines fit in 100 columns, the rustfmt default.
//! **Exception**: Raw string literals and module-level doc diagrams.

use architectural_enforcement::{rust_files, SourceFile};

const MAX_WIDTH: usize = 100;

fn exempt(line: &str) -> bool {
    line.contains("r#\"") || line.trim_start().starts_with("//!")
}

#[test]
fn test_code_lines_fit_rustfmt_width() {
    let mut violations = Vec::new();

    for dir in ["core", "tui", "tests/architectural-enforcement"] {
        for path in rust_files(dir) {
            let file = SourceFile::load(&path);
            for (idx, line) in file.lines.iter().enumerate() {
                let width = line.chars().count();
                if width > MAX_WIDTH && !exempt(line) {
                    violations.push(format!("{} ({width} columns)", file.describe(idx)));
                }
            }
        }
    }

    if !violations.is_empty() {
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        panic!("\nFound {} line(s) wider than {MAX_WIDTH} columns.", violations.len());
    }
}
