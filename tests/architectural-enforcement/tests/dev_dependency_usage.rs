//! Integration Test: Dev-Dependency Usage
//!
//! **Policy**: Every crate listed under `[dev-dependencies]` is used by that
//! member's sources or tests.

use std::fs;

use architectural_enforcement::{rust_files, workspace_root, SourceFile};

const MEMBERS: &[&str] = &["core", "tui"];

/// Crate names from the `[dev-dependencies]` table of a manifest
fn dev_dependencies(manifest: &str) -> Vec<String> {
    manifest
        .lines()
        .skip_while(|line| line.trim() != "[dev-dependencies]")
        .skip(1)
        .take_while(|line| !line.trim_start().starts_with('['))
        .filter_map(|line| line.split('=').next())
        .map(str::trim)
        .filter(|name| !name.is_empty() && !name.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[test]
fn test_dev_dependencies_are_used() {
    let mut violations = Vec::new();

    for member in MEMBERS {
        let manifest = fs::read_to_string(workspace_root().join(member).join("Cargo.toml"))
            .unwrap_or_default();
        let sources: Vec<SourceFile> = rust_files(member)
            .iter()
            .map(|path| SourceFile::load(path))
            .collect();

        for name in dev_dependencies(&manifest) {
            let ident = name.replace('-', "_");
            let used = sources
                .iter()
                .any(|file| file.lines.iter().any(|line| line.contains(&ident)));
            if !used {
                violations.push(format!("{member}/Cargo.toml: {name}"));
            }
        }
    }

    if !violations.is_empty() {
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        panic!("\nFound {} unused dev-dependencies.", violations.len());
    }
}

#[test]
fn test_dev_dependency_table_parsing() {
    let manifest = "[dependencies]\nserde = \"1\"\n\n[dev-dependencies]\ntokio-test = \"0.4\"\n\
                    tempfile = \"3\"\n\n[features]\ndefault = []\n";
    assert_eq!(dev_dependencies(manifest), vec!["tokio-test", "tempfile"]);
}
