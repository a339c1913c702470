//! Integration Test: Reducer Purity
//!
//! **Policy**: `reduce` in `core/src/store.rs` is a pure function of
//! `(state, action)`. Ids and timestamps are made when an action is built,
//! never inside the reducer, so replaying actions always gives the same list.

use architectural_enforcement::{function_body, workspace_root, SourceFile};

/// Calls that would make the reducer impure
const FORBIDDEN: &[(&str, &str)] = &[
    ("tokio", "async runtime"),
    ("reqwest", "HTTP"),
    ("tungstenite", "WebSocket"),
    ("std::fs", "file I/O"),
    ("std::net", "network I/O"),
    ("tracing::", "logging"),
    ("Utc::now", "clock"),
    ("SystemTime", "clock"),
    ("Instant::now", "clock"),
    ("Uuid", "random id"),
    ("MessageId::new", "random id"),
    ("rand", "RNG"),
    (".await", "async"),
];

#[test]
fn test_reducer_has_no_side_effects() {
    let store = SourceFile::load(&workspace_root().join("core/src/store.rs"));
    let body = function_body(&store, "pub fn reduce(")
        .expect("core/src/store.rs must define `pub fn reduce(`");

    let mut violations = Vec::new();
    for line in body {
        let code = line.split("//").next().unwrap_or(line);
        for (needle, what) in FORBIDDEN {
            if code.contains(needle) {
                violations.push(format!("{what}: {}", line.trim()));
            }
        }
    }

    if !violations.is_empty() {
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        panic!("\nFound {} impure call(s) in reduce()", violations.len());
    }
}

#[test]
fn test_reducer_is_not_async() {
    let store = SourceFile::load(&workspace_root().join("core/src/store.rs"));
    assert!(
        !store.lines.iter().any(|line| line.contains("async fn reduce")),
        "reduce() must stay synchronous"
    );
}
