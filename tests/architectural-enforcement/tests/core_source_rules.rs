//! Integration Test: Core Source Rules
//!
//! **Policy**: Production code in `checkpoint/core/src` MUST NOT panic on
//! errors (`unwrap()` / `expect()`) and MUST NOT print directly
//! (`println!` / `eprintln!`). Test modules are exempt.

use std::path::Path;

use architectural_enforcement::{scan_directory, scan_source, workspace_root};

#[test]
fn test_core_has_no_forbidden_calls() {
    let violations = scan_directory(&workspace_root().join("checkpoint/core/src"));

    if !violations.is_empty() {
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        panic!(
            "\nFound {} violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

#[test]
fn test_scanner_skips_comments_and_tests() {
    let source = "\
fn ok() -> Option<u8> { None }
// value.unwrap() in a comment
fn bad() { println!(\"x\"); }
#[cfg(test)]
mod tests { fn t() { Some(1).unwrap(); } }
";
    let violations = scan_source(Path::new("sample.rs"), source);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].line, 3);
    assert_eq!(violations[0].pattern, "println!");
}
