//! Common assertion helpers for test output validation

#![allow(dead_code)]

use predicates::prelude::*;

/// Error line printed by the binary
pub fn has_error(message: &str) -> impl Predicate<str> {
    predicates::str::contains("✕ Error:").and(predicates::str::contains(message.to_string()))
}

/// Success line printed by the binary
pub fn has_success(message: &str) -> impl Predicate<str> {
    predicates::str::contains("✓").and(predicates::str::contains(message.to_string()))
}

/// Group header as printed by `status`, e.g. "Hijacked (2)"
pub fn has_group(label: &str, count: usize) -> impl Predicate<str> {
    predicates::str::contains(format!("{label} ({count})"))
}

/// Numbered listing entry
pub fn has_file_index(index: u32) -> impl Predicate<str> {
    predicates::str::contains(format!("[{index}]"))
}

/// A JSON line with `"type": <kind>` on serve's stdout
pub fn has_message_type(kind: &str) -> impl Predicate<str> {
    predicates::str::contains(format!("\"type\":\"{kind}\""))
}
