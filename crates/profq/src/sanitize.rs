//! Helpers for sanitizing names and paths.
//!
//! Principals, job stems and uploaded file names all end up as single path
//! components inside the job root. Span attributes get the same treatment so
//! traces never carry full directory layouts.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Returns a short deterministic hash of a path for correlation without
/// exposing the actual path.
pub fn hash_path(path: &Path) -> String {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    let hash = hasher.finish();
    format!("{:016x}", hash)
}

/// True when `name` can be used as exactly one path component.
///
/// Rejects empty names, `.`/`..`, separators, NUL and leading dots (hidden
/// files are never jobs).
pub fn is_plain_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
}

/// Reduces an uploaded file name to a safe stem prefix.
///
/// Keeps ASCII alphanumerics, `-` and `_`; everything else becomes `_`. The
/// extension is dropped since job artifacts are typed by their own extension.
pub fn upload_stem(file_name: &str) -> Option<String> {
    let base = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
