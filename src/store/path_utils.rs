//! Mapping of store keys onto file names.

use crate::model::RepoId;
use core::fmt::Write;
use std::path::PathBuf;

/// Make a key safe to use as a single path component.
///
/// `%` and characters that are special on common filesystems are written as `%XX`. The names
/// `.` and `..` are escaped entirely and the empty string becomes `%`. Distinct keys always map
/// to distinct components, and none can escape the directory it is stored in.
#[must_use]
pub fn sanitize_component(s: &str) -> String {
    match s {
        "" => return "%".to_string(),
        "." => return "%2E".to_string(),
        ".." => return "%2E%2E".to_string(),
        _ => {}
    }

    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0') {
            let _ = write!(out, "%{:02X}", u32::from(c));
        } else {
            out.push(c);
        }
    }
    out
}

/// Relative path of the document holding a repository record: `<owner>/<name>.json`.
#[must_use]
pub fn repo_document_path(id: &RepoId) -> PathBuf {
    let mut path = PathBuf::from(sanitize_component(id.owner()));
    path.push(format!("{}.json", sanitize_component(id.name())));
    path
}

/// File name of a metadata document.
#[must_use]
pub fn meta_document_name(key: &str) -> String {
    format!("{}.json", sanitize_component(key))
}
