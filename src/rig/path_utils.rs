//! Prefix helpers over `/`-separated paths.
//!
//! Interchange joint names (`root/spine/head`) and scene node paths
//! (`/Armature/root/spine`) share the same shape, so parent-index derivation
//! and common-ancestor search both go through these functions.

use std::collections::HashMap;

pub const SEPARATOR: char = '/';

/// Drop the last segment: `a/b/c` → `a/b`, `/a` → ``, `a` → `None`.
pub fn strip_last_segment(path: &str) -> Option<&str> {
    path.rfind(SEPARATOR).map(|index| &path[..index])
}

/// Final segment of a path, or the whole string when it has no separator.
pub fn last_segment(path: &str) -> &str {
    path.rfind(SEPARATOR)
        .map(|index| &path[index + 1..])
        .unwrap_or(path)
}

pub fn join_segment(parent: &str, name: &str) -> String {
    format!("{}{}{}", parent, SEPARATOR, name)
}

/// True when `path` equals `prefix` or lies below it.
///
/// Segment-aware: `/a/bc` is not below `/a/b`. The empty prefix contains every path.
pub fn is_under(prefix: &str, path: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
        None => false,
    }
}

/// Nearest common ancestor of `first` and every path in `others`.
///
/// Walks up from `first` one segment at a time. Returns the empty string when
/// the paths share no ancestor.
pub fn common_ancestor<'a>(first: &'a str, others: &[&str]) -> &'a str {
    let mut candidate = first;
    loop {
        if others.iter().all(|path| is_under(candidate, path)) {
            return candidate;
        }
        match strip_last_segment(candidate) {
            Some(parent) => candidate = parent,
            None => return "",
        }
    }
}

/// Parent index per joint from joint paths, −1 where the parent path is not listed.
pub fn parent_indices_from_paths<S: AsRef<str>>(paths: &[S]) -> Vec<i32> {
    let mut index_of = HashMap::<&str, usize>::new();
    for (index, path) in paths.iter().enumerate() {
        index_of.entry(path.as_ref()).or_insert(index);
    }

    paths
        .iter()
        .map(|path| {
            strip_last_segment(path.as_ref())
                .and_then(|parent| index_of.get(parent))
                .map(|&index| index as i32)
                .unwrap_or(-1)
        })
        .collect()
}
