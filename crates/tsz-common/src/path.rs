//! Path strings in the form the language service keys its caches by.
//!
//! Every path handed between the auto-import caches is an absolute string with
//! `/` separators and no `.`/`..` segments. A *canonical* path (see [`to_path`])
//! is additionally lower-cased on case-insensitive file systems, so two
//! spellings of the same file always hash to the same cache key.

use crate::limits::NODE_MODULES;

/// Replace backslashes with forward slashes.
pub fn normalize_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

/// Length of the root portion of `path` (`/`, `c:/`, `c:`), or 0 when relative.
pub fn root_length(path: &str) -> usize {
    let bytes = path.as_bytes();
    if bytes.first() == Some(&b'/') {
        return 1;
    }
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        if bytes.get(2) == Some(&b'/') {
            return 3;
        }
        return 2;
    }
    0
}

pub fn is_rooted(path: &str) -> bool {
    root_length(path) > 0
}

/// Join `relative` onto `base`. A rooted `relative` replaces `base`.
pub fn combine_paths(base: &str, relative: &str) -> String {
    let relative = normalize_slashes(relative);
    if base.is_empty() || is_rooted(&relative) {
        return relative;
    }
    let base = normalize_slashes(base);
    if relative.is_empty() {
        return base;
    }
    if base.ends_with('/') {
        format!("{base}{relative}")
    } else {
        format!("{base}/{relative}")
    }
}

/// Resolve `file_name` against `current_directory` and collapse `.`/`..`.
pub fn get_normalized_absolute_path(file_name: &str, current_directory: &str) -> String {
    let combined = if is_rooted(&normalize_slashes(file_name)) {
        normalize_slashes(file_name)
    } else {
        combine_paths(current_directory, file_name)
    };

    let root_len = root_length(&combined);
    let root = &combined[..root_len];
    let mut parts: Vec<&str> = Vec::new();
    for segment in combined[root_len..].split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if root.is_empty() {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let mut normalized = String::with_capacity(combined.len());
    normalized.push_str(root);
    normalized.push_str(&parts.join("/"));
    normalized
}

/// Canonical cache key for `file_name`.
pub fn to_path(
    file_name: &str,
    current_directory: &str,
    use_case_sensitive_file_names: bool,
) -> String {
    let normalized = get_normalized_absolute_path(file_name, current_directory);
    if use_case_sensitive_file_names {
        normalized
    } else {
        normalized.to_lowercase()
    }
}

/// Parent directory of `path`. The root is its own parent.
pub fn get_directory_path(path: &str) -> &str {
    let root_len = root_length(path);
    if path.len() <= root_len {
        return path;
    }
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    match trimmed.rfind('/') {
        Some(index) if index >= root_len => &trimmed[..index],
        Some(_) => &path[..root_len],
        None => "",
    }
}

/// Last path component.
pub fn get_base_file_name(path: &str) -> &str {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    if trimmed.len() <= root_length(trimmed) {
        return "";
    }
    match trimmed.rfind('/') {
        Some(index) => &trimmed[index + 1..],
        None => trimmed,
    }
}

/// True when `path` has a `node_modules` segment.
pub fn is_inside_node_modules(path: &str) -> bool {
    path.split('/').any(|segment| segment == NODE_MODULES)
}

/// True when `child` is `parent` or lies below it.
pub fn contains_path(parent: &str, child: &str) -> bool {
    let parent = parent.strip_suffix('/').unwrap_or(parent);
    child == parent
        || (child.len() > parent.len()
            && child.starts_with(parent)
            && (parent.ends_with('/') || child.as_bytes()[parent.len()] == b'/'))
}

/// Iterator over a directory and each of its ancestors, nearest first.
///
/// ```text
/// /a/b/c → "/a/b/c", "/a/b", "/a", "/"
/// ```
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    next: Option<&'a str>,
}

impl<'a> Ancestors<'a> {
    pub fn new(directory: &'a str) -> Self {
        Self {
            next: (!directory.is_empty()).then_some(directory),
        }
    }
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let current = self.next?;
        let parent = get_directory_path(current);
        self.next = (parent.len() < current.len() && !parent.is_empty()).then_some(parent);
        Some(current)
    }
}
