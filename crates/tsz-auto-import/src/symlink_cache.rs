//! Symlinked directory bookkeeping.
//!
//! Populated from two sources:
//! - dependency discovery, whenever a package directory's realpath differs
//!   from the path it was reached through
//! - the host program's module resolutions that recorded an original path
//!
//! Forward lookups (`symlink -> real`) keep the same file from entering the
//! provider twice; reverse lookups (`real -> symlinks`) route change
//! notifications reported under either spelling.

use rustc_hash::FxHashMap;
use tsz_common::limits::NODE_MODULES;
use tsz_common::path::{contains_path, get_normalized_absolute_path, to_path};

use crate::host::ResolvedModuleInfo;

/// Where a symlinked directory really lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkedDirectory {
    /// Real directory as reported by the file system.
    pub real: String,
    /// Canonical form of `real`.
    pub real_path: String,
}

/// Path fragments that never participate in symlink tracking.
const IGNORED_PATH_PARTS: [&str; 3] = ["/node_modules/.", "/.git", "/.#"];

fn contains_ignored_path(path: &str) -> bool {
    IGNORED_PATH_PARTS.iter().any(|part| path.contains(part))
}

#[derive(Debug)]
pub struct SymlinkCache {
    current_directory: String,
    use_case_sensitive_file_names: bool,
    /// Canonical symlink directory -> real directory.
    symlinked_directories: FxHashMap<String, SymlinkedDirectory>,
    /// Canonical real directory -> symlink directories pointing at it.
    symlinked_directories_by_realpath: FxHashMap<String, Vec<String>>,
    /// Canonical symlinked file -> real file.
    symlinked_files: FxHashMap<String, String>,
    has_processed_resolutions: bool,
}

impl SymlinkCache {
    pub fn new(current_directory: &str, use_case_sensitive_file_names: bool) -> Self {
        Self {
            current_directory: current_directory.to_string(),
            use_case_sensitive_file_names,
            symlinked_directories: FxHashMap::default(),
            symlinked_directories_by_realpath: FxHashMap::default(),
            symlinked_files: FxHashMap::default(),
            has_processed_resolutions: false,
        }
    }

    fn to_path(&self, file_name: &str) -> String {
        to_path(
            file_name,
            &self.current_directory,
            self.use_case_sensitive_file_names,
        )
    }

    pub fn set_symlinked_directory(&mut self, symlink: &str, real: SymlinkedDirectory) {
        let symlink_path = self.to_path(symlink);
        if contains_ignored_path(&symlink_path) {
            return;
        }
        if !self.symlinked_directories.contains_key(&symlink_path) {
            self.symlinked_directories_by_realpath
                .entry(real.real_path.clone())
                .or_default()
                .push(symlink_path.clone());
        }
        self.symlinked_directories.insert(symlink_path, real);
    }

    pub fn set_symlinked_file(&mut self, symlink: &str, real: &str) {
        let symlink_path = self.to_path(symlink);
        self.symlinked_files.insert(symlink_path, real.to_string());
    }

    pub fn get_symlinked_directory(&self, symlink: &str) -> Option<&SymlinkedDirectory> {
        self.symlinked_directories.get(&self.to_path(symlink))
    }

    pub fn get_symlinked_directories(&self) -> impl Iterator<Item = (&str, &SymlinkedDirectory)> {
        self.symlinked_directories
            .iter()
            .map(|(symlink, real)| (symlink.as_str(), real))
    }

    /// Symlink directories known to point at `real_path` (canonical).
    pub fn get_symlinked_directories_by_realpath(&self, real_path: &str) -> &[String] {
        self.symlinked_directories_by_realpath
            .get(real_path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get_symlinked_file(&self, symlink: &str) -> Option<&str> {
        self.symlinked_files
            .get(&self.to_path(symlink))
            .map(String::as_str)
    }

    /// Canonical real form of `file_name` when it lies below a known symlinked
    /// directory. The deepest matching symlink wins.
    pub fn resolve_real_path(&self, file_name: &str) -> Option<String> {
        let path = self.to_path(file_name);
        if let Some(real) = self.symlinked_files.get(&path) {
            return Some(self.to_path(real));
        }
        let (symlink, real) = self
            .symlinked_directories
            .iter()
            .filter(|(symlink, _)| contains_path(symlink, &path))
            .max_by_key(|(symlink, _)| symlink.len())?;
        Some(format!("{}{}", real.real_path, &path[symlink.len()..]))
    }

    pub fn has_processed_resolutions(&self) -> bool {
        self.has_processed_resolutions
    }

    /// Seed the cache from a program's resolutions. Marks resolutions processed.
    pub fn set_symlinks_from_resolutions(&mut self, resolutions: &[ResolvedModuleInfo]) {
        self.has_processed_resolutions = true;
        for resolution in resolutions {
            let Some(original_path) = resolution.original_path.as_deref() else {
                continue;
            };
            self.set_symlinked_file(original_path, &resolution.resolved_file_name);
            if let Some((common_resolved, common_original)) =
                self.guess_directory_symlink(&resolution.resolved_file_name, original_path)
            {
                let real_path = self.to_path(&common_resolved);
                self.set_symlinked_directory(
                    &common_original,
                    SymlinkedDirectory {
                        real: common_resolved,
                        real_path,
                    },
                );
            }
        }
    }

    /// Allow the next program to re-seed resolutions.
    pub fn set_resolutions_unprocessed(&mut self) {
        self.has_processed_resolutions = false;
    }

    fn is_node_modules_or_scoped_package_directory(&self, segment: &str) -> bool {
        let canonical = if self.use_case_sensitive_file_names {
            segment.to_string()
        } else {
            segment.to_lowercase()
        };
        canonical == NODE_MODULES || segment.starts_with('@')
    }

    /// Strip the common trailing components of `real` and `symlink`. What
    /// remains is the pair of directories the symlink connects. Components
    /// directly below `node_modules` or a scope are never stripped, so a
    /// package directory is the deepest directory a guess can produce.
    fn guess_directory_symlink(&self, real: &str, symlink: &str) -> Option<(String, String)> {
        let real = get_normalized_absolute_path(real, &self.current_directory);
        let symlink = get_normalized_absolute_path(symlink, &self.current_directory);
        let mut real_parts: Vec<&str> = real.split('/').collect();
        let mut symlink_parts: Vec<&str> = symlink.split('/').collect();
        let mut is_directory = false;

        while real_parts.len() >= 2 && symlink_parts.len() >= 2 {
            let real_last = real_parts[real_parts.len() - 1];
            let symlink_last = symlink_parts[symlink_parts.len() - 1];
            let same = if self.use_case_sensitive_file_names {
                real_last == symlink_last
            } else {
                real_last.eq_ignore_ascii_case(symlink_last)
            };
            if !same
                || self.is_node_modules_or_scoped_package_directory(real_parts[real_parts.len() - 2])
                || self.is_node_modules_or_scoped_package_directory(
                    symlink_parts[symlink_parts.len() - 2],
                )
            {
                break;
            }
            real_parts.pop();
            symlink_parts.pop();
            is_directory = true;
        }

        is_directory.then(|| (join_parts(&real_parts), join_parts(&symlink_parts)))
    }

    pub fn clear(&mut self) {
        self.symlinked_directories.clear();
        self.symlinked_directories_by_realpath.clear();
        self.symlinked_files.clear();
        self.has_processed_resolutions = false;
    }
}

fn join_parts(parts: &[&str]) -> String {
    match parts {
        [""] => "/".to_string(),
        _ => parts.join("/"),
    }
}

#[cfg(test)]
#[path = "../tests/symlink_cache_tests.rs"]
mod symlink_cache_tests;
