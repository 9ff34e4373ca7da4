//! In-memory [`ModuleResolutionHost`] with directory symlinks.
//!
//! Used by embedders that serve unsaved editor buffers and by the test suite.
//! Mutation goes through `&self` so a test can keep editing the tree while a
//! `ProjectService` holds a shared handle to it.

use std::cell::RefCell;

use rustc_hash::{FxHashMap, FxHashSet};
use tsz_common::path::{
    Ancestors, get_base_file_name, get_directory_path, get_normalized_absolute_path,
};

use crate::host::ModuleResolutionHost;

/// Maximum symlink hops followed while resolving one path.
const MAX_SYMLINK_HOPS: usize = 40;

#[derive(Debug, Default)]
struct Tree {
    files: FxHashMap<String, String>,
    directories: FxHashSet<String>,
    /// link path -> target directory
    symlinks: FxHashMap<String, String>,
    probes: FxHashMap<String, usize>,
}

#[derive(Debug)]
pub struct MemoryFileSystem {
    tree: RefCell<Tree>,
    case_sensitive: bool,
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::with_case_sensitivity(true)
    }

    pub fn with_case_sensitivity(case_sensitive: bool) -> Self {
        let mut tree = Tree::default();
        tree.directories.insert("/".to_string());
        Self {
            tree: RefCell::new(tree),
            case_sensitive,
        }
    }

    fn key(&self, path: &str) -> String {
        let normalized = get_normalized_absolute_path(path, "/");
        if self.case_sensitive {
            normalized
        } else {
            normalized.to_lowercase()
        }
    }

    fn add_directory_chain(tree: &mut Tree, directory: &str) {
        for ancestor in Ancestors::new(directory) {
            if !tree.directories.insert(ancestor.to_string()) {
                break;
            }
        }
    }

    /// Create or overwrite a file, creating missing parent directories.
    pub fn write_file(&self, path: &str, contents: &str) {
        let key = self.key(path);
        let mut tree = self.tree.borrow_mut();
        Self::add_directory_chain(&mut tree, get_directory_path(&key));
        tree.files.insert(key, contents.to_string());
    }

    pub fn create_dir(&self, path: &str) {
        let key = self.key(path);
        Self::add_directory_chain(&mut self.tree.borrow_mut(), &key);
    }

    /// Make `link` a symlink to the directory `target`.
    pub fn symlink_dir(&self, link: &str, target: &str) {
        let link = self.key(link);
        let target = self.key(target);
        let mut tree = self.tree.borrow_mut();
        Self::add_directory_chain(&mut tree, get_directory_path(&link));
        tree.symlinks.insert(link, target);
    }

    pub fn remove_file(&self, path: &str) -> bool {
        let key = self.key(path);
        self.tree.borrow_mut().files.remove(&key).is_some()
    }

    /// How many existence probes `path` has received.
    pub fn probe_count(&self, path: &str) -> usize {
        let key = self.key(path);
        self.tree.borrow().probes.get(&key).copied().unwrap_or(0)
    }

    /// Follow every symlink on the way down `path`.
    fn resolve(&self, path: &str) -> String {
        let key = self.key(path);
        let tree = self.tree.borrow();
        let mut current = key;
        for _ in 0..MAX_SYMLINK_HOPS {
            let Some((link, target)) = Ancestors::new(&current)
                .find_map(|prefix| tree.symlinks.get(prefix).map(|target| (prefix, target)))
            else {
                return current;
            };
            let rest = &current[link.len()..];
            current = format!("{target}{rest}");
        }
        current
    }

    fn children(&self, path: &str, want_dirs: bool) -> Vec<String> {
        let resolved = self.resolve(path);
        let tree = self.tree.borrow();
        let mut names: Vec<String> = if want_dirs {
            tree.directories
                .iter()
                .chain(tree.symlinks.keys())
                .filter(|dir| dir.as_str() != "/" && get_directory_path(dir) == resolved)
                .map(|dir| get_base_file_name(dir).to_string())
                .collect()
        } else {
            tree.files
                .keys()
                .filter(|file| get_directory_path(file) == resolved)
                .map(|file| get_base_file_name(file).to_string())
                .collect()
        };
        names.sort();
        names.dedup();
        names
    }
}

impl ModuleResolutionHost for MemoryFileSystem {
    fn file_exists(&self, path: &str) -> bool {
        let resolved = self.resolve(path);
        let mut tree = self.tree.borrow_mut();
        *tree.probes.entry(self.key(path)).or_default() += 1;
        tree.files.contains_key(&resolved)
    }

    fn directory_exists(&self, path: &str) -> bool {
        let resolved = self.resolve(path);
        self.tree.borrow().directories.contains(&resolved)
    }

    fn read_file(&self, path: &str) -> Option<String> {
        let resolved = self.resolve(path);
        self.tree.borrow().files.get(&resolved).cloned()
    }

    fn realpath(&self, path: &str) -> Option<String> {
        let resolved = self.resolve(path);
        let tree = self.tree.borrow();
        (tree.files.contains_key(&resolved) || tree.directories.contains(&resolved))
            .then_some(resolved)
    }

    fn get_directories(&self, path: &str) -> Vec<String> {
        self.children(path, true)
    }

    fn read_directory_files(&self, path: &str) -> Vec<String> {
        self.children(path, false)
    }

    fn use_case_sensitive_file_names(&self) -> bool {
        self.case_sensitive
    }
}

#[cfg(test)]
#[path = "../tests/memory_fs_tests.rs"]
mod memory_fs_tests;
