//! Session-wide cache of project package.json files.
//!
//! Every directory is in one of three states (see [`DirectoryPresence`]).
//! Unknown directories are probed at most once; after that the answer is
//! memoized until a change notification invalidates it. Failures to read or
//! parse a package.json are recorded as `Absent` and never surface as errors.

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;
use tsz_common::limits::PACKAGE_JSON;
use tsz_common::path::{Ancestors, combine_paths, get_directory_path, to_path};

use crate::host::ModuleResolutionHost;
use crate::package_json::PackageJsonInfo;

/// Tri-state answer to "does this directory contain a package.json?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryPresence {
    Present,
    Absent,
    /// Not probed yet.
    Unknown,
}

/// Keys are canonical paths (`to_path`), so on a case-insensitive host a
/// change reported under different casing reaches the same entry.
#[derive(Debug)]
pub struct PackageJsonCache {
    /// Canonical package.json path -> parsed descriptor.
    package_jsons: FxHashMap<String, Rc<PackageJsonInfo>>,
    /// Canonical directories confirmed to have no (usable) package.json.
    directories_without_package_json: FxHashSet<String>,
    use_case_sensitive_file_names: bool,
}

impl Default for PackageJsonCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageJsonCache {
    pub fn new() -> Self {
        Self::with_case_sensitivity(true)
    }

    pub fn with_case_sensitivity(use_case_sensitive_file_names: bool) -> Self {
        Self {
            package_jsons: FxHashMap::default(),
            directories_without_package_json: FxHashSet::default(),
            use_case_sensitive_file_names,
        }
    }

    fn key(&self, path: &str) -> String {
        to_path(path, "/", self.use_case_sensitive_file_names)
    }

    fn manifest_key(&self, directory: &str) -> String {
        self.key(&combine_paths(directory, PACKAGE_JSON))
    }

    /// Read `file_name` and store it, replacing any previous descriptor.
    /// An unreadable or unparsable file negatively caches its directory.
    pub fn add_or_update(&mut self, file_name: &str, host: &dyn ModuleResolutionHost) {
        let key = self.key(file_name);
        let directory = get_directory_path(&key).to_string();
        match PackageJsonInfo::read(host, file_name) {
            Some(info) => {
                self.package_jsons.insert(key, Rc::new(info));
                self.directories_without_package_json.remove(&directory);
            }
            None => {
                trace!(file_name, "package.json unreadable, caching as absent");
                self.package_jsons.remove(&key);
                self.directories_without_package_json.insert(directory);
            }
        }
    }

    /// Forget `file_name` and remember that its directory has no package.json.
    pub fn delete(&mut self, file_name: &str) {
        let key = self.key(file_name);
        self.package_jsons.remove(&key);
        self.directories_without_package_json
            .insert(get_directory_path(&key).to_string());
    }

    /// Return `directory` to the unprobed state after its contents changed.
    pub fn invalidate_directory(&mut self, directory: &str) {
        let key = self.key(directory);
        self.directories_without_package_json.remove(&key);
        let manifest = self.manifest_key(directory);
        self.package_jsons.remove(&manifest);
    }

    pub fn get(&self, file_name: &str) -> Option<&Rc<PackageJsonInfo>> {
        self.package_jsons.get(&self.key(file_name))
    }

    pub fn get_in_directory(&self, directory: &str) -> Option<&Rc<PackageJsonInfo>> {
        self.package_jsons.get(&self.manifest_key(directory))
    }

    pub fn directory_has_package_json(&self, directory: &str) -> DirectoryPresence {
        if self.package_jsons.contains_key(&self.manifest_key(directory)) {
            DirectoryPresence::Present
        } else if self
            .directories_without_package_json
            .contains(&self.key(directory))
        {
            DirectoryPresence::Absent
        } else {
            DirectoryPresence::Unknown
        }
    }

    /// Probe `directory` and its ancestors, stopping at the first one whose
    /// state is already known.
    pub fn search_directory_and_ancestors(
        &mut self,
        directory: &str,
        host: &dyn ModuleResolutionHost,
    ) {
        for ancestor in Ancestors::new(directory) {
            if self.directory_has_package_json(ancestor) != DirectoryPresence::Unknown {
                break;
            }
            let package_json = combine_paths(ancestor, PACKAGE_JSON);
            if host.file_exists(&package_json) {
                self.add_or_update(&package_json, host);
            } else {
                let key = self.key(ancestor);
                self.directories_without_package_json.insert(key);
            }
        }
    }

    /// Descriptors found walking up from the directory of `file_name`, nearest
    /// first. The walk stops after `root_dir` when one is given.
    pub fn get_package_jsons_visible_to_file(
        &mut self,
        file_name: &str,
        root_dir: Option<&str>,
        host: &dyn ModuleResolutionHost,
    ) -> Vec<Rc<PackageJsonInfo>> {
        let mut result = Vec::new();
        for directory in Ancestors::new(get_directory_path(file_name)) {
            let mut presence = self.directory_has_package_json(directory);
            if presence == DirectoryPresence::Unknown {
                self.search_directory_and_ancestors(directory, host);
                presence = self.directory_has_package_json(directory);
            }
            if presence == DirectoryPresence::Present
                && let Some(info) = self.get_in_directory(directory)
            {
                result.push(Rc::clone(info));
            }
            if root_dir.is_some_and(|root_dir| self.key(root_dir) == self.key(directory)) {
                break;
            }
        }
        result
    }

    pub fn for_each(&self, mut action: impl FnMut(&PackageJsonInfo, &str)) {
        for (file_name, info) in &self.package_jsons {
            action(info, file_name);
        }
    }

    pub fn len(&self) -> usize {
        self.package_jsons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.package_jsons.is_empty()
    }
}

#[cfg(test)]
#[path = "../tests/package_json_cache_tests.rs"]
mod package_json_cache_tests;
