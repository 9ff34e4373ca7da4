//! Routing of file-change notifications to auto-import providers.
//!
//! Providers record the real directories of the packages behind their roots.
//! A change is reported under whatever spelling the watcher saw, so matching
//! goes both ways through the host's symlink cache: the changed path is
//! translated to its real form, and every symlink known to point at a
//! provider package is checked as well.

use tsz_common::limits::{NODE_MODULES, PACKAGE_JSON};
use tsz_common::path::{contains_path, get_base_file_name, get_directory_path};

use crate::provider::AutoImportProviderProject;
use crate::symlink_cache::SymlinkCache;

/// Whether `changed_path` (canonical) lies inside a package the provider
/// compiles, under its real or any symlinked spelling.
pub fn affects_provider(
    changed_path: &str,
    provider: &AutoImportProviderProject,
    symlinks: &SymlinkCache,
) -> bool {
    if provider.depends_on(changed_path) {
        return true;
    }
    if let Some(real_path) = symlinks.resolve_real_path(changed_path)
        && provider.depends_on(&real_path)
    {
        return true;
    }
    provider.package_directories().iter().any(|real_directory| {
        symlinks
            .get_symlinked_directories_by_realpath(real_directory)
            .iter()
            .any(|symlink| contains_path(symlink, changed_path))
    })
}

/// The `node_modules` directory and package name of a manifest path such as
/// `/p/node_modules/@scope/pkg/package.json`.
pub fn package_manifest_location(path: &str) -> Option<(&str, &str)> {
    if get_base_file_name(path) != PACKAGE_JSON {
        return None;
    }
    let package_directory = get_directory_path(path);
    let parent = get_directory_path(package_directory);
    if get_base_file_name(parent) == NODE_MODULES {
        return Some((parent, get_base_file_name(package_directory)));
    }
    let scope = get_base_file_name(parent);
    let node_modules = get_directory_path(parent);
    if scope.starts_with('@') && get_base_file_name(node_modules) == NODE_MODULES {
        return Some((node_modules, &package_directory[node_modules.len() + 1..]));
    }
    None
}

/// Whether `path` is the manifest of a package installed in a `node_modules`
/// directory that resolution from `current_directory` would search.
pub fn is_package_manifest_in_scope(path: &str, current_directory: &str) -> bool {
    package_manifest_location(path).is_some_and(|(node_modules, _)| {
        contains_path(get_directory_path(node_modules), current_directory)
    })
}

#[cfg(test)]
#[path = "../tests/invalidation_tests.rs"]
mod invalidation_tests;
