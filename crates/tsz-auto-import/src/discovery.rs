//! Dependency discovery: which files the auto-import provider compiles.
//!
//! Starts from the package.json files visible to the host project, collects
//! the names listed under `dependencies` and `peerDependencies`, and resolves
//! each one to entry points:
//!
//! 1. the implementation package, if it ships types;
//! 2. otherwise its `@types` package, in the project and then in the global
//!    typings cache;
//! 3. otherwise, when `allowJs` and `maxNodeModuleJsDepth` allow it, the
//!    implementation package's script entry points.
//!
//! Two caps bound the result. A package with more than
//! [`MAX_PACKAGE_ENTRYPOINTS`] entry points contributes nothing. Under the
//! `auto` preference, adding more than [`MAX_AUTO_IMPORT_DEPENDENCIES`]
//! dependencies aborts the whole run with an empty result.

use std::rc::Rc;

use indexmap::IndexSet;
use tracing::{debug, trace};
use tsz_common::limits::{
    INFERRED_TYPES_CONTAINING_FILE, MAX_AUTO_IMPORT_DEPENDENCIES, MAX_PACKAGE_ENTRYPOINTS,
    TYPES_PACKAGE_PREFIX,
};
use tsz_common::path::{combine_paths, to_path};
use web_time::Instant;

use crate::config::{CompilerOptions, PackageJsonAutoImportPreference};
use crate::host::{ModuleResolutionHost, ProgramRef};
use crate::package_json::PackageJsonInfo;
use crate::resolution::{
    EntrypointExtensions, PackageJsonInfoCache, get_entrypoints_from_package_json_info,
    resolve_package_name_to_package_json,
};
use crate::symlink_cache::{SymlinkCache, SymlinkedDirectory};

/// Host-compilation capabilities dependency discovery and the provider need.
///
/// Only host projects implement this; the auto-import provider project itself
/// has no package.json view, no symlink cache and no resolution cache of its own.
pub trait AutoImportHost {
    fn current_directory(&self) -> &str;
    fn use_case_sensitive_file_names(&self) -> bool;
    fn compiler_options(&self) -> &CompilerOptions;
    fn current_program(&self) -> Option<ProgramRef>;
    /// The host's effective dependency-inclusion preference.
    fn include_package_json_auto_imports(&self) -> PackageJsonAutoImportPreference;
    /// Package.json files visible to the project root, nearest first.
    fn get_package_jsons_for_auto_import(&mut self) -> Vec<Rc<PackageJsonInfo>>;
    fn global_typings_cache_location(&self) -> Option<&str>;
    fn symlink_cache(&mut self) -> &mut SymlinkCache;
    fn package_json_info_cache(&mut self) -> &mut PackageJsonInfoCache;
    /// The provider's program changed; export info derived from it is stale.
    fn clear_cached_export_info_map(&mut self);
}

/// Outcome of one discovery run. Built fresh every time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyDiscoveryResult {
    /// Entry points in dependency-iteration order.
    pub root_file_names: Vec<String>,
    /// Dependencies that contributed at least one root file.
    pub dependencies_added: usize,
    /// Canonical real directories of the contributing packages.
    pub package_directories: Vec<String>,
    /// The `auto` dependency cap was exceeded.
    pub aborted: bool,
}

impl DependencyDiscoveryResult {
    fn aborted() -> Self {
        Self {
            aborted: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root_file_names.is_empty()
    }
}

/// Name of the DefinitelyTyped package for `package_name`
/// (`@scope/pkg` -> `@types/scope__pkg`).
pub fn types_package_name(package_name: &str) -> String {
    match package_name.strip_prefix('@') {
        Some(scoped) => format!("{TYPES_PACKAGE_PREFIX}{}", scoped.replacen('/', "__", 1)),
        None => format!("{TYPES_PACKAGE_PREFIX}{package_name}"),
    }
}

/// Names under `dependencies` and `peerDependencies`, deduplicated in
/// declaration order, without `@types` packages.
pub fn collect_dependency_names(package_jsons: &[Rc<PackageJsonInfo>]) -> IndexSet<String> {
    let mut names = IndexSet::default();
    for package_json in package_jsons {
        let groups = [&package_json.dependencies, &package_json.peer_dependencies];
        for name in groups.into_iter().flatten().flat_map(|map| map.keys()) {
            if !name.starts_with(TYPES_PACKAGE_PREFIX) {
                names.insert(name.clone());
            }
        }
    }
    names
}

struct DiscoveryRun<'a> {
    host: &'a mut dyn AutoImportHost,
    resolution_host: &'a dyn ModuleResolutionHost,
    options: &'a CompilerOptions,
    program: ProgramRef,
    current_directory: String,
    case_sensitive: bool,
    root_file_names: IndexSet<String>,
    root_paths: IndexSet<String>,
    package_directories: IndexSet<String>,
    dependencies_added: usize,
}

impl DiscoveryRun<'_> {
    fn to_path(&self, file_name: &str) -> String {
        to_path(file_name, &self.current_directory, self.case_sensitive)
    }

    fn resolve_package(&mut self, package_name: &str, directory: &str) -> Option<Rc<PackageJsonInfo>> {
        resolve_package_name_to_package_json(
            package_name,
            directory,
            self.resolution_host,
            self.host.package_json_info_cache(),
        )
    }

    /// Entry points of `package_json` that the host program does not already
    /// contain, in real-path form. `None` when the package resolves to nothing
    /// or exceeds the entry point cap.
    fn root_names_from_package_json(
        &mut self,
        package_json: &PackageJsonInfo,
        extensions: EntrypointExtensions,
    ) -> Option<(Vec<String>, String)> {
        let entrypoints = get_entrypoints_from_package_json_info(
            package_json,
            self.options,
            self.resolution_host,
            extensions,
        )?;
        if entrypoints.len() > MAX_PACKAGE_ENTRYPOINTS {
            debug!(
                package = package_json.name.as_deref().unwrap_or("<unnamed>"),
                entrypoints = entrypoints.len(),
                "AutoImportProviderProject: skipping package with oversized export map"
            );
            return None;
        }

        let package_directory = package_json.package_directory.as_str();
        let real = self
            .resolution_host
            .realpath(package_directory)
            .filter(|real| self.to_path(real) != self.to_path(package_directory));
        if let Some(real) = real.as_deref() {
            let real_path = self.to_path(real);
            self.host.symlink_cache().set_symlinked_directory(
                package_directory,
                SymlinkedDirectory {
                    real: real.to_string(),
                    real_path,
                },
            );
        }

        let roots = entrypoints
            .into_iter()
            .filter_map(|entrypoint| {
                let resolved = match real.as_deref() {
                    Some(real) => entrypoint.replacen(package_directory, real, 1),
                    None => entrypoint.clone(),
                };
                let already_compiled = self.program.has_source_file(&resolved)
                    || (real.is_some() && self.program.has_source_file(&entrypoint));
                (!already_compiled).then_some(resolved)
            })
            .collect();
        let directory_path = self.to_path(real.as_deref().unwrap_or(package_directory));
        Some((roots, directory_path))
    }

    /// Record surviving roots; returns whether the dependency counted as added.
    fn add_roots(&mut self, roots: Vec<String>, package_directory: String) -> bool {
        let mut added_any = false;
        for root in roots {
            let path = self.to_path(&root);
            if self.root_paths.insert(path) {
                self.root_file_names.insert(root);
                added_any = true;
            }
        }
        if added_any {
            self.dependencies_added += 1;
            self.package_directories.insert(package_directory);
        }
        added_any
    }

    fn add_package(&mut self, package_json: &PackageJsonInfo, extensions: EntrypointExtensions) -> bool {
        match self.root_names_from_package_json(package_json, extensions) {
            Some((roots, directory)) => {
                self.add_roots(roots, directory);
                true
            }
            None => false,
        }
    }

    /// Resolve one dependency through the three strategies.
    fn add_dependency(&mut self, name: &str) {
        let current_directory = self.current_directory.clone();

        let package_json = self.resolve_package(name, &current_directory);
        if let Some(package_json) = package_json.as_deref()
            && self.add_package(package_json, EntrypointExtensions::TypeScript)
        {
            return;
        }

        let types_name = types_package_name(name);
        let search_directories = [
            Some(current_directory.clone()),
            self.host.global_typings_cache_location().map(str::to_string),
        ];
        for directory in search_directories.into_iter().flatten() {
            if let Some(types_package_json) = self.resolve_package(&types_name, &directory) {
                self.add_package(&types_package_json, EntrypointExtensions::TypeScript);
                return;
            }
        }

        if let Some(package_json) = package_json.as_deref()
            && self.options.allows_dependency_js()
        {
            self.add_package(package_json, EntrypointExtensions::JavaScript);
        }
    }
}

/// Compute the auto-import provider's root files for `host`.
pub fn get_root_file_names(
    selection: PackageJsonAutoImportPreference,
    host: &mut dyn AutoImportHost,
    resolution_host: &dyn ModuleResolutionHost,
    options: &CompilerOptions,
) -> DependencyDiscoveryResult {
    if selection.is_off() {
        return DependencyDiscoveryResult::default();
    }
    let Some(program) = host.current_program() else {
        return DependencyDiscoveryResult::default();
    };

    let start = Instant::now();
    let current_directory = host.current_directory().to_string();
    let package_jsons = host.get_package_jsons_for_auto_import();
    let dependency_names = collect_dependency_names(&package_jsons);
    trace!(
        anchor = %combine_paths(&current_directory, INFERRED_TYPES_CONTAINING_FILE),
        package_jsons = package_jsons.len(),
        dependencies = dependency_names.len(),
        "AutoImportProviderProject: collected dependency names"
    );

    let case_sensitive = host.use_case_sensitive_file_names();
    let mut run = DiscoveryRun {
        host,
        resolution_host,
        options,
        program,
        current_directory,
        case_sensitive,
        root_file_names: IndexSet::default(),
        root_paths: IndexSet::default(),
        package_directories: IndexSet::default(),
        dependencies_added: 0,
    };

    for name in &dependency_names {
        run.add_dependency(name);
        if selection == PackageJsonAutoImportPreference::Auto
            && run.dependencies_added > MAX_AUTO_IMPORT_DEPENDENCIES
        {
            debug!(
                max_dependencies = MAX_AUTO_IMPORT_DEPENDENCIES,
                "AutoImportProviderProject: attempted to add more than the maximum number of dependencies. Aborting."
            );
            return DependencyDiscoveryResult::aborted();
        }
    }

    let result = DependencyDiscoveryResult {
        root_file_names: run.root_file_names.into_iter().collect(),
        dependencies_added: run.dependencies_added,
        package_directories: run.package_directories.into_iter().collect(),
        aborted: false,
    };
    if !result.is_empty() {
        debug!(
            root_files = result.root_file_names.len(),
            dependencies = result.dependencies_added,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "AutoImportProviderProject: found root files"
        );
    }
    result
}

#[cfg(test)]
#[path = "../tests/discovery_tests.rs"]
mod discovery_tests;
