//! Host projects: the user-facing compilations that own an auto-import provider.
//!
//! A [`HostProject`] carries two halves:
//! - its compilation state (roots, options, program, per-project caches)
//! - the [`AutoImportProviderSlot`] pointing at its provider
//!
//! Discovery and the provider only see the compilation half, through the
//! [`AutoImportHost`] view built by [`HostProject`] for the duration of one
//! call. Session-wide collaborators (file system, compiler frontend, the
//! package.json cache) arrive through a [`SessionContext`].

use std::rc::Rc;

use rustc_hash::FxHashSet;
use tracing::{debug, trace};
use tsz_common::limits::INFERRED_TYPES_CONTAINING_FILE;
use tsz_common::path::{
    combine_paths, contains_path, get_directory_path, get_normalized_absolute_path,
    is_inside_node_modules, to_path,
};
use web_time::Instant;

use crate::config::{CompilerOptions, LanguageServiceMode, PackageJsonAutoImportPreference};
use crate::discovery::AutoImportHost;
use crate::export_info_map::ExportInfoMap;
use crate::host::{CompilerFrontend, ModuleResolutionHost, ProgramRef, ProgramRequest, same_program};
use crate::invalidation;
use crate::module_specifier_cache::ModuleSpecifierCache;
use crate::package_json::PackageJsonInfo;
use crate::package_json_cache::PackageJsonCache;
use crate::provider::{AutoImportProviderProject, AutoImportProviderSlot};
use crate::resolution::PackageJsonInfoCache;
use crate::symlink_cache::SymlinkCache;

/// Read-only surface shared by host projects and provider projects.
pub trait ProjectCompilation {
    fn current_directory(&self) -> &str;
    fn compilation_settings(&self) -> &CompilerOptions;
    fn current_program(&self) -> Option<&ProgramRef>;
    fn script_file_names(&self) -> &[String];
    fn project_version(&self) -> u64;
    fn is_empty(&self) -> bool;
    /// Orphan projects are not tied to any open file.
    fn is_orphan(&self) -> bool;
}

/// Session-wide collaborators lent to a project for one operation.
pub struct SessionContext<'a> {
    pub frontend: &'a mut dyn CompilerFrontend,
    pub services: SessionServices<'a>,
}

/// The part of a [`SessionContext`] discovery reads through a host view.
pub struct SessionServices<'a> {
    pub resolution_host: &'a dyn ModuleResolutionHost,
    pub package_json_cache: &'a mut PackageJsonCache,
    /// Session-level `includePackageJsonAutoImports`.
    pub preference: PackageJsonAutoImportPreference,
    pub server_mode: LanguageServiceMode,
    pub global_typings_cache_location: Option<&'a str>,
}

#[derive(Debug)]
struct HostProjectState {
    project_name: String,
    current_directory: String,
    use_case_sensitive_file_names: bool,
    root_files: Vec<String>,
    compiler_options: CompilerOptions,
    program: Option<ProgramRef>,
    dirty: bool,
    project_version: u64,
    language_service_enabled: bool,
    symlinks: SymlinkCache,
    package_json_info_cache: PackageJsonInfoCache,
    export_info_map: ExportInfoMap,
    module_specifier_cache: ModuleSpecifierCache,
    /// Canonical paths of the package.json files the last discovery consulted.
    package_jsons_for_auto_import: FxHashSet<String>,
}

impl HostProjectState {
    fn to_path(&self, file_name: &str) -> String {
        to_path(
            file_name,
            &self.current_directory,
            self.use_case_sensitive_file_names,
        )
    }

    fn effective_preference(
        &self,
        session_preference: PackageJsonAutoImportPreference,
    ) -> PackageJsonAutoImportPreference {
        if session_preference.is_off()
            || !self.language_service_enabled
            || is_inside_node_modules(&self.current_directory)
        {
            PackageJsonAutoImportPreference::Off
        } else {
            session_preference
        }
    }

    /// The symlink cache, seeded from the current program's resolutions.
    fn symlinks(&mut self) -> &mut SymlinkCache {
        if !self.symlinks.has_processed_resolutions()
            && let Some(program) = self.program.as_ref()
        {
            let resolutions = program.resolved_modules();
            self.symlinks.set_symlinks_from_resolutions(&resolutions);
        }
        &mut self.symlinks
    }

    /// Drop everything derived from the dependency graph.
    fn clear_dependency_caches(&mut self) {
        self.package_json_info_cache.clear();
        self.module_specifier_cache.clear();
    }
}

/// [`AutoImportHost`] over one host project's compilation half.
struct HostView<'v, 's> {
    state: &'v mut HostProjectState,
    services: &'v mut SessionServices<'s>,
}

impl AutoImportHost for HostView<'_, '_> {
    fn current_directory(&self) -> &str {
        &self.state.current_directory
    }

    fn use_case_sensitive_file_names(&self) -> bool {
        self.state.use_case_sensitive_file_names
    }

    fn compiler_options(&self) -> &CompilerOptions {
        &self.state.compiler_options
    }

    fn current_program(&self) -> Option<ProgramRef> {
        self.state.program.clone()
    }

    fn include_package_json_auto_imports(&self) -> PackageJsonAutoImportPreference {
        self.state.effective_preference(self.services.preference)
    }

    fn get_package_jsons_for_auto_import(&mut self) -> Vec<Rc<PackageJsonInfo>> {
        let anchor = combine_paths(&self.state.current_directory, INFERRED_TYPES_CONTAINING_FILE);
        let resolution_host = self.services.resolution_host;
        let package_jsons = self
            .services
            .package_json_cache
            .get_package_jsons_visible_to_file(&anchor, None, resolution_host);
        let paths = package_jsons
            .iter()
            .map(|package_json| self.state.to_path(&package_json.file_name))
            .collect();
        self.state.package_jsons_for_auto_import = paths;
        package_jsons
    }

    fn global_typings_cache_location(&self) -> Option<&str> {
        self.services.global_typings_cache_location
    }

    fn symlink_cache(&mut self) -> &mut SymlinkCache {
        self.state.symlinks()
    }

    fn package_json_info_cache(&mut self) -> &mut PackageJsonInfoCache {
        &mut self.state.package_json_info_cache
    }

    fn clear_cached_export_info_map(&mut self) {
        self.state.export_info_map.clear();
    }
}

#[derive(Debug)]
pub struct HostProject {
    state: HostProjectState,
    auto_import_provider: AutoImportProviderSlot,
}

impl HostProject {
    pub fn new(
        project_name: &str,
        current_directory: &str,
        root_files: &[String],
        compiler_options: CompilerOptions,
        use_case_sensitive_file_names: bool,
    ) -> Self {
        let current_directory = get_normalized_absolute_path(current_directory, "/");
        let root_files = root_files
            .iter()
            .map(|file| get_normalized_absolute_path(file, &current_directory))
            .collect();
        Self {
            state: HostProjectState {
                project_name: project_name.to_string(),
                symlinks: SymlinkCache::new(&current_directory, use_case_sensitive_file_names),
                current_directory,
                use_case_sensitive_file_names,
                root_files,
                compiler_options,
                program: None,
                dirty: true,
                project_version: 0,
                language_service_enabled: true,
                package_json_info_cache: PackageJsonInfoCache::new(),
                export_info_map: ExportInfoMap::new(),
                module_specifier_cache: ModuleSpecifierCache::new(),
                package_jsons_for_auto_import: FxHashSet::default(),
            },
            auto_import_provider: AutoImportProviderSlot::Unset,
        }
    }

    pub fn project_name(&self) -> &str {
        &self.state.project_name
    }

    pub fn set_root_files(&mut self, root_files: &[String]) {
        self.state.root_files = root_files
            .iter()
            .map(|file| get_normalized_absolute_path(file, &self.state.current_directory))
            .collect();
        self.mark_as_dirty();
    }

    /// Replace the compiler options. The provider derives its own options from
    /// these, so it is discarded and rebuilt on the next query.
    pub fn set_compiler_options(&mut self, compiler_options: CompilerOptions) {
        self.state.compiler_options = compiler_options;
        self.state.clear_dependency_caches();
        self.auto_import_provider.dispose();
        self.mark_as_dirty();
    }

    pub fn language_service_enabled(&self) -> bool {
        self.state.language_service_enabled
    }

    pub fn set_language_service_enabled(&mut self, enabled: bool) {
        if self.state.language_service_enabled == enabled {
            return;
        }
        self.state.language_service_enabled = enabled;
        if enabled {
            self.on_auto_import_provider_settings_changed();
        } else {
            self.auto_import_provider.dispose();
        }
    }

    pub fn mark_as_dirty(&mut self) {
        self.state.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.state.dirty
    }

    /// Rebuild the host program if dirty. Returns whether its identity changed.
    ///
    /// A new program invalidates the export info map, the module specifier
    /// cache and the package.json resolution cache, re-arms symlink seeding,
    /// and marks the provider dirty.
    pub fn update_graph(&mut self, frontend: &mut dyn CompilerFrontend) -> bool {
        if !self.state.dirty {
            return false;
        }
        let start = Instant::now();
        let state = &mut self.state;
        let old_program = state.program.take();
        let program = frontend.create_program(ProgramRequest {
            root_files: &state.root_files,
            options: &state.compiler_options,
            old_program: old_program.as_ref(),
        });
        state.program = Some(program);
        state.dirty = false;

        let changed = !same_program(old_program.as_ref(), state.program.as_ref());
        if changed {
            state.project_version += 1;
            state.export_info_map.clear();
            state.clear_dependency_caches();
            state.symlinks.set_resolutions_unprocessed();
            if let Some(provider) = self.auto_import_provider.as_active_mut() {
                provider.mark_as_dirty();
            }
        }
        debug!(
            project = %self.state.project_name,
            roots = self.state.root_files.len(),
            changed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "host project graph updated"
        );
        changed
    }

    /// Effective `includePackageJsonAutoImports` for this project.
    pub fn include_package_json_auto_imports(
        &self,
        session_preference: PackageJsonAutoImportPreference,
    ) -> PackageJsonAutoImportPreference {
        self.state.effective_preference(session_preference)
    }

    /// Package.json files visible from the project root, nearest first.
    /// Remembers them so later changes to exactly these files are routed here.
    pub fn get_package_jsons_for_auto_import(
        &mut self,
        ctx: &mut SessionContext<'_>,
    ) -> Vec<Rc<PackageJsonInfo>> {
        HostView {
            state: &mut self.state,
            services: &mut ctx.services,
        }
        .get_package_jsons_for_auto_import()
    }

    /// The symlink cache, seeded from the current program's resolutions.
    pub fn get_symlink_cache(&mut self) -> &SymlinkCache {
        self.state.symlinks()
    }

    pub fn auto_import_provider(&self) -> &AutoImportProviderSlot {
        &self.auto_import_provider
    }

    /// Query the provider's program, creating or refreshing the provider as
    /// needed.
    ///
    /// - a disabled slot answers `None` without any work
    /// - a session that cannot build programs disables the slot, disposing
    ///   any active provider
    /// - an active provider is refreshed if dirty, and disposed if the refresh
    ///   leaves it without roots
    /// - an unset slot runs discovery; an empty result leaves it unset
    pub fn get_package_json_auto_import_provider(
        &mut self,
        ctx: &mut SessionContext<'_>,
    ) -> Option<ProgramRef> {
        let SessionContext { frontend, services } = ctx;
        let resolution_host = services.resolution_host;

        if self.auto_import_provider.is_disabled() {
            return None;
        }
        if services.server_mode != LanguageServiceMode::Semantic {
            self.auto_import_provider.dispose();
            self.auto_import_provider = AutoImportProviderSlot::Disabled;
            return None;
        }

        match &mut self.auto_import_provider {
            AutoImportProviderSlot::Disabled => return None,
            AutoImportProviderSlot::Active(provider) => {
                if provider.is_dirty() {
                    let mut view = HostView {
                        state: &mut self.state,
                        services: &mut *services,
                    };
                    provider.update_graph(&mut view, resolution_host, &mut **frontend);
                    if !provider.has_roots() {
                        trace!(
                            project = %self.state.project_name,
                            "AutoImportProviderProject: no roots after refresh, disposing"
                        );
                        self.auto_import_provider.dispose();
                        return None;
                    }
                }
                return provider.current_program().cloned();
            }
            AutoImportProviderSlot::Unset => {}
        }

        let selection = self.state.effective_preference(services.preference);
        if selection.is_off() {
            return None;
        }
        let mut view = HostView {
            state: &mut self.state,
            services: &mut *services,
        };
        let mut provider = AutoImportProviderProject::create(selection, &mut view, resolution_host)?;
        provider.update_graph(&mut view, resolution_host, &mut **frontend);
        let program = provider.current_program().cloned();
        self.auto_import_provider = AutoImportProviderSlot::Active(Box::new(provider));
        program
    }

    /// Preferences or session capabilities changed. A disabled slot becomes
    /// retry-eligible and an active provider is marked dirty.
    pub fn on_auto_import_provider_settings_changed(&mut self) {
        match &mut self.auto_import_provider {
            AutoImportProviderSlot::Disabled => {
                self.auto_import_provider = AutoImportProviderSlot::Unset;
            }
            AutoImportProviderSlot::Active(provider) => provider.mark_as_dirty(),
            AutoImportProviderSlot::Unset => {}
        }
    }

    /// The session's mode changed; sessions that cannot build programs keep no
    /// provider.
    pub fn on_server_mode_changed(&mut self, mode: LanguageServiceMode) {
        if mode == LanguageServiceMode::Semantic {
            self.on_auto_import_provider_settings_changed();
        } else {
            self.auto_import_provider.dispose();
        }
    }

    /// A package.json changed on disk. Acts only when the file was consulted
    /// by discovery or is visible from the project root.
    pub fn on_package_json_change(&mut self, file_name: &str) -> bool {
        let path = self.state.to_path(file_name);
        let consulted = self.state.package_jsons_for_auto_import.contains(&path);
        let visible = contains_path(
            get_directory_path(&path),
            &self.state.to_path(&self.state.current_directory),
        );
        if !consulted && !visible {
            return false;
        }
        trace!(
            project = %self.state.project_name,
            file_name,
            "package.json change affects auto-imports"
        );
        self.state.clear_dependency_caches();
        self.state.export_info_map.clear();
        if let Some(provider) = self.auto_import_provider.as_active_mut() {
            provider.mark_as_dirty();
        }
        true
    }

    /// A file that may change module resolution changed. Marks the provider
    /// dirty when the file belongs to one of its packages, under either its
    /// real or its symlinked spelling.
    pub fn on_dependency_graph_affecting_file_changed(&mut self, file_name: &str) -> bool {
        let path = self.state.to_path(file_name);
        let current_directory = self.state.to_path(&self.state.current_directory);
        let manifest_in_scope = invalidation::is_package_manifest_in_scope(&path, &current_directory);
        if manifest_in_scope {
            self.state.package_json_info_cache.clear();
        }

        let Some(provider) = self.auto_import_provider.as_active_mut() else {
            return false;
        };
        if !manifest_in_scope && !invalidation::affects_provider(&path, provider, &self.state.symlinks) {
            return false;
        }
        provider.mark_as_dirty();
        self.state.clear_dependency_caches();
        true
    }

    /// Export info for the host program plus the provider, rebuilt only when
    /// either program changed since the last build.
    pub fn get_cached_export_info_map(&mut self, ctx: &mut SessionContext<'_>) -> &ExportInfoMap {
        let provider_program = self.get_package_json_auto_import_provider(ctx);
        let host_program = self.state.program.clone();
        let export_info_map = &mut self.state.export_info_map;
        if !export_info_map.is_usable_by(host_program.as_ref(), provider_program.as_ref()) {
            export_info_map.rebuild(host_program.as_ref(), provider_program.as_ref());
        }
        &self.state.export_info_map
    }

    pub fn module_specifier_cache(&self) -> &ModuleSpecifierCache {
        &self.state.module_specifier_cache
    }

    pub fn module_specifier_cache_mut(&mut self) -> &mut ModuleSpecifierCache {
        &mut self.state.module_specifier_cache
    }

    pub fn close(&mut self) {
        self.auto_import_provider.dispose();
        self.state.program = None;
        self.state.export_info_map.clear();
        self.state.clear_dependency_caches();
        self.state.symlinks.clear();
        self.state.package_jsons_for_auto_import.clear();
    }
}

impl ProjectCompilation for HostProject {
    fn current_directory(&self) -> &str {
        &self.state.current_directory
    }

    fn compilation_settings(&self) -> &CompilerOptions {
        &self.state.compiler_options
    }

    fn current_program(&self) -> Option<&ProgramRef> {
        self.state.program.as_ref()
    }

    fn script_file_names(&self) -> &[String] {
        &self.state.root_files
    }

    fn project_version(&self) -> u64 {
        self.state.project_version
    }

    fn is_empty(&self) -> bool {
        self.state.root_files.is_empty()
    }

    fn is_orphan(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[path = "../tests/project_tests.rs"]
mod project_tests;
