//! Session-level coordination of host projects and their providers.
//!
//! The service owns everything shared between projects: the file system, the
//! compiler frontend, the host configuration, the session mode, and the
//! package.json cache. Change notifications enter here and are routed to the
//! projects they affect.

use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, info};
use tsz_common::path::get_normalized_absolute_path;

use crate::config::{
    CompilerOptions, HostConfiguration, LanguageServiceMode, PackageJsonAutoImportPreference,
};
use crate::export_info_map::ExportInfoMap;
use crate::host::{CompilerFrontend, ModuleResolutionHost, ProgramRef};
use crate::module_specifier_cache::ModuleSpecifierCache;
use crate::package_json::PackageJsonInfo;
use crate::package_json_cache::PackageJsonCache;
use crate::project::{HostProject, SessionContext, SessionServices};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(u32);

impl ProjectId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Kind of a watched-file event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
    Created,
    Changed,
    Deleted,
}

pub struct ProjectService {
    resolution_host: Rc<dyn ModuleResolutionHost>,
    frontend: Box<dyn CompilerFrontend>,
    host_configuration: HostConfiguration,
    server_mode: LanguageServiceMode,
    package_json_cache: PackageJsonCache,
    projects: IndexMap<ProjectId, HostProject>,
    next_project_id: u32,
}

impl ProjectService {
    pub fn new(
        resolution_host: Rc<dyn ModuleResolutionHost>,
        frontend: Box<dyn CompilerFrontend>,
    ) -> Self {
        let use_case_sensitive_file_names = resolution_host.use_case_sensitive_file_names();
        Self {
            resolution_host,
            frontend,
            host_configuration: HostConfiguration::default(),
            server_mode: LanguageServiceMode::Semantic,
            package_json_cache: PackageJsonCache::with_case_sensitivity(
                use_case_sensitive_file_names,
            ),
            projects: IndexMap::new(),
            next_project_id: 0,
        }
    }

    pub fn with_host_configuration(mut self, configuration: HostConfiguration) -> Self {
        self.host_configuration = configuration;
        self
    }

    pub fn with_server_mode(mut self, mode: LanguageServiceMode) -> Self {
        self.server_mode = mode;
        self
    }

    /// Session-level `includePackageJsonAutoImports`.
    pub fn include_package_json_auto_imports(&self) -> PackageJsonAutoImportPreference {
        PackageJsonAutoImportPreference::from_preference(
            self.host_configuration
                .preferences
                .include_package_json_auto_imports
                .as_deref(),
        )
    }

    pub fn host_configuration(&self) -> &HostConfiguration {
        &self.host_configuration
    }

    /// Apply new configuration. Every project's module specifier cache is
    /// dropped when specifier preferences change; providers learn about an
    /// inclusion-preference or typings-cache change through the settings hook.
    pub fn set_host_configuration(&mut self, configuration: HostConfiguration) {
        let old = std::mem::replace(&mut self.host_configuration, configuration);
        let new = &self.host_configuration;
        let specifier_preferences_changed = old.preferences.import_module_specifier_ending
            != new.preferences.import_module_specifier_ending
            || old.preferences.import_module_specifier_preference
                != new.preferences.import_module_specifier_preference;
        let provider_settings_changed = old.preferences.include_package_json_auto_imports
            != new.preferences.include_package_json_auto_imports
            || old.global_typings_cache_location != new.global_typings_cache_location;

        info!(
            include_package_json_auto_imports = ?self.include_package_json_auto_imports(),
            specifier_preferences_changed,
            provider_settings_changed,
            "host configuration updated"
        );
        for project in self.projects.values_mut() {
            if specifier_preferences_changed {
                project.module_specifier_cache_mut().clear();
            }
            if provider_settings_changed {
                project.on_auto_import_provider_settings_changed();
            }
        }
    }

    pub fn server_mode(&self) -> LanguageServiceMode {
        self.server_mode
    }

    pub fn set_server_mode(&mut self, mode: LanguageServiceMode) {
        if self.server_mode == mode {
            return;
        }
        self.server_mode = mode;
        for project in self.projects.values_mut() {
            project.on_server_mode_changed(mode);
        }
    }

    pub fn resolution_host(&self) -> &dyn ModuleResolutionHost {
        &*self.resolution_host
    }

    pub fn open_project(
        &mut self,
        name: &str,
        current_directory: &str,
        root_files: &[String],
        compiler_options: CompilerOptions,
    ) -> ProjectId {
        let id = ProjectId(self.next_project_id);
        self.next_project_id += 1;
        let project = HostProject::new(
            name,
            current_directory,
            root_files,
            compiler_options,
            self.resolution_host.use_case_sensitive_file_names(),
        );
        debug!(project = name, id = id.0, "opened host project");
        self.projects.insert(id, project);
        id
    }

    pub fn close_project(&mut self, id: ProjectId) -> bool {
        match self.projects.shift_remove(&id) {
            Some(mut project) => {
                project.close();
                true
            }
            None => false,
        }
    }

    pub fn project(&self, id: ProjectId) -> Option<&HostProject> {
        self.projects.get(&id)
    }

    pub fn project_mut(&mut self, id: ProjectId) -> Option<&mut HostProject> {
        self.projects.get_mut(&id)
    }

    pub fn project_ids(&self) -> impl Iterator<Item = ProjectId> + '_ {
        self.projects.keys().copied()
    }

    /// Split the service into the shared context and the project table.
    fn split(&mut self) -> (SessionContext<'_>, &mut IndexMap<ProjectId, HostProject>) {
        let preference = self.include_package_json_auto_imports();
        let Self {
            resolution_host,
            frontend,
            host_configuration,
            server_mode,
            package_json_cache,
            projects,
            ..
        } = self;
        let ctx = SessionContext {
            frontend: &mut **frontend,
            services: SessionServices {
                resolution_host: &**resolution_host,
                package_json_cache,
                preference,
                server_mode: *server_mode,
                global_typings_cache_location: host_configuration
                    .global_typings_cache_location
                    .as_deref(),
            },
        };
        (ctx, projects)
    }

    /// Rebuild a host project's program if it is dirty.
    pub fn update_graph(&mut self, id: ProjectId) -> bool {
        let (mut ctx, projects) = self.split();
        projects
            .get_mut(&id)
            .is_some_and(|project| project.update_graph(&mut *ctx.frontend))
    }

    /// The provider program for a host project, bringing the host graph up
    /// to date first.
    pub fn get_package_json_auto_import_provider(&mut self, id: ProjectId) -> Option<ProgramRef> {
        let (mut ctx, projects) = self.split();
        let project = projects.get_mut(&id)?;
        project.update_graph(&mut *ctx.frontend);
        project.get_package_json_auto_import_provider(&mut ctx)
    }

    pub fn get_cached_export_info_map(&mut self, id: ProjectId) -> Option<&ExportInfoMap> {
        let (mut ctx, projects) = self.split();
        let project = projects.get_mut(&id)?;
        project.update_graph(&mut *ctx.frontend);
        Some(project.get_cached_export_info_map(&mut ctx))
    }

    pub fn get_module_specifier_cache(&mut self, id: ProjectId) -> Option<&mut ModuleSpecifierCache> {
        self.projects
            .get_mut(&id)
            .map(HostProject::module_specifier_cache_mut)
    }

    pub fn get_package_jsons_for_auto_import(&mut self, id: ProjectId) -> Vec<Rc<PackageJsonInfo>> {
        let (mut ctx, projects) = self.split();
        projects
            .get_mut(&id)
            .map(|project| project.get_package_jsons_for_auto_import(&mut ctx))
            .unwrap_or_default()
    }

    /// Package.json files visible from `file_name`, nearest first, stopping
    /// after `root_dir` when given.
    pub fn get_package_jsons_visible_to_file(
        &mut self,
        file_name: &str,
        root_dir: Option<&str>,
    ) -> Vec<Rc<PackageJsonInfo>> {
        let file_name = get_normalized_absolute_path(file_name, "/");
        self.package_json_cache.get_package_jsons_visible_to_file(
            &file_name,
            root_dir,
            &*self.resolution_host,
        )
    }

    pub fn package_json_cache(&self) -> &PackageJsonCache {
        &self.package_json_cache
    }

    /// A project package.json was created, changed, or deleted. Returns the
    /// number of projects that reacted.
    pub fn on_package_json_changed(&mut self, file_name: &str, kind: FileChangeKind) -> usize {
        let file_name = get_normalized_absolute_path(file_name, "/");
        match kind {
            FileChangeKind::Deleted => self.package_json_cache.delete(&file_name),
            FileChangeKind::Created | FileChangeKind::Changed => self
                .package_json_cache
                .add_or_update(&file_name, &*self.resolution_host),
        }
        let affected = self
            .projects
            .values_mut()
            .map(|project| project.on_package_json_change(&file_name))
            .filter(|acted| *acted)
            .count();
        debug!(file_name = %file_name, ?kind, affected, "package.json change routed");
        affected
    }

    /// A file that can change module resolution (a manifest or a file inside
    /// an installed package) changed. Returns the number of providers dirtied.
    pub fn on_dependency_graph_affecting_file_changed(&mut self, file_name: &str) -> usize {
        let file_name = get_normalized_absolute_path(file_name, "/");
        let affected = self
            .projects
            .values_mut()
            .map(|project| project.on_dependency_graph_affecting_file_changed(&file_name))
            .filter(|acted| *acted)
            .count();
        debug!(file_name = %file_name, affected, "dependency graph change routed");
        affected
    }
}

#[cfg(test)]
#[path = "../tests/project_service_tests.rs"]
mod project_service_tests;
