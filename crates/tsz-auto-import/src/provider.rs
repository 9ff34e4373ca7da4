//! The auto-import provider project.
//!
//! A hidden compilation owned by one host project whose roots are the entry
//! points of the host's declared dependencies that the host program does not
//! already include. It exists only so completions can offer symbols from
//! packages the user has not imported yet.
//!
//! State machine:
//!
//! ```text
//!            mark_as_dirty (roots dropped, version bumped)
//!   Clean ───────────────────────────────────────────────▶ Dirty
//!     ▲                                                      │
//!     └──────────── update_graph (roots recomputed) ─────────┘
//! ```
//!
//! The provider borrows everything host-only (package.json view, symlink and
//! resolution caches) from its host through [`AutoImportHost`]; it has no
//! operations of its own for package.json changes or provider settings.

use tracing::{debug, trace};
use tsz_common::path::{contains_path, to_path};
use web_time::Instant;

use crate::config::{CompilerOptions, PackageJsonAutoImportPreference};
use crate::discovery::{AutoImportHost, get_root_file_names};
use crate::host::{CompilerFrontend, ModuleResolutionHost, ProgramRef, ProgramRequest, same_program};
use crate::project::ProjectCompilation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    /// Roots and program reflect the last refresh.
    Clean,
    /// Roots must be recomputed before the program is used.
    Dirty,
}

#[derive(Debug)]
pub struct AutoImportProviderProject {
    current_directory: String,
    use_case_sensitive_file_names: bool,
    compiler_options: CompilerOptions,
    /// `None` while dirty: recomputed by the next [`Self::update_graph`].
    root_file_names: Option<Vec<String>>,
    /// Canonical real directories of the packages behind the current roots.
    package_directories: Vec<String>,
    program: Option<ProgramRef>,
    project_version: u64,
    state: GraphState,
}

impl AutoImportProviderProject {
    /// Run discovery for `host` and build a provider around the result.
    ///
    /// Returns `None` when the preference is off or discovery finds nothing.
    /// The returned provider holds fresh roots but no program yet; the caller
    /// finishes construction with [`Self::update_graph`].
    pub fn create(
        selection: PackageJsonAutoImportPreference,
        host: &mut dyn AutoImportHost,
        resolution_host: &dyn ModuleResolutionHost,
    ) -> Option<Self> {
        if selection.is_off() {
            return None;
        }
        let compiler_options = host.compiler_options().with_auto_import_provider_overrides();
        let discovery = get_root_file_names(selection, host, resolution_host, &compiler_options);
        if discovery.is_empty() {
            trace!(
                aborted = discovery.aborted,
                "AutoImportProviderProject: no root files, not creating"
            );
            return None;
        }
        Some(Self {
            current_directory: host.current_directory().to_string(),
            use_case_sensitive_file_names: host.use_case_sensitive_file_names(),
            compiler_options,
            root_file_names: Some(discovery.root_file_names),
            package_directories: discovery.package_directories,
            program: None,
            project_version: 0,
            state: GraphState::Dirty,
        })
    }

    /// Recompute roots if they were dropped, then rebuild the program.
    ///
    /// Returns whether the program identity changed. A changed program
    /// invalidates the host's export info map.
    pub fn update_graph(
        &mut self,
        host: &mut dyn AutoImportHost,
        resolution_host: &dyn ModuleResolutionHost,
        frontend: &mut dyn CompilerFrontend,
    ) -> bool {
        let start = Instant::now();
        if self.root_file_names.is_none() {
            let discovery = get_root_file_names(
                host.include_package_json_auto_imports(),
                host,
                resolution_host,
                &self.compiler_options,
            );
            self.package_directories = discovery.package_directories;
            self.root_file_names = Some(discovery.root_file_names);
        }

        let old_program = self.program.take();
        let root_files = self.root_file_names.as_deref().unwrap_or(&[]);
        self.program = (!root_files.is_empty()).then(|| {
            frontend.create_program(ProgramRequest {
                root_files,
                options: &self.compiler_options,
                old_program: old_program.as_ref(),
            })
        });
        self.state = GraphState::Clean;

        let changed = !same_program(old_program.as_ref(), self.program.as_ref());
        if changed && old_program.is_some() {
            host.clear_cached_export_info_map();
        }
        debug!(
            roots = root_files.len(),
            changed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "AutoImportProviderProject: graph updated"
        );
        changed
    }

    /// Refresh only when dirty. Returns whether a refresh ran.
    pub fn update_graph_if_dirty(
        &mut self,
        host: &mut dyn AutoImportHost,
        resolution_host: &dyn ModuleResolutionHost,
        frontend: &mut dyn CompilerFrontend,
    ) -> bool {
        if self.state == GraphState::Clean {
            return false;
        }
        self.update_graph(host, resolution_host, frontend);
        true
    }

    /// Drop the roots so the next refresh recomputes them. Idempotent.
    pub fn mark_as_dirty(&mut self) {
        if self.state == GraphState::Dirty && self.root_file_names.is_none() {
            return;
        }
        self.root_file_names = None;
        self.project_version += 1;
        self.state = GraphState::Dirty;
        trace!(
            version = self.project_version,
            "AutoImportProviderProject: marked dirty"
        );
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == GraphState::Dirty
    }

    /// Whether roots are known and non-empty.
    pub fn has_roots(&self) -> bool {
        self.root_file_names
            .as_ref()
            .is_some_and(|roots| !roots.is_empty())
    }

    pub fn package_directories(&self) -> &[String] {
        &self.package_directories
    }

    /// Whether a canonical path lies inside one of the provider's packages.
    pub fn depends_on(&self, real_path: &str) -> bool {
        self.package_directories
            .iter()
            .any(|directory| contains_path(directory, real_path))
    }

    /// The provider never contributes its own dependencies to auto-imports.
    pub fn include_package_json_auto_imports(&self) -> PackageJsonAutoImportPreference {
        PackageJsonAutoImportPreference::Off
    }

    pub fn type_acquisition_enabled(&self) -> bool {
        false
    }

    pub fn contains_file(&self, file_name: &str) -> bool {
        let path = to_path(
            file_name,
            &self.current_directory,
            self.use_case_sensitive_file_names,
        );
        self.root_file_names.iter().flatten().any(|root| {
            to_path(root, &self.current_directory, self.use_case_sensitive_file_names) == path
        }) || self
            .program
            .as_ref()
            .is_some_and(|program| program.has_source_file(file_name))
    }

    /// Release the program and roots.
    pub fn close(&mut self) {
        self.program = None;
        self.root_file_names = None;
        self.package_directories.clear();
    }
}

impl ProjectCompilation for AutoImportProviderProject {
    fn current_directory(&self) -> &str {
        &self.current_directory
    }

    fn compilation_settings(&self) -> &CompilerOptions {
        &self.compiler_options
    }

    fn current_program(&self) -> Option<&ProgramRef> {
        self.program.as_ref()
    }

    fn script_file_names(&self) -> &[String] {
        self.root_file_names.as_deref().unwrap_or(&[])
    }

    fn project_version(&self) -> u64 {
        self.project_version
    }

    fn is_empty(&self) -> bool {
        !self.has_roots()
    }

    fn is_orphan(&self) -> bool {
        true
    }
}

/// A host project's pointer to its provider.
#[derive(Debug, Default)]
pub enum AutoImportProviderSlot {
    /// Never queried, or retry-eligible.
    #[default]
    Unset,
    /// The session cannot build programs; do not try again.
    Disabled,
    Active(Box<AutoImportProviderProject>),
}

impl AutoImportProviderSlot {
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    pub fn as_active(&self) -> Option<&AutoImportProviderProject> {
        match self {
            Self::Active(provider) => Some(provider),
            _ => None,
        }
    }

    pub fn as_active_mut(&mut self) -> Option<&mut AutoImportProviderProject> {
        match self {
            Self::Active(provider) => Some(provider),
            _ => None,
        }
    }

    /// Close any active provider and return to `Unset`.
    pub fn dispose(&mut self) {
        if let Self::Active(provider) = self {
            provider.close();
        }
        *self = Self::Unset;
    }
}

#[cfg(test)]
#[path = "../tests/provider_tests.rs"]
mod provider_tests;
