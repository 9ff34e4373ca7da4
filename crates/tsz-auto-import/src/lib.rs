//! package.json auto-import provider for the tsz language service.
//!
//! A host project's completions should offer symbols from installed
//! dependencies the user has not imported anywhere yet. This crate builds a
//! small derived compilation (the *auto-import provider project*) over those
//! dependencies and keeps it, and the caches around it, current as files and
//! settings change.
//!
//! - **Discovery**: package.json files visible to the project root name the
//!   dependencies; each resolves to entry points, bounded by two cost caps
//! - **Caches**: package.json presence, package resolution, symlinks, module
//!   specifiers, and exported symbols
//! - **Invalidation**: change notifications are routed to the projects and
//!   providers they affect; recomputation is lazy, on the next query
pub mod config;
pub mod discovery;
pub mod export_info_map;
pub mod host;
pub mod invalidation;
pub mod memory_fs;
pub mod module_specifier_cache;
pub mod package_json;
pub mod package_json_cache;
pub mod project;
pub mod project_service;
pub mod provider;
pub mod resolution;
pub mod symlink_cache;
pub mod tracing_config;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use config::{
    CompilerOptions, HostConfiguration, LanguageServiceMode, PackageJsonAutoImportPreference,
    UserPreferences,
};
pub use discovery::{AutoImportHost, DependencyDiscoveryResult, get_root_file_names};
pub use export_info_map::{ExportInfo, ExportInfoMap};
pub use host::{
    CompiledUnit, CompilerFrontend, ExportKind, ExportedSymbol, ModuleResolutionHost, ProgramRef,
    ProgramRequest, RealFileSystem, ResolvedModuleInfo,
};
pub use memory_fs::MemoryFileSystem;
pub use module_specifier_cache::{
    ModulePath, ModuleSpecifierCache, ModuleSpecifierKind, ModuleSpecifierOptions,
    ResolvedModuleSpecifierInfo,
};
pub use package_json::{DependencyGroups, PackageJsonInfo};
pub use package_json_cache::{DirectoryPresence, PackageJsonCache};
pub use project::{HostProject, ProjectCompilation};
pub use project_service::{FileChangeKind, ProjectId, ProjectService};
pub use provider::{AutoImportProviderProject, AutoImportProviderSlot, GraphState};
pub use symlink_cache::{SymlinkCache, SymlinkedDirectory};
