//! Shared fixtures: a fake compiler frontend and file-tree builders.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tsz_common::path::get_base_file_name;

use crate::config::{CompilerOptions, PackageJsonAutoImportPreference};
use crate::discovery::AutoImportHost;
use crate::host::{
    CompiledUnit, CompilerFrontend, ExportedSymbol, ProgramRef, ProgramRequest, ResolvedModuleInfo,
};
use crate::memory_fs::MemoryFileSystem;
use crate::package_json::PackageJsonInfo;
use crate::resolution::PackageJsonInfoCache;
use crate::symlink_cache::SymlinkCache;

#[derive(Debug)]
pub struct FakeProgram {
    roots: Vec<String>,
    exports: FxHashMap<String, Vec<ExportedSymbol>>,
    resolutions: Vec<ResolvedModuleInfo>,
}

/// `"/p/node_modules/a/index.d.ts"` exports `index`; explicit exports win.
fn default_exports(file_name: &str) -> Vec<ExportedSymbol> {
    let base = get_base_file_name(file_name);
    let stem = base.split('.').next().unwrap_or(base);
    vec![ExportedSymbol::named(stem)]
}

impl CompiledUnit for FakeProgram {
    fn root_file_names(&self) -> &[String] {
        &self.roots
    }

    fn source_file_names(&self) -> Vec<String> {
        self.roots.clone()
    }

    fn has_source_file(&self, file_name: &str) -> bool {
        self.roots.iter().any(|root| root == file_name)
    }

    fn module_exports(&self, file_name: &str) -> Vec<ExportedSymbol> {
        if !self.has_source_file(file_name) {
            return Vec::new();
        }
        self.exports
            .get(file_name)
            .cloned()
            .unwrap_or_else(|| default_exports(file_name))
    }

    fn resolved_modules(&self) -> Vec<ResolvedModuleInfo> {
        self.resolutions.clone()
    }
}

pub fn program(roots: &[&str]) -> ProgramRef {
    Rc::new(FakeProgram {
        roots: roots.iter().map(|root| root.to_string()).collect(),
        exports: FxHashMap::default(),
        resolutions: Vec::new(),
    })
}

#[derive(Debug, Default)]
struct FrontendState {
    builds: usize,
    exports: FxHashMap<String, Vec<ExportedSymbol>>,
    resolutions: Vec<ResolvedModuleInfo>,
    requests: Vec<Vec<String>>,
}

/// Compiler frontend whose programs are exactly their roots. Hands back the
/// old program when the roots are unchanged. Clones share state, so a test
/// can keep a handle after moving one into a `ProjectService`.
#[derive(Debug, Clone, Default)]
pub struct FakeFrontend {
    state: Rc<RefCell<FrontendState>>,
}

impl FakeFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Programs actually constructed (reuses excluded).
    pub fn builds(&self) -> usize {
        self.state.borrow().builds
    }

    pub fn requests(&self) -> Vec<Vec<String>> {
        self.state.borrow().requests.clone()
    }

    pub fn set_exports(&self, file_name: &str, exports: Vec<ExportedSymbol>) {
        self.state
            .borrow_mut()
            .exports
            .insert(file_name.to_string(), exports);
    }

    pub fn add_resolution(&self, resolved_file_name: &str, original_path: &str) {
        self.state.borrow_mut().resolutions.push(ResolvedModuleInfo {
            resolved_file_name: resolved_file_name.to_string(),
            original_path: Some(original_path.to_string()),
        });
    }
}

impl CompilerFrontend for FakeFrontend {
    fn create_program(&mut self, request: ProgramRequest<'_>) -> ProgramRef {
        let mut state = self.state.borrow_mut();
        state.requests.push(request.root_files.to_vec());
        if let Some(old_program) = request.old_program
            && old_program.root_file_names() == request.root_files
        {
            return Rc::clone(old_program);
        }
        state.builds += 1;
        Rc::new(FakeProgram {
            roots: request.root_files.to_vec(),
            exports: state.exports.clone(),
            resolutions: state.resolutions.clone(),
        })
    }
}

/// Standalone [`AutoImportHost`] for exercising discovery directly.
#[derive(Debug)]
pub struct FakeHost {
    pub current_directory: String,
    pub options: CompilerOptions,
    pub program: Option<ProgramRef>,
    pub preference: PackageJsonAutoImportPreference,
    pub package_jsons: Vec<Rc<PackageJsonInfo>>,
    pub global_typings_cache_location: Option<String>,
    pub symlinks: SymlinkCache,
    pub package_json_info_cache: PackageJsonInfoCache,
    pub export_map_clears: usize,
}

impl FakeHost {
    /// Host rooted at `current_directory` whose only visible package.json is
    /// the one in that directory.
    pub fn new(fs: &MemoryFileSystem, current_directory: &str) -> Self {
        let manifest = format!("{current_directory}/package.json");
        Self {
            current_directory: current_directory.to_string(),
            options: CompilerOptions::default(),
            program: Some(program(&[&format!("{current_directory}/index.ts")])),
            preference: PackageJsonAutoImportPreference::Auto,
            package_jsons: PackageJsonInfo::read(fs, &manifest)
                .map(Rc::new)
                .into_iter()
                .collect(),
            global_typings_cache_location: None,
            symlinks: SymlinkCache::new(current_directory, true),
            package_json_info_cache: PackageJsonInfoCache::new(),
            export_map_clears: 0,
        }
    }
}

impl AutoImportHost for FakeHost {
    fn current_directory(&self) -> &str {
        &self.current_directory
    }

    fn use_case_sensitive_file_names(&self) -> bool {
        true
    }

    fn compiler_options(&self) -> &CompilerOptions {
        &self.options
    }

    fn current_program(&self) -> Option<ProgramRef> {
        self.program.clone()
    }

    fn include_package_json_auto_imports(&self) -> PackageJsonAutoImportPreference {
        self.preference
    }

    fn get_package_jsons_for_auto_import(&mut self) -> Vec<Rc<PackageJsonInfo>> {
        self.package_jsons.clone()
    }

    fn global_typings_cache_location(&self) -> Option<&str> {
        self.global_typings_cache_location.as_deref()
    }

    fn symlink_cache(&mut self) -> &mut SymlinkCache {
        &mut self.symlinks
    }

    fn package_json_info_cache(&mut self) -> &mut PackageJsonInfoCache {
        &mut self.package_json_info_cache
    }

    fn clear_cached_export_info_map(&mut self) {
        self.export_map_clears += 1;
    }
}

/// `<directory>/package.json` declaring `dependencies`.
pub fn write_project_package_json(fs: &MemoryFileSystem, directory: &str, dependencies: &[&str]) {
    let dependencies = dependencies
        .iter()
        .map(|name| format!("\"{name}\": \"*\""))
        .collect::<Vec<_>>()
        .join(", ");
    fs.write_file(
        &format!("{directory}/package.json"),
        &format!("{{ \"name\": \"project\", \"dependencies\": {{ {dependencies} }} }}"),
    );
}

/// A package at `package_directory` with `types: index.d.ts`.
pub fn write_typed_package(fs: &MemoryFileSystem, package_directory: &str, name: &str) {
    fs.write_file(
        &format!("{package_directory}/package.json"),
        &format!("{{ \"name\": \"{name}\", \"types\": \"index.d.ts\" }}"),
    );
    fs.write_file(
        &format!("{package_directory}/index.d.ts"),
        "export declare const value: number;",
    );
}

/// A package whose `exports` map lists `count` declaration subpaths and no
/// main entry.
pub fn write_exports_package(
    fs: &MemoryFileSystem,
    package_directory: &str,
    name: &str,
    count: usize,
) {
    let entries = (0..count)
        .map(|index| format!("\"./sub{index}\": \"./sub{index}.d.ts\""))
        .collect::<Vec<_>>()
        .join(", ");
    fs.write_file(
        &format!("{package_directory}/package.json"),
        &format!("{{ \"name\": \"{name}\", \"exports\": {{ {entries} }} }}"),
    );
    for index in 0..count {
        fs.write_file(
            &format!("{package_directory}/sub{index}.d.ts"),
            "export {};",
        );
    }
}

/// Options under which `exports` maps participate in resolution.
pub fn bundler_options() -> CompilerOptions {
    CompilerOptions {
        module_resolution: Some("bundler".to_string()),
        ..CompilerOptions::default()
    }
}
