//! Open a project from disk in a semantic session and report what its
//! package.json auto-import provider compiles.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use tsz_auto_import::config::load_tsconfig;
use tsz_auto_import::{
    CompiledUnit, CompilerFrontend, CompilerOptions, ExportedSymbol, HostConfiguration,
    PackageJsonAutoImportPreference, ProgramRef, ProgramRequest, ProjectService, RealFileSystem,
};
use tsz_common::path::normalize_slashes;

use crate::args::CliArgs;

const TS_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts"];
const JS_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoImportReport {
    pub project: String,
    pub include_package_json_auto_imports: &'static str,
    pub host_file_count: usize,
    pub package_jsons: Vec<String>,
    pub package_directories: Vec<String>,
    pub provider_root_files: Vec<String>,
}

/// A program that contains exactly its root files and exports nothing.
///
/// Enough to drive discovery: the provider only needs to know which files
/// the host already compiles.
#[derive(Debug)]
struct FileListProgram {
    root_files: Vec<String>,
}

impl CompiledUnit for FileListProgram {
    fn root_file_names(&self) -> &[String] {
        &self.root_files
    }

    fn source_file_names(&self) -> Vec<String> {
        self.root_files.clone()
    }

    fn has_source_file(&self, file_name: &str) -> bool {
        self.root_files.iter().any(|root| root == file_name)
    }

    fn module_exports(&self, _file_name: &str) -> Vec<ExportedSymbol> {
        Vec::new()
    }
}

#[derive(Debug, Default)]
pub struct FileListFrontend;

impl CompilerFrontend for FileListFrontend {
    fn create_program(&mut self, request: ProgramRequest<'_>) -> ProgramRef {
        if let Some(old) = request.old_program
            && old.root_file_names() == request.root_files
        {
            return Rc::clone(old);
        }
        Rc::new(FileListProgram {
            root_files: request.root_files.to_vec(),
        })
    }
}

/// Where the project lives and which tsconfig.json describes it.
#[derive(Debug)]
struct ProjectLocation {
    directory: PathBuf,
    config_file: Option<PathBuf>,
}

fn locate_project(project: Option<&Path>) -> Result<ProjectLocation> {
    let path = match project {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir().context("failed to get current directory")?,
    };
    if path.is_file() {
        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        return Ok(ProjectLocation {
            directory,
            config_file: Some(path),
        });
    }
    if !path.is_dir() {
        bail!("project path does not exist: {}", path.display());
    }
    let config = path.join("tsconfig.json");
    Ok(ProjectLocation {
        config_file: config.is_file().then_some(config),
        directory: path,
    })
}

fn is_skipped_directory(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name == "node_modules" || name.starts_with('.')
}

fn is_source_file(path: &Path, allow_js: bool) -> bool {
    let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    TS_EXTENSIONS.contains(&extension) || (allow_js && JS_EXTENSIONS.contains(&extension))
}

/// Source files under `directory`, sorted, skipping `node_modules` and
/// hidden directories.
pub fn collect_source_files(directory: &Path, options: &CompilerOptions) -> Vec<String> {
    let allow_js = options.allow_js == Some(true);
    WalkDir::new(directory)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped_directory(entry))
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_source_file(entry.path(), allow_js))
        .map(|entry| normalize_slashes(&entry.path().to_string_lossy()))
        .collect()
}

fn preference_name(preference: PackageJsonAutoImportPreference) -> &'static str {
    match preference {
        PackageJsonAutoImportPreference::Off => "off",
        PackageJsonAutoImportPreference::On => "on",
        PackageJsonAutoImportPreference::Auto => "auto",
    }
}

pub fn run(args: &CliArgs) -> Result<AutoImportReport> {
    let location = locate_project(args.project.as_deref())?;
    let directory = std::fs::canonicalize(&location.directory).with_context(|| {
        format!(
            "failed to resolve project directory: {}",
            location.directory.display()
        )
    })?;
    let compiler_options = match &location.config_file {
        Some(config_file) => load_tsconfig(config_file)?
            .compiler_options
            .unwrap_or_default(),
        None => CompilerOptions::default(),
    };

    let preference = args
        .include_package_json_auto_imports
        .unwrap_or_default()
        .preference();
    let mut configuration = HostConfiguration::with_preference(preference);
    if let Some(cache) = &args.global_typings_cache {
        let cache = std::path::absolute(cache).with_context(|| {
            format!("failed to resolve global typings cache: {}", cache.display())
        })?;
        configuration.global_typings_cache_location = Some(normalize_slashes(&cache.to_string_lossy()));
    }

    let project_directory = normalize_slashes(&directory.to_string_lossy());
    let project_name = location.config_file.as_ref().map_or_else(
        || project_directory.clone(),
        |config_file| normalize_slashes(&config_file.to_string_lossy()),
    );
    let root_files = collect_source_files(&directory, &compiler_options);
    info!(
        project = %project_name,
        host_files = root_files.len(),
        ?preference,
        "opening project"
    );

    let mut service = ProjectService::new(
        Rc::new(RealFileSystem::new()),
        Box::new(FileListFrontend),
    )
    .with_host_configuration(configuration);
    let id = service.open_project(&project_name, &project_directory, &root_files, compiler_options);
    let provider_program = service.get_package_json_auto_import_provider(id);
    let package_jsons = service
        .get_package_jsons_for_auto_import(id)
        .iter()
        .map(|info| info.file_name.clone())
        .collect();
    let package_directories = service
        .project(id)
        .and_then(|project| project.auto_import_provider().as_active())
        .map(|provider| provider.package_directories().to_vec())
        .unwrap_or_default();
    let provider_root_files = provider_program
        .map(|program| program.root_file_names().to_vec())
        .unwrap_or_default();
    debug!(roots = provider_root_files.len(), "provider queried");

    Ok(AutoImportReport {
        project: project_name,
        include_package_json_auto_imports: preference_name(preference),
        host_file_count: root_files.len(),
        package_jsons,
        package_directories,
        provider_root_files,
    })
}

pub fn render_json(report: &AutoImportReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize report")
}

pub fn render_text(report: &AutoImportReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("project: {}\n", report.project));
    out.push_str(&format!(
        "includePackageJsonAutoImports: {}\n",
        report.include_package_json_auto_imports
    ));
    out.push_str(&format!("host files: {}\n", report.host_file_count));
    out.push_str("package.json files:\n");
    for file in &report.package_jsons {
        out.push_str(&format!("  {file}\n"));
    }
    if report.provider_root_files.is_empty() {
        out.push_str("auto-import provider: none\n");
        return out;
    }
    out.push_str(&format!(
        "auto-import provider roots ({}):\n",
        report.provider_root_files.len()
    ));
    for file in &report.provider_root_files {
        out.push_str(&format!("  {file}\n"));
    }
    out
}

#[cfg(test)]
#[path = "../tests/driver_tests.rs"]
mod driver_tests;
