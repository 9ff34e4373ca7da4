//! Capabilities consumed from the surrounding language service.
//!
//! The auto-import provider never parses or checks code itself. It talks to
//! three collaborators through the traits in this module:
//! - [`ModuleResolutionHost`]: the file system (existence, reads, listings, realpath)
//! - [`CompiledUnit`]: a compiled program's source-file set and export tables
//! - [`CompilerFrontend`]: turns a root-file list into a [`CompiledUnit`]

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use tsz_common::path::normalize_slashes;

use crate::config::CompilerOptions;

/// File-system capability used by package.json probing and module resolution.
///
/// All paths are normalized absolute paths with `/` separators.
pub trait ModuleResolutionHost {
    fn file_exists(&self, path: &str) -> bool;
    fn directory_exists(&self, path: &str) -> bool;
    fn read_file(&self, path: &str) -> Option<String>;
    /// Resolve symlinks. `None` when the path cannot be resolved.
    fn realpath(&self, path: &str) -> Option<String>;
    /// Names of the subdirectories of `path`.
    fn get_directories(&self, path: &str) -> Vec<String>;
    /// Names of the regular files directly inside `path`.
    fn read_directory_files(&self, path: &str) -> Vec<String>;
    fn use_case_sensitive_file_names(&self) -> bool;
}

/// [`ModuleResolutionHost`] over `std::fs`.
#[derive(Debug, Clone, Copy)]
pub struct RealFileSystem {
    case_sensitive: bool,
}

impl RealFileSystem {
    pub fn new() -> Self {
        Self {
            case_sensitive: !cfg!(any(target_os = "windows", target_os = "macos")),
        }
    }

    pub fn with_case_sensitivity(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }

    fn entry_names(path: &str, want_dirs: bool) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(path) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .filter(|entry| {
                // Follow symlinks so linked packages list like real directories.
                std::fs::metadata(entry.path())
                    .map(|meta| if want_dirs { meta.is_dir() } else { meta.is_file() })
                    .unwrap_or(false)
            })
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

impl Default for RealFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleResolutionHost for RealFileSystem {
    fn file_exists(&self, path: &str) -> bool {
        Path::new(path).is_file()
    }

    fn directory_exists(&self, path: &str) -> bool {
        Path::new(path).is_dir()
    }

    fn read_file(&self, path: &str) -> Option<String> {
        std::fs::read_to_string(path).ok()
    }

    fn realpath(&self, path: &str) -> Option<String> {
        let real = std::fs::canonicalize(path).ok()?;
        Some(normalize_slashes(&real.to_string_lossy()))
    }

    fn get_directories(&self, path: &str) -> Vec<String> {
        Self::entry_names(path, true)
    }

    fn read_directory_files(&self, path: &str) -> Vec<String> {
        Self::entry_names(path, false)
    }

    fn use_case_sensitive_file_names(&self) -> bool {
        self.case_sensitive
    }
}

/// How a symbol is exported from its module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportKind {
    Named,
    Default,
    ExportEquals,
    Umd,
}

/// One export of a compiled module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedSymbol {
    pub name: String,
    pub kind: ExportKind,
    pub is_type_only: bool,
}

impl ExportedSymbol {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ExportKind::Named,
            is_type_only: false,
        }
    }

    pub fn type_only(name: &str) -> Self {
        Self {
            is_type_only: true,
            ..Self::named(name)
        }
    }
}

/// A module resolution recorded by the compiled unit. `original_path` is set
/// when the resolved file was reached through a symlink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModuleInfo {
    pub resolved_file_name: String,
    pub original_path: Option<String>,
}

/// A compiled program as produced by the compiler frontend.
///
/// Identity matters: two handles denote the same program only when they point
/// at the same allocation (see [`same_program`]). Caches derived from a
/// program are dropped once a different program replaces it.
pub trait CompiledUnit: fmt::Debug {
    fn root_file_names(&self) -> &[String];
    /// Every source file of the program, including transitively imported ones.
    fn source_file_names(&self) -> Vec<String>;
    /// Whether `file_name` is part of the program (compared canonically).
    fn has_source_file(&self, file_name: &str) -> bool;
    fn module_exports(&self, file_name: &str) -> Vec<ExportedSymbol>;
    fn resolved_modules(&self) -> Vec<ResolvedModuleInfo> {
        Vec::new()
    }
}

pub type ProgramRef = Rc<dyn CompiledUnit>;

/// Identity comparison of two optional programs.
pub fn same_program(left: Option<&ProgramRef>, right: Option<&ProgramRef>) -> bool {
    match (left, right) {
        (Some(left), Some(right)) => Rc::ptr_eq(left, right),
        (None, None) => true,
        _ => false,
    }
}

/// Input to [`CompilerFrontend::create_program`].
#[derive(Debug, Clone, Copy)]
pub struct ProgramRequest<'a> {
    pub root_files: &'a [String],
    pub options: &'a CompilerOptions,
    /// The program being replaced; a frontend may hand it back unchanged when
    /// nothing relevant differs.
    pub old_program: Option<&'a ProgramRef>,
}

/// The opaque parser/binder/checker pipeline.
pub trait CompilerFrontend {
    fn create_program(&mut self, request: ProgramRequest<'_>) -> ProgramRef;
}

#[cfg(test)]
#[path = "../tests/host_tests.rs"]
mod host_tests;
