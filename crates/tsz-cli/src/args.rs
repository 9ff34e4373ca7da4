use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use tsz_auto_import::PackageJsonAutoImportPreference;

/// CLI arguments for the tsz-auto-imports binary.
#[derive(Parser, Debug)]
#[command(
    name = "tsz-auto-imports",
    version,
    about = "List the dependency entry points offered to auto-import completions"
)]
pub struct CliArgs {
    /// Project directory, or a tsconfig.json inside it. Defaults to the current directory.
    #[arg(short = 'p', long = "project")]
    pub project: Option<PathBuf>,

    /// Whether dependencies from package.json are offered to auto-imports.
    #[arg(
        long = "include-package-json-auto-imports",
        alias = "includePackageJsonAutoImports",
        value_enum,
        ignore_case = true
    )]
    pub include_package_json_auto_imports: Option<AutoImportInclusion>,

    /// Directory where automatic type acquisition installs `@types` packages.
    #[arg(long = "global-typings-cache", alias = "globalTypingsCache")]
    pub global_typings_cache: Option<PathBuf>,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum AutoImportInclusion {
    On,
    Off,
    #[default]
    Auto,
}

impl AutoImportInclusion {
    pub fn preference(self) -> PackageJsonAutoImportPreference {
        match self {
            Self::On => PackageJsonAutoImportPreference::On,
            Self::Off => PackageJsonAutoImportPreference::Off,
            Self::Auto => PackageJsonAutoImportPreference::Auto,
        }
    }
}

#[cfg(test)]
#[path = "../tests/args_tests.rs"]
mod args_tests;
