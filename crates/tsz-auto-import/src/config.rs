//! Host configuration, user preferences, and the compiler-option subset the
//! auto-import provider reads.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;

/// Custom deserializer for boolean options that accepts both bool and string values.
/// This handles cases where tsconfig.json contains `"allowJs": "true"` instead of `"allowJs": true`.
fn deserialize_bool_or_string<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    match Option::<BoolOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolOrString::Bool(b)) => Ok(Some(b)),
        Some(BoolOrString::String(s)) => {
            let normalized = s.trim().to_lowercase();
            match normalized.as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(Error::custom(format!(
                    "invalid boolean value: '{}'. Expected true, false, 'true', or 'false'",
                    s
                ))),
            }
        }
    }
}

/// How aggressively installed dependencies are offered as auto-imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PackageJsonAutoImportPreference {
    /// Never build an auto-import provider.
    Off,
    /// Include every dependency; only the per-package entry point cap applies.
    On,
    /// Include dependencies until the dependency cap is exceeded, then give up.
    #[default]
    Auto,
}

impl PackageJsonAutoImportPreference {
    /// Map the `includePackageJsonAutoImports` preference string.
    ///
    /// Anything other than `"on"` or `"off"` (including no value) means `Auto`.
    pub fn from_preference(value: Option<&str>) -> Self {
        match value {
            Some("on") => Self::On,
            Some("off") => Self::Off,
            _ => Self::Auto,
        }
    }

    pub fn is_off(self) -> bool {
        self == Self::Off
    }
}

/// What the hosting session is able to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguageServiceMode {
    /// Full program construction and type checking.
    #[default]
    Semantic,
    /// Only open files are analysed.
    PartialSemantic,
    /// Syntax only; no programs are built.
    Syntactic,
}

/// Editor preferences that affect auto-import behavior.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default)]
    pub include_package_json_auto_imports: Option<String>,
    #[serde(default)]
    pub import_module_specifier_preference: Option<String>,
    #[serde(default)]
    pub import_module_specifier_ending: Option<String>,
}

/// Session-wide configuration pushed by the editor.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HostConfiguration {
    #[serde(default)]
    pub preferences: UserPreferences,
    /// Directory where automatic type acquisition installs `@types` packages.
    #[serde(default)]
    pub global_typings_cache_location: Option<String>,
}

impl HostConfiguration {
    pub fn with_preference(preference: PackageJsonAutoImportPreference) -> Self {
        let value = match preference {
            PackageJsonAutoImportPreference::Off => "off",
            PackageJsonAutoImportPreference::On => "on",
            PackageJsonAutoImportPreference::Auto => "auto",
        };
        Self {
            preferences: UserPreferences {
                include_package_json_auto_imports: Some(value.to_string()),
                ..UserPreferences::default()
            },
            global_typings_cache_location: None,
        }
    }

    /// Parse a configuration object as sent by the editor.
    pub fn from_json(source: &str) -> Result<Self> {
        serde_json::from_str(source).context("failed to parse host configuration JSON")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleResolutionKind {
    Classic,
    Node10,
    Node16,
    NodeNext,
    Bundler,
}

impl ModuleResolutionKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "classic" => Some(Self::Classic),
            "node" | "node10" => Some(Self::Node10),
            "node16" => Some(Self::Node16),
            "nodenext" => Some(Self::NodeNext),
            "bundler" => Some(Self::Bundler),
            _ => None,
        }
    }
}

/// The `compilerOptions` the auto-import provider reads or overrides.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub allow_js: Option<bool>,
    #[serde(default)]
    pub max_node_module_js_depth: Option<u32>,
    #[serde(default)]
    pub module_resolution: Option<String>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub resolve_package_json_exports: Option<bool>,
    #[serde(default)]
    pub types: Option<Vec<String>>,
    #[serde(default)]
    pub lib: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub no_lib: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub skip_lib_check: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub source_map: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub diagnostics: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub disable_source_of_project_reference_redirect: Option<bool>,
}

impl CompilerOptions {
    pub fn module_resolution_kind(&self) -> ModuleResolutionKind {
        self.module_resolution
            .as_deref()
            .and_then(ModuleResolutionKind::parse)
            .unwrap_or(ModuleResolutionKind::Node10)
    }

    /// Whether `exports` maps participate in resolution.
    pub fn resolves_package_json_exports(&self) -> bool {
        self.resolve_package_json_exports.unwrap_or(matches!(
            self.module_resolution_kind(),
            ModuleResolutionKind::Node16
                | ModuleResolutionKind::NodeNext
                | ModuleResolutionKind::Bundler
        ))
    }

    /// Both `allowJs` and a non-zero `maxNodeModuleJsDepth` are required before
    /// plain script entry points of dependencies are considered.
    pub fn allows_dependency_js(&self) -> bool {
        self.allow_js.unwrap_or(false) && self.max_node_module_js_depth.unwrap_or(0) > 0
    }

    pub fn use_source_of_project_reference_redirect(&self) -> bool {
        !self
            .disable_source_of_project_reference_redirect
            .unwrap_or(false)
    }

    /// Host options with the overrides applied to the derived compilation:
    /// the cheapest program that still exposes export symbol tables.
    pub fn with_auto_import_provider_overrides(&self) -> Self {
        Self {
            diagnostics: Some(false),
            skip_lib_check: Some(true),
            source_map: Some(false),
            types: Some(Vec::new()),
            lib: Some(Vec::new()),
            no_lib: Some(true),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TsConfig {
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub compiler_options: Option<CompilerOptions>,
    #[serde(default)]
    pub include: Option<Vec<String>>,
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
    #[serde(default)]
    pub files: Option<Vec<String>>,
}

/// Parse tsconfig.json text. Comments and trailing commas are accepted.
pub fn parse_tsconfig(source: &str) -> Result<TsConfig> {
    json5::from_str(source).context("failed to parse tsconfig JSON")
}

pub fn load_tsconfig(path: &Path) -> Result<TsConfig> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read tsconfig: {}", path.display()))?;
    parse_tsconfig(&source).with_context(|| format!("in {}", path.display()))
}

#[cfg(test)]
#[path = "../tests/config_tests.rs"]
mod config_tests;
