//! Parsed package.json descriptors.

use bitflags::bitflags;
use indexmap::IndexMap;
use serde::Deserialize;
use tsz_common::path::get_directory_path;

use crate::host::ModuleResolutionHost;

bitflags! {
    /// Dependency groups of a package.json.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DependencyGroups: u8 {
        const DEPENDENCIES = 1 << 0;
        const DEV_DEPENDENCIES = 1 << 1;
        const PEER_DEPENDENCIES = 1 << 2;
        const OPTIONAL_DEPENDENCIES = 1 << 3;
        const ALL = Self::DEPENDENCIES.bits()
            | Self::DEV_DEPENDENCIES.bits()
            | Self::PEER_DEPENDENCIES.bits()
            | Self::OPTIONAL_DEPENDENCIES.bits();
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPackageJson {
    #[serde(default)]
    name: Option<serde_json::Value>,
    #[serde(default)]
    main: Option<serde_json::Value>,
    #[serde(default)]
    types: Option<serde_json::Value>,
    #[serde(default)]
    typings: Option<serde_json::Value>,
    #[serde(default, rename = "type")]
    package_type: Option<serde_json::Value>,
    #[serde(default)]
    exports: Option<serde_json::Value>,
    #[serde(default)]
    imports: Option<serde_json::Value>,
    #[serde(default)]
    types_versions: Option<serde_json::Value>,
    #[serde(default)]
    dependencies: Option<serde_json::Value>,
    #[serde(default)]
    dev_dependencies: Option<serde_json::Value>,
    #[serde(default)]
    peer_dependencies: Option<serde_json::Value>,
    #[serde(default)]
    optional_dependencies: Option<serde_json::Value>,
}

/// `name -> version range`, in declaration order.
pub type DependencyMap = IndexMap<String, String>;

/// A package.json file that was found and parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageJsonInfo {
    /// Normalized path of the package.json file, as it was reached.
    pub file_name: String,
    /// Directory holding the package.json, as it was reached (not realpath'd).
    pub package_directory: String,
    pub name: Option<String>,
    pub main: Option<String>,
    pub types: Option<String>,
    pub typings: Option<String>,
    pub package_type: Option<String>,
    pub exports: Option<serde_json::Value>,
    pub imports: Option<serde_json::Value>,
    pub types_versions: Option<serde_json::Value>,
    pub dependencies: Option<DependencyMap>,
    pub dev_dependencies: Option<DependencyMap>,
    pub peer_dependencies: Option<DependencyMap>,
    pub optional_dependencies: Option<DependencyMap>,
}

/// Only string-valued entries of a dependency object are kept; anything else
/// (arrays, nested objects) is ignored the way npm ignores it.
fn dependency_map(value: Option<serde_json::Value>) -> Option<DependencyMap> {
    let serde_json::Value::Object(object) = value? else {
        return None;
    };
    Some(
        object
            .into_iter()
            .filter_map(|(name, range)| match range {
                serde_json::Value::String(range) => Some((name, range)),
                _ => None,
            })
            .collect(),
    )
}

/// Non-string values in string fields (`"types": false`) are ignored.
fn string_field(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(value) => Some(value),
        _ => None,
    }
}

impl PackageJsonInfo {
    /// Parse package.json text found at `file_name`. `None` when the text is
    /// not a JSON object.
    pub fn parse(file_name: &str, text: &str) -> Option<Self> {
        let raw: RawPackageJson = serde_json::from_str(text).ok()?;
        Some(Self {
            file_name: file_name.to_string(),
            package_directory: get_directory_path(file_name).to_string(),
            name: string_field(raw.name),
            main: string_field(raw.main),
            types: string_field(raw.types),
            typings: string_field(raw.typings),
            package_type: string_field(raw.package_type),
            exports: raw.exports,
            imports: raw.imports,
            types_versions: raw.types_versions,
            dependencies: dependency_map(raw.dependencies),
            dev_dependencies: dependency_map(raw.dev_dependencies),
            peer_dependencies: dependency_map(raw.peer_dependencies),
            optional_dependencies: dependency_map(raw.optional_dependencies),
        })
    }

    /// Read and parse a package.json. Read and parse failures both yield `None`.
    pub fn read(host: &dyn ModuleResolutionHost, file_name: &str) -> Option<Self> {
        let text = host.read_file(file_name)?;
        Self::parse(file_name, &text)
    }

    fn groups(&self, groups: DependencyGroups) -> impl Iterator<Item = &DependencyMap> {
        [
            (DependencyGroups::DEPENDENCIES, &self.dependencies),
            (DependencyGroups::DEV_DEPENDENCIES, &self.dev_dependencies),
            (DependencyGroups::PEER_DEPENDENCIES, &self.peer_dependencies),
            (
                DependencyGroups::OPTIONAL_DEPENDENCIES,
                &self.optional_dependencies,
            ),
        ]
        .into_iter()
        .filter(move |(group, _)| groups.contains(*group))
        .filter_map(|(_, map)| map.as_ref())
    }

    /// Version range of `dependency_name` in the first selected group that lists it.
    pub fn get(&self, dependency_name: &str, groups: DependencyGroups) -> Option<&str> {
        self.groups(groups)
            .find_map(|map| map.get(dependency_name))
            .map(String::as_str)
    }

    pub fn has(&self, dependency_name: &str, groups: DependencyGroups) -> bool {
        self.get(dependency_name, groups).is_some()
    }

    /// `types`, falling back to `typings`.
    pub fn types_entry(&self) -> Option<&str> {
        self.types.as_deref().or(self.typings.as_deref())
    }
}

#[cfg(test)]
#[path = "../tests/package_json_tests.rs"]
mod package_json_tests;
