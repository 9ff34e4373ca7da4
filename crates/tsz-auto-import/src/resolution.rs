//! Package resolution for dependency discovery.
//!
//! Two queries are answered here:
//! - where is the package.json of an installed package (`node_modules` walk)
//! - what is a package's export surface (its entry point files)
//!
//! Entry points come from the main entry (`types`/`typings`, `typesVersions`,
//! `main`, `index`) plus, when `exports` maps participate in resolution, every
//! target reachable through the `exports` map under the `import` and `require`
//! condition sets.

use std::rc::Rc;

use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHashSet};
use tsz_common::limits::{NODE_MODULES, PACKAGE_JSON};
use tsz_common::path::{
    Ancestors, combine_paths, get_base_file_name, get_directory_path,
    get_normalized_absolute_path,
};

use crate::config::{CompilerOptions, ModuleResolutionKind};
use crate::host::ModuleResolutionHost;
use crate::package_json::PackageJsonInfo;

const DECLARATION_EXTENSIONS: [&str; 3] = [".d.ts", ".d.mts", ".d.cts"];
const TYPESCRIPT_EXTENSIONS: [&str; 4] = [".ts", ".tsx", ".mts", ".cts"];
const JAVASCRIPT_EXTENSIONS: [&str; 4] = [".js", ".jsx", ".mjs", ".cjs"];

/// Which kind of files an entry point lookup accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrypointExtensions {
    /// Declaration and TypeScript sources.
    TypeScript,
    /// Plain script files.
    JavaScript,
}

impl EntrypointExtensions {
    fn candidates(self) -> &'static [&'static str] {
        match self {
            // Declarations first: they are what a typed package ships.
            Self::TypeScript => &[".d.ts", ".ts", ".tsx", ".d.mts", ".mts", ".d.cts", ".cts"],
            Self::JavaScript => &JAVASCRIPT_EXTENSIONS,
        }
    }

    pub fn accepts(self, file_name: &str) -> bool {
        match self {
            Self::TypeScript => DECLARATION_EXTENSIONS
                .iter()
                .chain(TYPESCRIPT_EXTENSIONS.iter())
                .any(|ext| file_name.ends_with(ext)),
            Self::JavaScript => JAVASCRIPT_EXTENSIONS
                .iter()
                .any(|ext| file_name.ends_with(ext)),
        }
    }

    /// Extension swaps tried for a script path (`./index.js` -> `./index.d.ts`).
    fn substitutions(self, js_extension: &str) -> &'static [&'static str] {
        match (self, js_extension) {
            (Self::TypeScript, ".js") => &[".ts", ".tsx", ".d.ts"],
            (Self::TypeScript, ".jsx") => &[".tsx", ".d.ts"],
            (Self::TypeScript, ".mjs") => &[".mts", ".d.mts"],
            (Self::TypeScript, ".cjs") => &[".cts", ".d.cts"],
            _ => &[],
        }
    }
}

/// Memoized package.json lookups by package directory, hits and misses alike.
///
/// Owned by a host project and dropped whenever its program is replaced or a
/// dependency-graph-affecting file changes.
#[derive(Debug, Default)]
pub struct PackageJsonInfoCache {
    entries: FxHashMap<String, Option<Rc<PackageJsonInfo>>>,
}

impl PackageJsonInfoCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_package_json_info(
        &mut self,
        package_directory: &str,
        host: &dyn ModuleResolutionHost,
    ) -> Option<Rc<PackageJsonInfo>> {
        let file_name = combine_paths(package_directory, PACKAGE_JSON);
        if let Some(cached) = self.entries.get(&file_name) {
            return cached.clone();
        }
        let info = (host.directory_exists(package_directory) && host.file_exists(&file_name))
            .then(|| PackageJsonInfo::read(host, &file_name).map(Rc::new))
            .flatten();
        self.entries.insert(file_name, info.clone());
        info
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Find `<ancestor>/node_modules/<package_name>/package.json`, nearest first.
///
/// Ancestors that are themselves `node_modules` directories are skipped.
pub fn resolve_package_name_to_package_json(
    package_name: &str,
    containing_directory: &str,
    host: &dyn ModuleResolutionHost,
    cache: &mut PackageJsonInfoCache,
) -> Option<Rc<PackageJsonInfo>> {
    Ancestors::new(containing_directory)
        .filter(|ancestor| get_base_file_name(ancestor) != NODE_MODULES)
        .find_map(|ancestor| {
            let candidate = combine_paths(&combine_paths(ancestor, NODE_MODULES), package_name);
            cache.get_package_json_info(&candidate, host)
        })
}

/// Conditions for one resolution mode, in the order `exports` lookups test them.
fn export_conditions(options: &CompilerOptions, import_mode: bool) -> Vec<&'static str> {
    let mut conditions = vec![if import_mode { "import" } else { "require" }, "types"];
    if options.module_resolution_kind() != ModuleResolutionKind::Bundler {
        conditions.push("node");
    }
    conditions
}

/// The export surface of a package, deduplicated, in discovery order.
///
/// Returns `None` when nothing resolves.
pub fn get_entrypoints_from_package_json_info(
    info: &PackageJsonInfo,
    options: &CompilerOptions,
    host: &dyn ModuleResolutionHost,
    extensions: EntrypointExtensions,
) -> Option<Vec<String>> {
    let mut entrypoints: IndexSet<String> = IndexSet::default();

    if let Some(main) = resolve_main_entrypoint(info, host, extensions) {
        entrypoints.insert(main);
    }

    if options.resolves_package_json_exports()
        && let Some(exports) = info.exports.as_ref()
    {
        let mut pattern_real_paths = FxHashSet::default();
        for import_mode in [true, false] {
            let conditions = export_conditions(options, import_mode);
            let mut walker = ExportMapWalker {
                info,
                host,
                extensions,
                conditions: &conditions,
                entrypoints: &mut entrypoints,
                pattern_real_paths: &mut pattern_real_paths,
            };
            walker.walk_exports(exports);
        }
    }

    (!entrypoints.is_empty()).then(|| entrypoints.into_iter().collect())
}

fn resolve_main_entrypoint(
    info: &PackageJsonInfo,
    host: &dyn ModuleResolutionHost,
    extensions: EntrypointExtensions,
) -> Option<String> {
    let directory = info.package_directory.as_str();

    if extensions == EntrypointExtensions::TypeScript {
        if let Some(types_versions) = info.types_versions.as_ref()
            && let Some(resolved) = resolve_types_versions_index(directory, types_versions, host)
        {
            return Some(resolved);
        }
        if let Some(types) = info.types_entry()
            && let Some(resolved) =
                load_file_or_directory(&join_package_path(directory, types), host, extensions)
        {
            return Some(resolved);
        }
    }

    if let Some(main) = info.main.as_deref()
        && let Some(resolved) =
            load_file_or_directory(&join_package_path(directory, main), host, extensions)
    {
        return Some(resolved);
    }

    load_file(&combine_paths(directory, "index"), host, extensions)
}

fn join_package_path(package_directory: &str, entry: &str) -> String {
    let entry = entry.trim();
    let entry = entry.strip_prefix("./").unwrap_or(entry);
    get_normalized_absolute_path(&combine_paths(package_directory, entry), "/")
}

/// Try `path` as a file: exact, with its script extension swapped, then with
/// each candidate extension appended.
fn load_file(
    path: &str,
    host: &dyn ModuleResolutionHost,
    extensions: EntrypointExtensions,
) -> Option<String> {
    if extensions.accepts(path) && host.file_exists(path) {
        return Some(path.to_string());
    }

    if let Some(js_extension) = JAVASCRIPT_EXTENSIONS
        .iter()
        .find(|ext| path.ends_with(*ext))
    {
        let stem = &path[..path.len() - js_extension.len()];
        for replacement in extensions.substitutions(js_extension) {
            let candidate = format!("{stem}{replacement}");
            if host.file_exists(&candidate) {
                return Some(candidate);
            }
        }
    }

    extensions
        .candidates()
        .iter()
        .map(|ext| format!("{path}{ext}"))
        .find(|candidate| host.file_exists(candidate))
}

fn load_file_or_directory(
    path: &str,
    host: &dyn ModuleResolutionHost,
    extensions: EntrypointExtensions,
) -> Option<String> {
    load_file(path, host, extensions).or_else(|| {
        host.directory_exists(path)
            .then(|| load_file(&combine_paths(path, "index"), host, extensions))
            .flatten()
    })
}

struct ExportMapWalker<'a> {
    info: &'a PackageJsonInfo,
    host: &'a dyn ModuleResolutionHost,
    extensions: EntrypointExtensions,
    conditions: &'a [&'static str],
    entrypoints: &'a mut IndexSet<String>,
    /// Real paths of files already matched by a `*` pattern.
    pattern_real_paths: &'a mut FxHashSet<String>,
}

impl ExportMapWalker<'_> {
    fn walk_exports(&mut self, exports: &serde_json::Value) {
        match exports {
            serde_json::Value::Array(targets) => {
                for target in targets {
                    self.walk_target(target);
                }
            }
            serde_json::Value::Object(map)
                if !map.is_empty() && map.keys().all(|key| key.starts_with('.')) =>
            {
                for target in map.values() {
                    self.walk_target(target);
                }
            }
            _ => {
                self.walk_target(exports);
            }
        }
    }

    /// Returns whether the target produced (or was allowed to produce) an entry.
    fn walk_target(&mut self, target: &serde_json::Value) -> bool {
        match target {
            serde_json::Value::String(target) => self.load_target(target),
            serde_json::Value::Array(targets) => {
                targets.iter().any(|target| self.walk_target(target))
            }
            serde_json::Value::Object(map) => {
                let Some(value) = map.iter().find_map(|(key, value)| {
                    (key == "default"
                        || self.conditions.contains(&key.as_str())
                        || is_applicable_versioned_types_key(self.conditions, key))
                    .then_some(value)
                }) else {
                    return false;
                };
                self.walk_target(value);
                true
            }
            _ => false,
        }
    }

    fn load_target(&mut self, target: &str) -> bool {
        if !target.starts_with("./") {
            return false;
        }
        let directory = self.info.package_directory.as_str();

        if let Some(star) = target.find('*') {
            if target.rfind('*') != Some(star) {
                return false;
            }
            let prefix = join_package_path(directory, &target[..star]);
            let search_root = if target[..star].ends_with('/') {
                prefix.trim_end_matches('/').to_string()
            } else {
                get_directory_path(&prefix).to_string()
            };
            let mut files = Vec::new();
            collect_files(&search_root, self.host, &mut FxHashSet::default(), &mut files);
            for file in files {
                if !file.starts_with(&prefix) || !self.extensions.accepts(&file) {
                    continue;
                }
                let real = self.host.realpath(&file).unwrap_or_else(|| file.clone());
                if self.pattern_real_paths.insert(real) {
                    self.entrypoints.insert(file);
                }
            }
            return true;
        }

        // The package directory itself and the leading `.` are the first two
        // components; nothing after them may escape or re-enter node_modules.
        if target
            .split('/')
            .skip(1)
            .any(|part| part == ".." || part == "." || part == NODE_MODULES)
        {
            return false;
        }
        match load_file(&join_package_path(directory, target), self.host, self.extensions) {
            Some(resolved) => {
                self.entrypoints.insert(resolved);
                true
            }
            None => false,
        }
    }
}

/// Files under `directory`, each real directory walked once so symlink
/// cycles terminate.
fn collect_files(
    directory: &str,
    host: &dyn ModuleResolutionHost,
    visited: &mut FxHashSet<String>,
    output: &mut Vec<String>,
) {
    let real = host
        .realpath(directory)
        .unwrap_or_else(|| directory.to_string());
    if !visited.insert(real) {
        return;
    }
    for file in host.read_directory_files(directory) {
        output.push(combine_paths(directory, &file));
    }
    for child in host.get_directories(directory) {
        if child != NODE_MODULES {
            collect_files(&combine_paths(directory, &child), host, visited, output);
        }
    }
}

// =============================================================================
// typesVersions
// =============================================================================

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
struct SemVer {
    major: u32,
    minor: u32,
    patch: u32,
}

// NOTE: Keep this in sync with the TypeScript version this compiler targets.
const TYPES_VERSIONS_COMPILER_VERSION: SemVer = SemVer {
    major: 6,
    minor: 0,
    patch: 0,
};

fn parse_semver(value: &str) -> Option<SemVer> {
    let value = value.trim().trim_start_matches('v');
    let core = value.split(['-', '+']).next()?;
    let mut parts = core.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().map_or(Some(0), |part| part.parse().ok())?;
    let patch = parts.next().map_or(Some(0), |part| part.parse().ok())?;
    Some(SemVer {
        major,
        minor,
        patch,
    })
}

/// Match a semver range such as `>=4.1`, `>=3.1 <4.0`, `*`, or `4.x || >=5`.
fn version_range_matches(range: &str, version: SemVer) -> bool {
    range.split("||").any(|alternative| {
        alternative.split_whitespace().all(|token| {
            if token == "*" || token.ends_with(".x") || token.ends_with(".*") {
                let major = token.split('.').next().and_then(|m| m.parse::<u32>().ok());
                return major.is_none_or(|major| major == version.major);
            }
            let (op, rest) = [">=", "<=", ">", "<", "="]
                .iter()
                .find_map(|op| token.strip_prefix(op).map(|rest| (*op, rest)))
                .unwrap_or(("=", token));
            let Some(bound) = parse_semver(rest) else {
                return false;
            };
            match op {
                ">=" => version >= bound,
                "<=" => version <= bound,
                ">" => version > bound,
                "<" => version < bound,
                _ => version == bound,
            }
        })
    })
}

fn is_applicable_versioned_types_key(conditions: &[&str], key: &str) -> bool {
    if !conditions.contains(&"types") {
        return false;
    }
    key.strip_prefix("types@")
        .is_some_and(|range| version_range_matches(range, TYPES_VERSIONS_COMPILER_VERSION))
}

/// Resolve the `index` subpath through the first applicable `typesVersions` entry.
fn resolve_types_versions_index(
    package_directory: &str,
    types_versions: &serde_json::Value,
    host: &dyn ModuleResolutionHost,
) -> Option<String> {
    let serde_json::Value::Object(ranges) = types_versions else {
        return None;
    };
    let serde_json::Value::Object(paths) = ranges
        .iter()
        .find(|(range, _)| version_range_matches(range, TYPES_VERSIONS_COMPILER_VERSION))
        .map(|(_, paths)| paths)?
    else {
        return None;
    };

    let (pattern, targets) = paths
        .get("index")
        .map(|targets| ("index", targets))
        .or_else(|| paths.get("*").map(|targets| ("*", targets)))?;
    let wildcard = if pattern == "*" { "index" } else { "" };
    let targets: Vec<&str> = match targets {
        serde_json::Value::Array(list) => list.iter().filter_map(|v| v.as_str()).collect(),
        serde_json::Value::String(value) => vec![value.as_str()],
        _ => return None,
    };
    targets.into_iter().find_map(|target| {
        let substituted = target.replacen('*', wildcard, 1);
        load_file_or_directory(
            &join_package_path(package_directory, &substituted),
            host,
            EntrypointExtensions::TypeScript,
        )
    })
}

#[cfg(test)]
#[path = "../tests/resolution_tests.rs"]
mod resolution_tests;
