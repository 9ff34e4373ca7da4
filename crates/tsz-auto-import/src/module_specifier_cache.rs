//! Per-project cache of import-path computations.
//!
//! Entries are keyed by `(importing file, target module)` and always belong to
//! exactly one fingerprint of the specifier-affecting preferences (see
//! [`SpecifierFingerprint`]). Any lookup or write under a different fingerprint
//! drops every entry first, so the cache never mixes results computed under
//! different preferences.

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::config::UserPreferences;

/// How a module specifier was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleSpecifierKind {
    /// `import "pkg/sub"` through `node_modules`.
    NodeModules,
    /// Through a `paths` mapping.
    Paths,
    /// Through a project-reference redirect.
    Redirect,
    Relative,
    /// An ambient module declaration.
    Ambient,
    Unknown,
}

/// A file path through which a module can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePath {
    pub path: String,
    pub is_in_node_modules: bool,
    pub is_redirect: bool,
}

/// Resolution mode override for an import (`with { "resolution-mode": ... }`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionMode {
    CommonJs,
    EsModule,
}

impl ResolutionMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::CommonJs => "commonjs",
            Self::EsModule => "esm",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleSpecifierOptions {
    pub override_import_mode: Option<ResolutionMode>,
}

/// Everything that changes the outcome of a specifier computation besides the
/// target module itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecifierFingerprint {
    from_file: String,
    import_module_specifier_ending: Option<String>,
    import_module_specifier_preference: Option<String>,
    override_import_mode: Option<ResolutionMode>,
}

impl SpecifierFingerprint {
    pub fn new(
        from_file: &str,
        preferences: &UserPreferences,
        options: ModuleSpecifierOptions,
    ) -> Self {
        Self {
            from_file: from_file.to_string(),
            import_module_specifier_ending: preferences.import_module_specifier_ending.clone(),
            import_module_specifier_preference: preferences
                .import_module_specifier_preference
                .clone(),
            override_import_mode: options.override_import_mode,
        }
    }

    /// Compact rendering used in logs: `from,ending,preference,mode`.
    pub fn key(&self) -> String {
        format!(
            "{},{},{},{}",
            self.from_file,
            self.import_module_specifier_ending.as_deref().unwrap_or(""),
            self.import_module_specifier_preference
                .as_deref()
                .unwrap_or(""),
            self.override_import_mode.map_or("", ResolutionMode::as_str),
        )
    }
}

/// What is known about importing one module from one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModuleSpecifierInfo {
    pub kind: Option<ModuleSpecifierKind>,
    pub module_paths: Option<Vec<ModulePath>>,
    pub module_specifiers: Option<Vec<String>>,
    /// Package name the specifiers go through, when the target is a dependency.
    pub package_name: Option<String>,
    pub is_blocked_by_package_json_dependencies: Option<bool>,
}

impl ResolvedModuleSpecifierInfo {
    fn empty() -> Self {
        Self {
            kind: None,
            module_paths: None,
            module_specifiers: None,
            package_name: None,
            is_blocked_by_package_json_dependencies: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ModuleSpecifierCache {
    fingerprint: Option<SpecifierFingerprint>,
    /// Target module path -> info, for the current fingerprint.
    entries: FxHashMap<String, ResolvedModuleSpecifierInfo>,
}

impl ModuleSpecifierCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `fingerprint` current, dropping everything cached under another one.
    fn ensure_fingerprint(&mut self, fingerprint: SpecifierFingerprint) {
        if self.fingerprint.as_ref() == Some(&fingerprint) {
            return;
        }
        if !self.entries.is_empty() {
            trace!(
                entries = self.entries.len(),
                fingerprint = %fingerprint.key(),
                "module specifier cache: fingerprint changed, dropping entries"
            );
        }
        self.entries.clear();
        self.fingerprint = Some(fingerprint);
    }

    fn entry(
        &mut self,
        from_file: &str,
        to_file: &str,
        preferences: &UserPreferences,
        options: ModuleSpecifierOptions,
    ) -> &mut ResolvedModuleSpecifierInfo {
        self.ensure_fingerprint(SpecifierFingerprint::new(from_file, preferences, options));
        self.entries
            .entry(to_file.to_string())
            .or_insert_with(ResolvedModuleSpecifierInfo::empty)
    }

    pub fn get(
        &mut self,
        from_file: &str,
        to_file: &str,
        preferences: &UserPreferences,
        options: ModuleSpecifierOptions,
    ) -> Option<&ResolvedModuleSpecifierInfo> {
        self.ensure_fingerprint(SpecifierFingerprint::new(from_file, preferences, options));
        self.entries.get(to_file)
    }

    /// Record computed specifiers together with the paths they were derived from.
    /// Replaces the whole entry, so an earlier dependency block is cleared.
    pub fn set(
        &mut self,
        from_file: &str,
        to_file: &str,
        preferences: &UserPreferences,
        options: ModuleSpecifierOptions,
        kind: ModuleSpecifierKind,
        module_paths: Vec<ModulePath>,
        module_specifiers: Vec<String>,
    ) {
        *self.entry(from_file, to_file, preferences, options) = ResolvedModuleSpecifierInfo {
            kind: Some(kind),
            module_paths: Some(module_paths),
            module_specifiers: Some(module_specifiers),
            package_name: None,
            is_blocked_by_package_json_dependencies: Some(false),
        };
    }

    pub fn set_module_paths(
        &mut self,
        from_file: &str,
        to_file: &str,
        preferences: &UserPreferences,
        options: ModuleSpecifierOptions,
        module_paths: Vec<ModulePath>,
    ) {
        self.entry(from_file, to_file, preferences, options).module_paths = Some(module_paths);
    }

    pub fn set_blocked_by_package_json_dependencies(
        &mut self,
        from_file: &str,
        to_file: &str,
        preferences: &UserPreferences,
        options: ModuleSpecifierOptions,
        package_name: Option<&str>,
        is_blocked: bool,
    ) {
        let info = self.entry(from_file, to_file, preferences, options);
        info.is_blocked_by_package_json_dependencies = Some(is_blocked);
        info.package_name = package_name.map(str::to_string);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.fingerprint = None;
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
#[path = "../tests/module_specifier_cache_tests.rs"]
mod module_specifier_cache_tests;
