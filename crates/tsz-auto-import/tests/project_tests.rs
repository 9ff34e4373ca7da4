use super::*;
use crate::host::ExportedSymbol;
use crate::memory_fs::MemoryFileSystem;
use crate::test_fixtures::{FakeFrontend, write_project_package_json, write_typed_package};

struct Session {
    fs: MemoryFileSystem,
    frontend: FakeFrontend,
    package_json_cache: PackageJsonCache,
    preference: PackageJsonAutoImportPreference,
    server_mode: LanguageServiceMode,
}

impl Session {
    fn new(fs: MemoryFileSystem) -> Self {
        Self {
            fs,
            frontend: FakeFrontend::new(),
            package_json_cache: PackageJsonCache::new(),
            preference: PackageJsonAutoImportPreference::Auto,
            server_mode: LanguageServiceMode::Semantic,
        }
    }

    fn ctx(&mut self) -> SessionContext<'_> {
        SessionContext {
            frontend: &mut self.frontend,
            services: SessionServices {
                resolution_host: &self.fs,
                package_json_cache: &mut self.package_json_cache,
                preference: self.preference,
                server_mode: self.server_mode,
                global_typings_cache_location: None,
            },
        }
    }
}

/// `/p` depending on typed packages `a` and `b`; `a` exports `alpha`.
fn session() -> Session {
    let fs = MemoryFileSystem::new();
    write_project_package_json(&fs, "/p", &["a", "b"]);
    write_typed_package(&fs, "/p/node_modules/a", "a");
    write_typed_package(&fs, "/p/node_modules/b", "b");
    let session = Session::new(fs);
    session.frontend.set_exports(
        "/p/node_modules/a/index.d.ts",
        vec![ExportedSymbol::named("alpha")],
    );
    session
}

fn host_project(session: &mut Session) -> HostProject {
    let mut project = HostProject::new(
        "/p/tsconfig.json",
        "/p",
        &["index.ts".to_string()],
        CompilerOptions::default(),
        true,
    );
    project.update_graph(&mut session.frontend);
    project
}

#[test]
fn test_new_project_starts_dirty() {
    let project = HostProject::new(
        "/p/tsconfig.json",
        "/p/./",
        &["src/../index.ts".to_string()],
        CompilerOptions::default(),
        true,
    );

    assert!(project.is_dirty());
    assert_eq!(project.project_version(), 0);
    assert_eq!(project.current_directory(), "/p");
    assert_eq!(project.script_file_names(), ["/p/index.ts"]);
    assert!(project.current_program().is_none());
    assert!(!project.is_orphan());
    assert!(!project.is_empty());
    assert!(project.auto_import_provider().is_unset());
}

#[test]
fn test_update_graph_only_when_dirty() {
    let mut session = session();
    let mut project = host_project(&mut session);
    assert_eq!(project.project_version(), 1);
    assert!(!project.is_dirty());

    assert!(!project.update_graph(&mut session.frontend));
    assert_eq!(session.frontend.requests().len(), 1);

    project.mark_as_dirty();
    assert!(!project.update_graph(&mut session.frontend));
    assert_eq!(project.project_version(), 1);
    assert_eq!(session.frontend.builds(), 1);
}

#[test]
fn test_effective_preference() {
    let mut project = HostProject::new("p", "/p", &[], CompilerOptions::default(), true);
    let on = PackageJsonAutoImportPreference::On;
    assert_eq!(project.include_package_json_auto_imports(on), on);
    assert_eq!(
        project.include_package_json_auto_imports(PackageJsonAutoImportPreference::Off),
        PackageJsonAutoImportPreference::Off
    );

    project.set_language_service_enabled(false);
    assert_eq!(
        project.include_package_json_auto_imports(on),
        PackageJsonAutoImportPreference::Off
    );

    let nested = HostProject::new(
        "nested",
        "/p/node_modules/a",
        &[],
        CompilerOptions::default(),
        true,
    );
    assert_eq!(
        nested.include_package_json_auto_imports(on),
        PackageJsonAutoImportPreference::Off
    );
}

#[test]
fn test_provider_is_created_once_and_reused() {
    let mut session = session();
    let mut project = host_project(&mut session);

    let first = project
        .get_package_json_auto_import_provider(&mut session.ctx())
        .unwrap();
    assert_eq!(
        first.root_file_names(),
        ["/p/node_modules/a/index.d.ts", "/p/node_modules/b/index.d.ts"]
    );
    assert!(project.auto_import_provider().as_active().is_some());
    let builds = session.frontend.builds();

    let second = project
        .get_package_json_auto_import_provider(&mut session.ctx())
        .unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(session.frontend.builds(), builds);
}

#[test]
fn test_partial_semantic_session_disables_provider() {
    let mut session = session();
    let mut project = host_project(&mut session);
    session.server_mode = LanguageServiceMode::PartialSemantic;

    assert!(project
        .get_package_json_auto_import_provider(&mut session.ctx())
        .is_none());
    assert!(project.auto_import_provider().is_disabled());

    session.server_mode = LanguageServiceMode::Semantic;
    assert!(project
        .get_package_json_auto_import_provider(&mut session.ctx())
        .is_none());

    project.on_auto_import_provider_settings_changed();
    assert!(project.auto_import_provider().is_unset());
    assert!(project
        .get_package_json_auto_import_provider(&mut session.ctx())
        .is_some());
}

#[test]
fn test_non_semantic_session_disposes_active_provider() {
    let mut session = session();
    let mut project = host_project(&mut session);
    assert!(project
        .get_package_json_auto_import_provider(&mut session.ctx())
        .is_some());
    assert!(project.auto_import_provider().as_active().is_some());

    session.server_mode = LanguageServiceMode::Syntactic;
    assert!(project
        .get_package_json_auto_import_provider(&mut session.ctx())
        .is_none());
    assert!(project.auto_import_provider().is_disabled());
}

#[test]
fn test_off_preference_or_empty_discovery_leaves_slot_unset() {
    let mut session = session();
    let mut project = host_project(&mut session);
    session.preference = PackageJsonAutoImportPreference::Off;
    assert!(project
        .get_package_json_auto_import_provider(&mut session.ctx())
        .is_none());
    assert!(project.auto_import_provider().is_unset());

    let mut empty = Session::new(MemoryFileSystem::new());
    write_project_package_json(&empty.fs, "/p", &[]);
    let mut project = host_project(&mut empty);
    assert!(project
        .get_package_json_auto_import_provider(&mut empty.ctx())
        .is_none());
    assert!(project.auto_import_provider().is_unset());
}

#[test]
fn test_host_program_change_dirties_provider() {
    let mut session = session();
    let mut project = host_project(&mut session);
    project.get_package_json_auto_import_provider(&mut session.ctx());

    project.set_root_files(&["/p/index.ts".to_string(), "/p/node_modules/a/index.d.ts".to_string()]);
    assert!(project.update_graph(&mut session.frontend));
    assert!(project
        .auto_import_provider()
        .as_active()
        .is_some_and(AutoImportProviderProject::is_dirty));

    let provider = project
        .get_package_json_auto_import_provider(&mut session.ctx())
        .unwrap();
    assert_eq!(provider.root_file_names(), ["/p/node_modules/b/index.d.ts"]);
}

#[test]
fn test_refresh_without_roots_disposes_provider() {
    let mut session = session();
    let mut project = host_project(&mut session);
    project.get_package_json_auto_import_provider(&mut session.ctx());

    project.set_root_files(&[
        "/p/index.ts".to_string(),
        "/p/node_modules/a/index.d.ts".to_string(),
        "/p/node_modules/b/index.d.ts".to_string(),
    ]);
    project.update_graph(&mut session.frontend);

    assert!(project
        .get_package_json_auto_import_provider(&mut session.ctx())
        .is_none());
    assert!(project.auto_import_provider().is_unset());
}

#[test]
fn test_package_json_change_routing() {
    let mut session = session();
    let mut project = host_project(&mut session);
    assert!(project.on_package_json_change("/p/package.json"));
    assert!(!project.on_package_json_change("/q/package.json"));
    assert!(!project.on_package_json_change("/p/sub/package.json"));

    project.get_package_json_auto_import_provider(&mut session.ctx());
    assert!(project.on_package_json_change("/p/package.json"));
    assert!(project
        .auto_import_provider()
        .as_active()
        .is_some_and(AutoImportProviderProject::is_dirty));
}

#[test]
fn test_consulted_package_jsons_are_remembered() {
    let fs = MemoryFileSystem::new();
    write_project_package_json(&fs, "/repo", &[]);
    write_project_package_json(&fs, "/repo/apps/web", &[]);
    let mut session = Session::new(fs);
    let mut project = HostProject::new(
        "web",
        "/repo/apps/web",
        &["index.ts".to_string()],
        CompilerOptions::default(),
        true,
    );

    let package_jsons = project.get_package_jsons_for_auto_import(&mut session.ctx());
    let files: Vec<&str> = package_jsons
        .iter()
        .map(|info| info.file_name.as_str())
        .collect();
    assert_eq!(files, vec!["/repo/apps/web/package.json", "/repo/package.json"]);
    assert!(project
        .state
        .package_jsons_for_auto_import
        .contains("/repo/package.json"));
    assert!(project.on_package_json_change("/repo/package.json"));
}

#[test]
fn test_dependency_graph_change_routing() {
    let mut session = session();
    let mut project = host_project(&mut session);

    assert!(!project.on_dependency_graph_affecting_file_changed("/p/node_modules/a/package.json"));

    project.get_package_json_auto_import_provider(&mut session.ctx());
    assert!(!project.state.package_json_info_cache.is_empty());
    assert!(!project.on_dependency_graph_affecting_file_changed("/p/src/util.ts"));

    assert!(project.on_dependency_graph_affecting_file_changed("/p/node_modules/a/index.d.ts"));
    assert!(project.state.package_json_info_cache.is_empty());
    assert!(project
        .auto_import_provider()
        .as_active()
        .is_some_and(AutoImportProviderProject::is_dirty));

    project.get_package_json_auto_import_provider(&mut session.ctx());
    assert!(project.on_dependency_graph_affecting_file_changed("/p/node_modules/c/package.json"));
}

#[test]
fn test_export_info_map_covers_host_and_provider() {
    let mut session = session();
    let mut project = host_project(&mut session);

    let map = project.get_cached_export_info_map(&mut session.ctx());
    assert_eq!(map.get("index").len(), 2);
    let alpha = &map.get("alpha")[0];
    assert!(alpha.is_from_package_json);
    assert_eq!(alpha.module_file_name, "/p/node_modules/a/index.d.ts");

    let builds = session.frontend.builds();
    project.get_cached_export_info_map(&mut session.ctx());
    assert_eq!(session.frontend.builds(), builds);
    let host_program = project.current_program().cloned();
    let provider_program = project
        .auto_import_provider()
        .as_active()
        .and_then(|provider| provider.current_program().cloned());
    assert!(project
        .state
        .export_info_map
        .is_usable_by(host_program.as_ref(), provider_program.as_ref()));
}

#[test]
fn test_symlink_cache_seeded_from_host_resolutions() {
    let mut session = session();
    session
        .frontend
        .add_resolution("/repo/packages/c/index.d.ts", "/p/node_modules/c/index.d.ts");
    let mut project = host_project(&mut session);

    let symlinks = project.get_symlink_cache();
    assert!(symlinks.has_processed_resolutions());
    assert_eq!(
        symlinks
            .get_symlinked_directory("/p/node_modules/c")
            .map(|directory| directory.real.as_str()),
        Some("/repo/packages/c")
    );
}

#[test]
fn test_option_and_service_changes_dispose_provider() {
    let mut session = session();
    let mut project = host_project(&mut session);
    project.get_package_json_auto_import_provider(&mut session.ctx());

    project.set_compiler_options(CompilerOptions {
        allow_js: Some(true),
        ..CompilerOptions::default()
    });
    assert!(project.auto_import_provider().is_unset());
    assert!(project.is_dirty());

    project.update_graph(&mut session.frontend);
    project.get_package_json_auto_import_provider(&mut session.ctx());
    project.set_language_service_enabled(false);
    assert!(project.auto_import_provider().is_unset());
    assert!(project
        .get_package_json_auto_import_provider(&mut session.ctx())
        .is_none());

    project.set_language_service_enabled(true);
    assert!(project
        .get_package_json_auto_import_provider(&mut session.ctx())
        .is_some());
}

#[test]
fn test_server_mode_change() {
    let mut session = session();
    let mut project = host_project(&mut session);
    project.get_package_json_auto_import_provider(&mut session.ctx());

    project.on_server_mode_changed(LanguageServiceMode::Syntactic);
    assert!(project.auto_import_provider().is_unset());

    session.server_mode = LanguageServiceMode::Syntactic;
    project.get_package_json_auto_import_provider(&mut session.ctx());
    assert!(project.auto_import_provider().is_disabled());

    session.server_mode = LanguageServiceMode::Semantic;
    project.on_server_mode_changed(LanguageServiceMode::Semantic);
    assert!(project.auto_import_provider().is_unset());
}

#[test]
fn test_close_releases_everything() {
    let mut session = session();
    let mut project = host_project(&mut session);
    project.get_cached_export_info_map(&mut session.ctx());

    project.close();
    assert!(project.auto_import_provider().is_unset());
    assert!(project.current_program().is_none());
    assert!(project.state.export_info_map.is_empty());
}
