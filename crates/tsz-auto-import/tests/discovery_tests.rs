use super::*;
use crate::memory_fs::MemoryFileSystem;
use crate::test_fixtures::{
    FakeHost, bundler_options, program, write_exports_package, write_project_package_json,
    write_typed_package,
};

const AUTO: PackageJsonAutoImportPreference = PackageJsonAutoImportPreference::Auto;
const ON: PackageJsonAutoImportPreference = PackageJsonAutoImportPreference::On;

fn discover(
    fs: &MemoryFileSystem,
    host: &mut FakeHost,
    selection: PackageJsonAutoImportPreference,
    options: &CompilerOptions,
) -> DependencyDiscoveryResult {
    get_root_file_names(selection, host, fs, options)
}

/// `/p/package.json` listing `count` typed dependencies `dep0..`.
fn project_with_typed_dependencies(count: usize) -> MemoryFileSystem {
    let fs = MemoryFileSystem::new();
    let names: Vec<String> = (0..count).map(|index| format!("dep{index}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    write_project_package_json(&fs, "/p", &refs);
    for name in &names {
        write_typed_package(&fs, &format!("/p/node_modules/{name}"), name);
    }
    fs
}

#[test]
fn test_types_package_name_mangles_scopes() {
    assert_eq!(types_package_name("react"), "@types/react");
    assert_eq!(types_package_name("@babel/core"), "@types/babel__core");
}

#[test]
fn test_collect_dependency_names_dedups_and_skips_types() {
    let outer = PackageJsonInfo::parse(
        "/package.json",
        r#"{ "dependencies": { "shared": "*", "outer": "*" }, "devDependencies": { "jest": "*" } }"#,
    )
    .unwrap();
    let inner = PackageJsonInfo::parse(
        "/p/package.json",
        r#"{
            "dependencies": { "inner": "*", "@types/node": "*", "shared": "*" },
            "peerDependencies": { "peer": "*" }
        }"#,
    )
    .unwrap();

    let names = collect_dependency_names(&[Rc::new(inner), Rc::new(outer)]);
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    assert_eq!(names, vec!["inner", "shared", "peer", "outer"]);
}

#[test]
fn test_typed_dependency_contributes_its_entrypoint() {
    let fs = MemoryFileSystem::new();
    write_project_package_json(&fs, "/p", &["a"]);
    write_typed_package(&fs, "/p/node_modules/a", "a");
    let mut host = FakeHost::new(&fs, "/p");

    let result = discover(&fs, &mut host, AUTO, &CompilerOptions::default());
    assert_eq!(result.root_file_names, vec!["/p/node_modules/a/index.d.ts"]);
    assert_eq!(result.dependencies_added, 1);
    assert_eq!(result.package_directories, vec!["/p/node_modules/a"]);
    assert!(!result.aborted);
}

#[test]
fn test_untyped_dependency_falls_back_to_types_package() {
    let fs = MemoryFileSystem::new();
    write_project_package_json(&fs, "/p", &["b", "@scope/pkg"]);
    fs.write_file("/p/node_modules/b/package.json", r#"{ "main": "index.js" }"#);
    fs.write_file("/p/node_modules/b/index.js", "");
    write_typed_package(&fs, "/p/node_modules/@types/b", "@types/b");
    fs.write_file("/p/node_modules/@scope/pkg/package.json", r#"{ "main": "index.js" }"#);
    fs.write_file("/p/node_modules/@scope/pkg/index.js", "");
    write_typed_package(
        &fs,
        "/p/node_modules/@types/scope__pkg",
        "@types/scope__pkg",
    );
    let mut host = FakeHost::new(&fs, "/p");

    let result = discover(&fs, &mut host, AUTO, &CompilerOptions::default());
    assert_eq!(
        result.root_file_names,
        vec![
            "/p/node_modules/@types/b/index.d.ts",
            "/p/node_modules/@types/scope__pkg/index.d.ts",
        ]
    );
    assert_eq!(result.dependencies_added, 2);
}

#[test]
fn test_types_package_found_in_global_typings_cache() {
    let fs = MemoryFileSystem::new();
    write_project_package_json(&fs, "/p", &["c"]);
    write_typed_package(&fs, "/cache/node_modules/@types/c", "@types/c");
    let mut host = FakeHost::new(&fs, "/p");

    let without_cache = discover(&fs, &mut host, AUTO, &CompilerOptions::default());
    assert!(without_cache.is_empty());

    host.global_typings_cache_location = Some("/cache".to_string());
    let result = discover(&fs, &mut host, AUTO, &CompilerOptions::default());
    assert_eq!(
        result.root_file_names,
        vec!["/cache/node_modules/@types/c/index.d.ts"]
    );
}

#[test]
fn test_script_entrypoints_need_allow_js_and_depth() {
    let fs = MemoryFileSystem::new();
    write_project_package_json(&fs, "/p", &["d"]);
    fs.write_file("/p/node_modules/d/package.json", r#"{ "main": "lib/index.js" }"#);
    fs.write_file("/p/node_modules/d/lib/index.js", "");
    let mut host = FakeHost::new(&fs, "/p");

    let allow_js_only = CompilerOptions {
        allow_js: Some(true),
        ..CompilerOptions::default()
    };
    assert!(discover(&fs, &mut host, AUTO, &allow_js_only).is_empty());

    let options = CompilerOptions {
        allow_js: Some(true),
        max_node_module_js_depth: Some(1),
        ..CompilerOptions::default()
    };
    let result = discover(&fs, &mut host, AUTO, &options);
    assert_eq!(result.root_file_names, vec!["/p/node_modules/d/lib/index.js"]);
}

#[test]
fn test_files_in_host_program_are_not_roots() {
    let fs = MemoryFileSystem::new();
    write_project_package_json(&fs, "/p", &["a"]);
    write_typed_package(&fs, "/p/node_modules/a", "a");
    write_typed_package(&fs, "/p/node_modules/@types/a", "@types/a");
    let mut host = FakeHost::new(&fs, "/p");
    host.program = Some(program(&["/p/index.ts", "/p/node_modules/a/index.d.ts"]));

    let result = discover(&fs, &mut host, AUTO, &CompilerOptions::default());
    assert!(result.is_empty());
    assert_eq!(result.dependencies_added, 0);
}

#[test]
fn test_auto_aborts_past_dependency_cap() {
    let fs = project_with_typed_dependencies(MAX_AUTO_IMPORT_DEPENDENCIES + 1);
    let mut host = FakeHost::new(&fs, "/p");

    let result = discover(&fs, &mut host, AUTO, &CompilerOptions::default());
    assert!(result.is_empty());
    assert!(result.aborted);
    assert_eq!(result.dependencies_added, 0);
}

#[test]
fn test_auto_accepts_exactly_the_dependency_cap() {
    let fs = project_with_typed_dependencies(MAX_AUTO_IMPORT_DEPENDENCIES);
    let mut host = FakeHost::new(&fs, "/p");

    let result = discover(&fs, &mut host, AUTO, &CompilerOptions::default());
    assert_eq!(result.root_file_names.len(), MAX_AUTO_IMPORT_DEPENDENCIES);
    assert!(!result.aborted);
}

#[test]
fn test_on_ignores_dependency_cap() {
    let fs = project_with_typed_dependencies(MAX_AUTO_IMPORT_DEPENDENCIES + 1);
    let mut host = FakeHost::new(&fs, "/p");

    let result = discover(&fs, &mut host, ON, &CompilerOptions::default());
    assert_eq!(
        result.root_file_names.len(),
        MAX_AUTO_IMPORT_DEPENDENCIES + 1
    );
    assert_eq!(result.dependencies_added, MAX_AUTO_IMPORT_DEPENDENCIES + 1);
}

#[test]
fn test_package_over_entrypoint_cap_contributes_nothing() {
    let fs = MemoryFileSystem::new();
    write_project_package_json(&fs, "/p", &["huge"]);
    write_exports_package(
        &fs,
        "/p/node_modules/huge",
        "huge",
        MAX_PACKAGE_ENTRYPOINTS + 1,
    );
    let mut host = FakeHost::new(&fs, "/p");

    let result = discover(&fs, &mut host, ON, &bundler_options());
    assert!(result.is_empty());
}

#[test]
fn test_package_at_entrypoint_cap_is_included() {
    let fs = MemoryFileSystem::new();
    write_project_package_json(&fs, "/p", &["wide"]);
    write_exports_package(&fs, "/p/node_modules/wide", "wide", MAX_PACKAGE_ENTRYPOINTS);
    let mut host = FakeHost::new(&fs, "/p");

    let result = discover(&fs, &mut host, ON, &bundler_options());
    assert_eq!(result.root_file_names.len(), MAX_PACKAGE_ENTRYPOINTS);
    assert_eq!(result.dependencies_added, 1);
}

#[test]
fn test_oversized_package_falls_through_to_types_package() {
    let fs = MemoryFileSystem::new();
    write_project_package_json(&fs, "/p", &["huge"]);
    write_exports_package(
        &fs,
        "/p/node_modules/huge",
        "huge",
        MAX_PACKAGE_ENTRYPOINTS + 1,
    );
    write_typed_package(&fs, "/p/node_modules/@types/huge", "@types/huge");
    let mut host = FakeHost::new(&fs, "/p");

    let result = discover(&fs, &mut host, ON, &bundler_options());
    assert_eq!(
        result.root_file_names,
        vec!["/p/node_modules/@types/huge/index.d.ts"]
    );
}

#[test]
fn test_symlinked_packages_are_rooted_once_by_real_path() {
    let fs = MemoryFileSystem::new();
    write_project_package_json(&fs, "/p", &["a", "a-alias"]);
    write_typed_package(&fs, "/packages/a", "a");
    fs.symlink_dir("/p/node_modules/a", "/packages/a");
    fs.symlink_dir("/p/node_modules/a-alias", "/packages/a");
    let mut host = FakeHost::new(&fs, "/p");

    let result = discover(&fs, &mut host, AUTO, &CompilerOptions::default());
    assert_eq!(result.root_file_names, vec!["/packages/a/index.d.ts"]);
    assert_eq!(result.dependencies_added, 1);
    assert_eq!(result.package_directories, vec!["/packages/a"]);

    assert_eq!(
        host.symlinks.get_symlinked_directories_by_realpath("/packages/a"),
        ["/p/node_modules/a", "/p/node_modules/a-alias"]
    );
}

#[test]
fn test_host_program_holding_symlink_form_suppresses_root() {
    let fs = MemoryFileSystem::new();
    write_project_package_json(&fs, "/p", &["a"]);
    write_typed_package(&fs, "/packages/a", "a");
    fs.symlink_dir("/p/node_modules/a", "/packages/a");
    let mut host = FakeHost::new(&fs, "/p");
    host.program = Some(program(&["/p/index.ts", "/p/node_modules/a/index.d.ts"]));

    let result = discover(&fs, &mut host, AUTO, &CompilerOptions::default());
    assert!(result.is_empty());
}

#[test]
fn test_off_or_missing_program_yields_nothing() {
    let fs = project_with_typed_dependencies(1);
    let mut host = FakeHost::new(&fs, "/p");

    let off = discover(
        &fs,
        &mut host,
        PackageJsonAutoImportPreference::Off,
        &CompilerOptions::default(),
    );
    assert_eq!(off, DependencyDiscoveryResult::default());

    host.program = None;
    let without_program = discover(&fs, &mut host, AUTO, &CompilerOptions::default());
    assert_eq!(without_program, DependencyDiscoveryResult::default());
}

#[test]
fn test_mixed_dependencies_end_to_end() {
    let fs = MemoryFileSystem::new();
    write_project_package_json(&fs, "/p", &["a", "b", "c"]);
    write_exports_package(&fs, "/p/node_modules/a", "a", 3);
    fs.write_file("/p/node_modules/b/package.json", r#"{ "main": "index.js" }"#);
    fs.write_file("/p/node_modules/b/index.js", "");
    fs.write_file(
        "/p/node_modules/@types/b/package.json",
        r#"{
            "name": "@types/b",
            "types": "index.d.ts",
            "exports": { ".": "./index.d.ts", "./extra": "./extra.d.ts" }
        }"#,
    );
    fs.write_file("/p/node_modules/@types/b/index.d.ts", "");
    fs.write_file("/p/node_modules/@types/b/extra.d.ts", "");
    fs.write_file("/p/node_modules/c/package.json", r#"{ "main": "index.js" }"#);
    fs.write_file("/p/node_modules/c/index.js", "");
    let mut host = FakeHost::new(&fs, "/p");

    let result = discover(&fs, &mut host, AUTO, &bundler_options());
    assert_eq!(
        result.root_file_names,
        vec![
            "/p/node_modules/a/sub0.d.ts",
            "/p/node_modules/a/sub1.d.ts",
            "/p/node_modules/a/sub2.d.ts",
            "/p/node_modules/@types/b/index.d.ts",
            "/p/node_modules/@types/b/extra.d.ts",
        ]
    );
    assert_eq!(result.dependencies_added, 2);
    assert_eq!(
        result.package_directories,
        vec!["/p/node_modules/a", "/p/node_modules/@types/b"]
    );
}
