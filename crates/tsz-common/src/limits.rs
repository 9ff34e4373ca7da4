//! Centralized limits and thresholds for the auto-import provider.
//!
//! Dependency discovery deliberately trades completeness for responsiveness.
//! Every cap that bounds how much of `node_modules` ends up in the derived
//! compilation lives here so the values stay consistent between discovery,
//! logging, and tests.
//!
//! # Categories
//!
//! - **Discovery Caps**: Bounds on how many dependencies and entry points a
//!   single discovery run may add
//! - **Well-known Names**: Synthetic file names and path segments used as
//!   anchors during discovery

// =============================================================================
// Discovery Caps
// =============================================================================
// These keep the auto-import provider project small enough that building it
// never becomes the slowest part of opening an editor.

/// Maximum number of dependencies added under the `auto` preference.
///
/// Once the number of dependencies that contributed at least one root file
/// exceeds this cap, discovery aborts and returns *no* root files at all.
/// Partial results are discarded rather than truncated.
///
/// The `on` preference ignores this cap.
///
/// # Example
///
/// ```text
/// package.json dependencies: a, b, c, ... k   (11 typed packages)
/// includePackageJsonAutoImports = "auto"
/// → after `k` is added the count is 11 > 10, discovery returns []
/// ```
pub const MAX_AUTO_IMPORT_DEPENDENCIES: usize = 10;

/// Maximum number of entry points a single package may contribute.
///
/// Some packages ship export maps with hundreds of subpaths. A package whose
/// resolved export surface has more entries than this is skipped entirely,
/// no matter which preference is active.
///
/// # Example
///
/// ```json
/// {
///   "name": "huge",
///   "exports": { "./a": "./a.d.ts", "./b": "./b.d.ts", "...": "101 entries" }
/// }
/// ```
pub const MAX_PACKAGE_ENTRYPOINTS: usize = 100;

// =============================================================================
// Well-known Names
// =============================================================================

/// Synthetic root file used to anchor "package.json files visible to the
/// project" queries at the project's current directory.
pub const INFERRED_TYPES_CONTAINING_FILE: &str = "__inferred type names__.ts";

/// Directory name that holds installed packages.
pub const NODE_MODULES: &str = "node_modules";

/// Package-name prefix for type-only packages published under DefinitelyTyped.
pub const TYPES_PACKAGE_PREFIX: &str = "@types/";

/// File name of a package descriptor.
pub const PACKAGE_JSON: &str = "package.json";
