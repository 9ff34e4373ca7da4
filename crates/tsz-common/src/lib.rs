//! Common types and utilities for the tsz auto-import crates.
//!
//! This crate provides foundational helpers used across the workspace:
//! - Normalized, canonical path strings (`path`)
//! - Discovery cost caps and other thresholds (`limits`)

// Path normalization and ancestor traversal
pub mod path;
pub use path::{
    Ancestors, combine_paths, contains_path, get_base_file_name, get_directory_path,
    get_normalized_absolute_path, is_inside_node_modules, to_path,
};

// Centralized limits and thresholds
pub mod limits;
