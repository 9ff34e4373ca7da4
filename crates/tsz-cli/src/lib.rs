//! `tsz-auto-imports`: show what the package.json auto-import provider would
//! compile for a project on disk.

pub mod args;
pub mod driver;
