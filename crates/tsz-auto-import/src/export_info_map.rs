//! Cached index of importable symbols.
//!
//! Built from the host program and, when present, the auto-import provider's
//! program. The map remembers which two programs it was built from and is only
//! reused while both are still current.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use tracing::debug;
use web_time::Instant;

use crate::host::{ExportKind, ProgramRef, same_program};

/// One importable export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportInfo {
    pub symbol_name: String,
    pub module_file_name: String,
    pub kind: ExportKind,
    pub is_type_only: bool,
    /// Came from the auto-import provider rather than the host program.
    pub is_from_package_json: bool,
}

#[derive(Debug, Default)]
pub struct ExportInfoMap {
    /// Symbol name -> exports, ordered by name for prefix search.
    exports: BTreeMap<String, Vec<ExportInfo>>,
    host_program: Option<ProgramRef>,
    provider_program: Option<ProgramRef>,
    built: bool,
}

impl ExportInfoMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the map was built from exactly these two programs.
    pub fn is_usable_by(
        &self,
        host_program: Option<&ProgramRef>,
        provider_program: Option<&ProgramRef>,
    ) -> bool {
        self.built
            && same_program(self.host_program.as_ref(), host_program)
            && same_program(self.provider_program.as_ref(), provider_program)
    }

    /// Replace the contents with the exports of both programs. Files the
    /// provider shares with the host are attributed to the host.
    pub fn rebuild(
        &mut self,
        host_program: Option<&ProgramRef>,
        provider_program: Option<&ProgramRef>,
    ) {
        let start = Instant::now();
        self.exports.clear();

        let mut seen_files = FxHashSet::default();
        for (program, is_from_package_json) in [(host_program, false), (provider_program, true)] {
            let Some(program) = program else {
                continue;
            };
            for file_name in program.source_file_names() {
                if !seen_files.insert(file_name.clone()) {
                    continue;
                }
                for symbol in program.module_exports(&file_name) {
                    self.exports
                        .entry(symbol.name.clone())
                        .or_default()
                        .push(ExportInfo {
                            symbol_name: symbol.name,
                            module_file_name: file_name.clone(),
                            kind: symbol.kind,
                            is_type_only: symbol.is_type_only,
                            is_from_package_json,
                        });
                }
            }
        }

        self.host_program = host_program.cloned();
        self.provider_program = provider_program.cloned();
        self.built = true;
        debug!(
            symbols = self.exports.len(),
            files = seen_files.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "export info map rebuilt"
        );
    }

    pub fn get(&self, symbol_name: &str) -> &[ExportInfo] {
        self.exports
            .get(symbol_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Exports whose symbol name starts with `prefix`, ordered by name.
    pub fn search<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a ExportInfo> + 'a {
        self.exports
            .range(prefix.to_string()..)
            .take_while(move |(name, _)| name.starts_with(prefix))
            .flat_map(|(_, exports)| exports.iter())
    }

    /// Number of distinct symbol names.
    pub fn len(&self) -> usize {
        self.exports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }

    pub fn clear(&mut self) {
        self.exports.clear();
        self.host_program = None;
        self.provider_program = None;
        self.built = false;
    }
}

#[cfg(test)]
#[path = "../tests/export_info_map_tests.rs"]
mod export_info_map_tests;
