//! Import resolver (spec §4.7): for each stub, walk the import databases
//! in order and bind library, module, and target records. Best-effort —
//! a miss is a warning, not a fatal error, so every failure can be
//! reported in one run.

use crate::import_db::{ImportDatabase, ResolvedImport, TargetKind};
use crate::stub::{Stub, StubTable};
use crate::symbol::Symbol;

/// Demangled display name for diagnostics. `rustc_demangle::demangle` is a
/// no-op on names that aren't C++-mangled, so this is safe to call on
/// every stub symbol, not just the libstdc++-emitted ones.
fn stub_symbol_name(stub: &Stub, symbols: &[Symbol]) -> String {
    stub.symbol
        .map(|idx| rustc_demangle::demangle(&symbols[idx].name).to_string())
        .unwrap_or_else(|| "(unreferenced stub)".to_string())
}

fn resolve_one(
    stub: &mut Stub,
    kind: TargetKind,
    databases: &[Box<dyn ImportDatabase>],
    symbols: &[Symbol],
    stub_type_name: &str,
) -> bool {
    let sym_name = stub_symbol_name(stub, symbols);

    // Find the first database that knows this library, then resolve
    // everything else (module, then function/variable) within that same
    // database — a later database defining a different library under the
    // same NID must never be consulted once one has already won `find_lib`.
    let Some(db) = databases.iter().find(|db| db.find_lib(stub.library_nid).is_some()) else {
        log::warn!(
            "unable to find library with NID {} for {stub_type_name} symbol {sym_name}",
            stub.library_nid
        );
        return false;
    };
    let library_name = db.find_lib(stub.library_nid).unwrap().to_string();

    let Some(module_name) = db.find_module(stub.library_nid, stub.module_nid).map(|s| s.to_string()) else {
        log::warn!(
            "unable to find module with NID {} for {stub_type_name} symbol {sym_name}",
            stub.module_nid
        );
        return false;
    };

    let found_target = match kind {
        TargetKind::Function => db.find_function(stub.library_nid, stub.module_nid, stub.target_nid),
        TargetKind::Variable => db.find_variable(stub.library_nid, stub.module_nid, stub.target_nid),
    };
    if !found_target {
        log::warn!(
            "unable to find {stub_type_name} with NID {} for symbol {sym_name}",
            stub.target_nid
        );
        return false;
    }

    stub.resolution = Some(ResolvedImport {
        library_name,
        module_name,
        target_nid: stub.target_nid,
    });
    true
}

fn resolve_table(
    table: &mut StubTable,
    kind: TargetKind,
    databases: &[Box<dyn ImportDatabase>],
    symbols: &[Symbol],
    stub_type_name: &str,
) -> bool {
    let mut found_all = true;
    for stub in &mut table.stubs {
        if !resolve_one(stub, kind, databases, symbols, stub_type_name) {
            found_all = false;
        }
    }
    found_all
}

/// Resolve every stub in both stub tables against the ordered collection
/// of import databases. Returns whether every stub fully resolved; this
/// propagates to the process exit status (spec §4.7/§6).
pub fn resolve_imports(
    fstubs: &mut StubTable,
    vstubs: &mut StubTable,
    databases: &[Box<dyn ImportDatabase>],
    symbols: &[Symbol],
) -> bool {
    let functions_ok = resolve_table(fstubs, TargetKind::Function, databases, symbols, "function");
    let variables_ok = resolve_table(vstubs, TargetKind::Variable, databases, symbols, "variable");
    functions_ok && variables_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::load_stubs;
    use std::collections::HashMap;

    struct FakeDb {
        libs: HashMap<u32, &'static str>,
        modules: HashMap<(u32, u32), &'static str>,
        functions: HashMap<(u32, u32, u32), ()>,
    }

    impl ImportDatabase for FakeDb {
        fn find_lib(&self, library_nid: u32) -> Option<&str> {
            self.libs.get(&library_nid).copied()
        }
        fn find_module(&self, library_nid: u32, module_nid: u32) -> Option<&str> {
            self.modules.get(&(library_nid, module_nid)).copied()
        }
        fn find_function(&self, library_nid: u32, module_nid: u32, target_nid: u32) -> bool {
            self.functions.contains_key(&(library_nid, module_nid, target_nid))
        }
        fn find_variable(&self, _: u32, _: u32, _: u32) -> bool {
            false
        }
    }

    fn slot() -> [u8; 16] {
        let mut buf = [0u8; 16];
        buf[0..4].copy_from_slice(&1u32.to_le_bytes());
        buf[4..8].copy_from_slice(&2u32.to_le_bytes());
        buf[8..12].copy_from_slice(&3u32.to_le_bytes());
        buf
    }

    #[test]
    fn resolves_when_database_has_entry() {
        let mut table = StubTable {
            section_ndx: 0,
            stubs: load_stubs(0, &slot()),
        };
        let db: Box<dyn ImportDatabase> = Box::new(FakeDb {
            libs: HashMap::from([(1, "SceLibKernel")]),
            modules: HashMap::from([((1, 2), "SceLibKernel")]),
            functions: HashMap::from([((1, 2, 3), ())]),
        });
        let ok = resolve_table(&mut table, TargetKind::Function, &[db], &[], "function");
        assert!(ok);
        assert!(table.stubs[0].resolution.is_some());
    }

    /// Scenario S5: missing library NID produces a warning and overall
    /// failure, but does not abort (the stub is simply left unresolved).
    #[test]
    fn missing_library_is_a_warning_not_a_failure() {
        let mut table = StubTable {
            section_ndx: 0,
            stubs: load_stubs(0, &slot()),
        };
        let db: Box<dyn ImportDatabase> = Box::new(FakeDb {
            libs: HashMap::new(),
            modules: HashMap::new(),
            functions: HashMap::new(),
        });
        let ok = resolve_table(&mut table, TargetKind::Function, &[db], &[], "function");
        assert!(!ok);
        assert!(table.stubs[0].resolution.is_none());
    }

    /// A later database must not be consulted for module/function lookup
    /// once an earlier one has already won `find_lib` for that NID, even
    /// if the later one defines a different library reusing the same NID
    /// and happens to have the requested module/function.
    #[test]
    fn module_lookup_stays_within_the_library_that_won_find_lib() {
        let mut table = StubTable {
            section_ndx: 0,
            stubs: load_stubs(0, &slot()),
        };
        let winning_db: Box<dyn ImportDatabase> = Box::new(FakeDb {
            libs: HashMap::from([(1, "SceLibKernel")]),
            modules: HashMap::new(),
            functions: HashMap::new(),
        });
        let other_db: Box<dyn ImportDatabase> = Box::new(FakeDb {
            libs: HashMap::from([(1, "SceImposterLib")]),
            modules: HashMap::from([((1, 2), "SceImposterLib")]),
            functions: HashMap::from([((1, 2, 3), ())]),
        });
        let ok = resolve_table(
            &mut table,
            TargetKind::Function,
            &[winning_db, other_db],
            &[],
            "function",
        );
        assert!(!ok);
        assert!(table.stubs[0].resolution.is_none());
    }
}
