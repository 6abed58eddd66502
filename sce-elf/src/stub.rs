//! Stub loader (spec §4.3) and stub-symbol linker (spec §4.6).

use crate::error::LinkError;
use crate::symbol::{Symbol, SymbolBind, SymbolType};

pub const STUB_SLOT_SIZE: usize = 16;

/// One 16-byte stub slot: `[library_nid][module_nid][target_nid][reserved]`,
/// all little-endian. `symbol` and `resolution` are late-bound, written
/// exactly once by the linker and the import resolver respectively.
#[derive(Debug, Clone)]
pub struct Stub {
    pub addr: u32,
    pub library_nid: u32,
    pub module_nid: u32,
    pub target_nid: u32,
    pub symbol: Option<usize>,
    pub resolution: Option<crate::import_db::ResolvedImport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubKind {
    Function,
    Variable,
}

impl StubKind {
    pub fn section_name(&self) -> &'static str {
        match self {
            StubKind::Function => ".vitalink.fstubs",
            StubKind::Variable => ".vitalink.vstubs",
        }
    }

    pub fn expected_symbol_type(&self) -> SymbolType {
        match self {
            StubKind::Function => SymbolType::Func,
            StubKind::Variable => SymbolType::Object,
        }
    }
}

#[derive(Debug, Default)]
pub struct StubTable {
    pub section_ndx: u32,
    pub stubs: Vec<Stub>,
}

/// Parse `data` (the raw bytes of a `.vitalink.{f,v}stubs` section) as a
/// contiguous array of 16-byte slots. `sh_addr` is the section's guest
/// address; each stub's `addr` is `sh_addr + 16*i`.
pub fn load_stubs(sh_addr: u32, data: &[u8]) -> StubTable {
    let num_slots = data.len() / STUB_SLOT_SIZE;
    let mut stubs = Vec::with_capacity(num_slots);
    for i in 0..num_slots {
        let slot = &data[i * STUB_SLOT_SIZE..(i + 1) * STUB_SLOT_SIZE];
        let library_nid = u32::from_le_bytes(slot[0..4].try_into().unwrap());
        let module_nid = u32::from_le_bytes(slot[4..8].try_into().unwrap());
        let target_nid = u32::from_le_bytes(slot[8..12].try_into().unwrap());
        stubs.push(Stub {
            addr: sh_addr.wrapping_add((i * STUB_SLOT_SIZE) as u32),
            library_nid,
            module_nid,
            target_nid,
            symbol: None,
            resolution: None,
        });
    }
    stubs
}

/// Demangled display form of an ELF symbol name for error messages. A
/// no-op on names that aren't C++-mangled.
fn demangled(name: &str) -> String {
    rustc_demangle::demangle(name).to_string()
}

/// Bind every GLOBAL FUNC/OBJECT symbol whose `shndx` is this stub
/// section's index to its containing stub slot. Fatal on type mismatch,
/// no-match, or a duplicate binding on one slot (spec §4.6, Open
/// Question: first writer wins, second offender is named in the error).
pub fn link_stub_symbols(
    table: &mut StubTable,
    kind: StubKind,
    symbols: &[Symbol],
) -> Result<(), LinkError> {
    let expected = kind.expected_symbol_type();
    for (symndx, sym) in symbols.iter().enumerate() {
        if sym.bind != SymbolBind::Global {
            continue;
        }
        if !matches!(sym.sym_type, SymbolType::Func | SymbolType::Object) {
            continue;
        }
        if sym.shndx != table.section_ndx {
            continue;
        }
        if sym.sym_type != expected {
            return Err(LinkError::TypeMismatch {
                symbol: demangled(&sym.name),
                section: table.section_ndx,
                expected: expected.name(),
                actual: sym.sym_type.name(),
            });
        }

        let Some(stub) = table.stubs.iter_mut().find(|s| s.addr == sym.value) else {
            return Err(LinkError::NoMatchingStub {
                symbol: demangled(&sym.name),
                section: table.section_ndx,
            });
        };

        if let Some(existing_idx) = stub.symbol {
            return Err(LinkError::DuplicateStub {
                addr: stub.addr,
                section: table.section_ndx,
                existing: demangled(&symbols[existing_idx].name),
                new: demangled(&sym.name),
            });
        }

        stub.symbol = Some(symndx);
    }
    Ok(())
}
