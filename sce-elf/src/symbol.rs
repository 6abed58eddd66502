//! Symbol-table loader (spec §4.4): materializes a dense, index-addressable
//! symbol array from the ELF symbol table.

use crate::error::ElfReadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolType {
    NoType,
    Object,
    Func,
    Section,
    File,
    Other(u8),
}

impl SymbolType {
    pub fn from_elf(st_type: u8) -> Self {
        use goblin::elf::sym::*;
        match st_type {
            STT_NOTYPE => SymbolType::NoType,
            STT_OBJECT => SymbolType::Object,
            STT_FUNC => SymbolType::Func,
            STT_SECTION => SymbolType::Section,
            STT_FILE => SymbolType::File,
            other => SymbolType::Other(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SymbolType::NoType => "NOTYPE",
            SymbolType::Object => "OBJECT",
            SymbolType::Func => "FUNC",
            SymbolType::Section => "SECTION",
            SymbolType::File => "FILE",
            SymbolType::Other(_) => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolBind {
    Local,
    Global,
    Weak,
    Other(u8),
}

impl SymbolBind {
    pub fn from_elf(st_bind: u8) -> Self {
        use goblin::elf::sym::*;
        match st_bind {
            STB_LOCAL => SymbolBind::Local,
            STB_GLOBAL => SymbolBind::Global,
            STB_WEAK => SymbolBind::Weak,
            other => SymbolBind::Other(other),
        }
    }
}

/// A single ELF symbol-table entry. `name` is copied out of the string
/// table at load time (see DESIGN.md) rather than borrowed, so `Symbol`
/// does not need to carry the ELF parser's lifetime.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub value: u32,
    pub sym_type: SymbolType,
    pub bind: SymbolBind,
    pub shndx: u32,
}

/// Load every entry out of `sym_section`'s data into a dense `Vec<Symbol>`.
/// Called at most once per ELF context; a second `SHT_SYMTAB` is fatal.
pub fn load_symbols(elf: &goblin::elf::Elf<'_>) -> Result<Vec<Symbol>, ElfReadError> {
    let mut out = Vec::with_capacity(elf.syms.len());
    for sym in elf.syms.iter() {
        let name = elf.strtab.get_at(sym.st_name).unwrap_or("").to_string();
        out.push(Symbol {
            name,
            value: sym.st_value as u32,
            sym_type: SymbolType::from_elf(sym.st_type()),
            bind: SymbolBind::from_elf(sym.st_bind()),
            shndx: sym.st_shndx as u32,
        });
    }
    Ok(out)
}
