//! Relocation loader (spec §4.5): walks each `SHT_REL` section, decodes
//! the in-place instruction word at every entry, and reconstructs the
//! addend that would have been stored directly in a RELA entry.

use crate::arch::armv7::{self, ArmRelocType, Handling};
use crate::error::RelocError;
use crate::symbol::Symbol;

#[derive(Debug, Clone)]
pub struct RelocationEntry {
    pub kind: ArmRelocType,
    pub offset: u32,
    pub symbol: usize,
    pub addend: i32,
}

#[derive(Debug, Default)]
pub struct RelocationTable {
    pub target_ndx: u32,
    pub entries: Vec<RelocationEntry>,
}

/// ELF32 `Elf32_Rel`: `{ r_offset: u32, r_info: u32 }`, 8 bytes, always
/// little-endian for our accepted inputs.
fn iter_rel_entries(data: &[u8]) -> impl Iterator<Item = (u32, u32)> + '_ {
    const REL_ENTSIZE: usize = 8;
    data.chunks_exact(REL_ENTSIZE).map(|chunk| {
        let r_offset = u32::from_le_bytes(chunk[0..4].try_into().unwrap());
        let r_info = u32::from_le_bytes(chunk[4..8].try_into().unwrap());
        (r_offset, r_info)
    })
}

fn r_sym(r_info: u32) -> usize {
    (r_info >> 8) as usize
}

fn r_type(r_info: u32) -> u32 {
    r_info & 0xff
}

/// Decode every entry in one `SHT_REL` section targeting `target_ndx`.
/// `target_section_data` and `target_section_addr` describe the section
/// being patched, used to fetch the in-place instruction word.
pub fn load_rel_table(
    rel_data: &[u8],
    target_ndx: u32,
    target_section_data: &[u8],
    target_section_addr: u32,
    symbols: &[Symbol],
) -> Result<RelocationTable, RelocError> {
    let mut table = RelocationTable {
        target_ndx,
        entries: Vec::new(),
    };

    for (r_offset, r_info) in iter_rel_entries(rel_data) {
        let raw_type = r_type(r_info);

        let Some(kind) = armv7::normalize(raw_type) else {
            return Err(RelocError::InvalidType(raw_type));
        };

        // Emitted by libstdc++; PC-relative and already fully encoded in
        // place. Skip before it is ever classified or decoded.
        if kind == ArmRelocType::R_ARM_THM_PC11 {
            continue;
        }

        match armv7::handling(kind) {
            Handling::Ignore => continue,
            Handling::Invalid => return Err(RelocError::InvalidType(raw_type)),
            Handling::Normal => {}
        }

        let symndx = r_sym(r_info);
        if symndx >= symbols.len() {
            return Err(RelocError::SymbolOutOfRange {
                symndx,
                num_symbols: symbols.len(),
            });
        }

        let insn_off = (r_offset - target_section_addr) as usize;
        let insn = u32::from_le_bytes(
            target_section_data[insn_off..insn_off + 4]
                .try_into()
                .unwrap(),
        );

        let target = armv7::decode_target(kind, insn, r_offset);
        let adjusted = armv7::adjusted_symbol_value(kind, symbols[symndx].value);
        let addend = (target as i64) - (adjusted as i64);

        table.entries.push(RelocationEntry {
            kind,
            offset: r_offset,
            symbol: symndx,
            addend: addend as i32,
        });
    }

    Ok(table)
}
