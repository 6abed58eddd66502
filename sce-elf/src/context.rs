//! ELF context: the root aggregate (spec §3) and the ELF reader (spec
//! §4.2) that populates it.

use std::fs::File;
use std::path::Path;

use goblin::elf::Elf;
use goblin::elf::header::EM_ARM;
use goblin::elf::section_header::{SHT_PROGBITS, SHT_REL, SHT_RELA, SHT_SYMTAB};
use memmap2::Mmap;

use crate::error::{ElfReadError, LinkError, RelocError};
use crate::reloc::{self, RelocationTable};
use crate::segment::{AddressSpaceMapper, SegmentFlags, SegmentInfo, SegmentKind};
use crate::stub::{self, StubKind, StubTable};
use crate::symbol::{self, Symbol};

const DEBUG_RELOC_SECTIONS: &[&str] = &[
    ".rel.debug_info",
    ".rel.debug_arange",
    ".rel.debug_line",
    ".rel.debug_frame",
];

/// The populated ELF model handed from the reader to the stub-symbol
/// linker, the import resolver, and finally the SCE encoder.
pub struct ElfContext {
    /// Keeps the mmap (and the bytes `elf` borrows from) alive for the
    /// whole lifetime of the context.
    _mmap: Mmap,
    pub elf_data: &'static [u8],
    pub elf: Elf<'static>,
    pub segments: Vec<SegmentInfo>,
    pub symbols: Vec<Symbol>,
    pub reloc_tables: Vec<RelocationTable>,
    pub fstubs: StubTable,
    pub vstubs: StubTable,
}

impl AddressSpaceMapper for ElfContext {
    fn segments(&self) -> &[SegmentInfo] {
        &self.segments
    }
}

impl ElfContext {
    /// Open `path`, validate it, and run the whole load pipeline: ELF
    /// reader → {symbol loader, stub loader, relocation loader} →
    /// stub-symbol linker (spec §2 data flow).
    pub fn load(path: &Path) -> Result<Self, ElfReadError> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        // SAFETY: `_mmap` is stored alongside `elf`/`elf_data` in this
        // struct and is never replaced or truncated, so the 'static
        // borrow below is valid for exactly as long as `ElfContext` is
        // alive (`elf`/`elf_data` never escape the struct without it).
        let elf_data: &'static [u8] = unsafe { std::mem::transmute(&mmap[..]) };

        let elf = Elf::parse(elf_data)?;

        if elf.header.e_machine != EM_ARM {
            return Err(ElfReadError::NotArm);
        }
        if elf.is_64 {
            return Err(ElfReadError::Not32Bit);
        }
        if !elf.little_endian {
            return Err(ElfReadError::NotLittleEndian);
        }

        let symbols = symbol::load_symbols(&elf)?;

        let mut fstubs = StubTable::default();
        let mut vstubs = StubTable::default();
        let mut fstubs_seen = false;
        let mut vstubs_seen = false;
        let mut symtab_seen = false;
        let mut reloc_tables = Vec::new();

        for (ndx, shdr) in elf.section_headers.iter().enumerate() {
            let name = elf.shdr_strtab.get_at(shdr.sh_name).unwrap_or("");

            if let Some(&debug_name) = DEBUG_RELOC_SECTIONS.iter().find(|&&n| n == name) {
                return Err(ElfReadError::DebugInfoPresent(debug_name));
            }

            if shdr.sh_type == SHT_PROGBITS && name == StubKind::Function.section_name() {
                if fstubs_seen {
                    return Err(ElfReadError::MultipleStubSection(
                        StubKind::Function.section_name(),
                    ));
                }
                fstubs_seen = true;
                let data = section_bytes(elf_data, shdr);
                fstubs = StubTable {
                    section_ndx: ndx as u32,
                    stubs: stub::load_stubs(shdr.sh_addr as u32, data),
                };
            } else if shdr.sh_type == SHT_PROGBITS && name == StubKind::Variable.section_name() {
                if vstubs_seen {
                    return Err(ElfReadError::MultipleStubSection(
                        StubKind::Variable.section_name(),
                    ));
                }
                vstubs_seen = true;
                let data = section_bytes(elf_data, shdr);
                vstubs = StubTable {
                    section_ndx: ndx as u32,
                    stubs: stub::load_stubs(shdr.sh_addr as u32, data),
                };
            } else if shdr.sh_type == SHT_SYMTAB {
                if symtab_seen {
                    return Err(ElfReadError::MultipleSymtab);
                }
                symtab_seen = true;
            } else if shdr.sh_type == SHT_RELA {
                log::error!("unsupported RELA section '{name}'");
                return Err(ElfReadError::RelaUnsupported);
            } else if shdr.sh_type == SHT_REL {
                let target_ndx = shdr.sh_info;
                let Some(target_shdr) = elf.section_headers.get(target_ndx as usize) else {
                    return Err(ElfReadError::Reloc(RelocError::TargetSectionMissing(
                        target_ndx,
                    )));
                };
                let rel_data = section_bytes(elf_data, shdr);
                let target_data = section_bytes(elf_data, target_shdr);
                let table = reloc::load_rel_table(
                    rel_data,
                    target_ndx,
                    target_data,
                    target_shdr.sh_addr as u32,
                    &symbols,
                )?;
                reloc_tables.push(table);
            }
        }

        if !fstubs_seen && !vstubs_seen {
            return Err(ElfReadError::MissingStubSections);
        }
        if !symtab_seen {
            return Err(ElfReadError::MissingSymtab);
        }
        if reloc_tables.is_empty() {
            return Err(ElfReadError::MissingRelocations);
        }

        if fstubs_seen {
            link_stubs(&mut fstubs, StubKind::Function, &symbols)?;
        }
        if vstubs_seen {
            link_stubs(&mut vstubs, StubKind::Variable, &symbols)?;
        }

        let mut segments = Vec::with_capacity(elf.program_headers.len());
        for phdr in &elf.program_headers {
            let kind = SegmentKind::from_p_type(phdr.p_type);
            let flags = SegmentFlags::from_bits_truncate(phdr.p_flags);
            segments.push(SegmentInfo::new(
                kind,
                phdr.p_vaddr as u32,
                phdr.p_memsz as u32,
                flags,
            )?);
        }

        Ok(ElfContext {
            _mmap: mmap,
            elf_data,
            elf,
            segments,
            symbols,
            reloc_tables,
            fstubs,
            vstubs,
        })
    }
}

fn section_bytes<'a>(elf_data: &'a [u8], shdr: &goblin::elf::SectionHeader) -> &'a [u8] {
    if shdr.sh_type == goblin::elf::section_header::SHT_NOBITS {
        return &[];
    }
    let start = shdr.sh_offset as usize;
    let end = start + shdr.sh_size as usize;
    &elf_data[start..end]
}

fn link_stubs(
    table: &mut StubTable,
    kind: StubKind,
    symbols: &[Symbol],
) -> Result<(), LinkError> {
    stub::link_stub_symbols(table, kind, symbols)
}
