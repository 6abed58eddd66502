//! Minimal SCE module-info encoder and output-ELF writer (spec §4.9).
//! Spec.md names these as external collaborators specified only by
//! interface (`sce_elf_module_info_encode`, `sce_elf_write_*`); this is a
//! small, real implementation so the orchestrator has something to hand
//! off to and the CLI produces an actual output file end-to-end.

use std::io::Write;
use std::path::Path;

use crate::context::ElfContext;
use crate::stub::StubKind;

/// One resolved (or still-unresolved) import, flattened for encoding.
pub struct ImportEntry {
    pub kind: StubKind,
    pub library_nid: u32,
    pub module_nid: u32,
    pub target_nid: u32,
    pub resolved: bool,
}

/// The synthesized module-info blob: module name, NID-keyed import table,
/// and the entry-point address the console loader jumps to.
pub struct ModuleInfoBlob {
    pub module_name: String,
    pub entry_point: u32,
    pub imports: Vec<ImportEntry>,
}

pub fn encode_module_info(ctx: &ElfContext, _all_resolved: bool) -> ModuleInfoBlob {
    let module_name = ctx
        .elf
        .shdr_strtab
        .get_at(ctx.elf.header.e_shstrndx as usize)
        .unwrap_or("unknown_module")
        .to_string();

    let mut imports = Vec::new();
    for stub in &ctx.fstubs.stubs {
        imports.push(ImportEntry {
            kind: StubKind::Function,
            library_nid: stub.library_nid,
            module_nid: stub.module_nid,
            target_nid: stub.target_nid,
            resolved: stub.resolution.is_some(),
        });
    }
    for stub in &ctx.vstubs.stubs {
        imports.push(ImportEntry {
            kind: StubKind::Variable,
            library_nid: stub.library_nid,
            module_nid: stub.module_nid,
            target_nid: stub.target_nid,
            resolved: stub.resolution.is_some(),
        });
    }

    ModuleInfoBlob {
        module_name,
        entry_point: ctx.elf.header.e_entry as u32,
        imports,
    }
}

/// Serialize the module-info blob as a flat little-endian record: name
/// length + bytes, entry point, import count, then one
/// `(kind, library_nid, module_nid, target_nid, resolved)` tuple per
/// import. This is a Rust-native stand-in for the real `SCE_libstub`/
/// `sce_module_info` on-disk layout; it is not bit-compatible with an
/// actual PS Vita module-info section, only structurally analogous.
fn serialize_module_info(info: &ModuleInfoBlob) -> Vec<u8> {
    let mut buf = Vec::new();
    let name_bytes = info.module_name.as_bytes();
    buf.extend_from_slice(&(name_bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(name_bytes);
    buf.extend_from_slice(&info.entry_point.to_le_bytes());
    buf.extend_from_slice(&(info.imports.len() as u32).to_le_bytes());
    for imp in &info.imports {
        let kind_byte: u8 = match imp.kind {
            StubKind::Function => 0,
            StubKind::Variable => 1,
        };
        buf.push(kind_byte);
        buf.push(imp.resolved as u8);
        buf.extend_from_slice(&imp.library_nid.to_le_bytes());
        buf.extend_from_slice(&imp.module_nid.to_le_bytes());
        buf.extend_from_slice(&imp.target_nid.to_le_bytes());
    }
    buf
}

/// Write the output ELF: the original input bytes followed by an
/// appended `.sceModuleInfo`-equivalent blob. A real SCE encoder rewrites
/// section headers and splices the blob in as its own section; this
/// append-only form is enough to exercise the orchestrator end-to-end
/// without re-implementing `sce_elf_set_headers`.
pub fn write_output_elf(
    ctx: &ElfContext,
    info: &ModuleInfoBlob,
    output_path: &Path,
) -> std::io::Result<()> {
    let mut out = std::fs::File::create(output_path)?;
    out.write_all(ctx.elf_data)?;
    out.write_all(&serialize_module_info(info))?;
    Ok(())
}
