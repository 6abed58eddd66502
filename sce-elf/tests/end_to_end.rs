//! End-to-end tests building a minimal ARM relocatable ELF in memory and
//! running it through the full load -> resolve -> encode -> write pipeline.

use std::io::Write;

use goblin::elf::header::{EM_ARM, EI_DATA, ELFDATA2LSB, EI_CLASS, ELFCLASS32};

/// Builds the smallest ARM32 ET_REL ELF the loader will accept: an ELF
/// header, one `.text` PROGBITS section holding four NOP-equivalent
/// bytes, one `.vitalink.fstubs` section with a single stub slot, one
/// `.symtab`/`.strtab` pair naming the stub's GLOBAL FUNC symbol, and one
/// `SHT_REL` section applying an `R_ARM_ABS32` relocation to `.text`, plus
/// one `PT_LOAD` program header covering both sections.
///
/// This intentionally duplicates none of `sce_elf`'s own parsing logic;
/// it is assembled byte-by-byte against the ELF32 spec so the test is an
/// independent check of the loader, not a mirror of it.
struct ElfBuilder;

impl ElfBuilder {
    fn build() -> Vec<u8> {
        // Layout (all offsets chosen by hand, 4-byte aligned):
        //   0x00 ELF header (52 bytes)
        //   0x34 .text (4 bytes)
        //   0x38 .vitalink.fstubs (16 bytes)
        //   0x48 .rel.text (8 bytes)
        //   0x50 .symtab (2 entries * 16 bytes = 32 bytes)
        //   0x70 .strtab
        //   ...  .shstrtab
        //   ...  section header table
        //   ...  program header table

        let ehsize = 52usize;
        let text_off = ehsize;
        let text_data = [0u8; 4];

        let fstubs_off = text_off + text_data.len();
        let mut fstubs_data = [0u8; 16];
        fstubs_data[0..4].copy_from_slice(&1u32.to_le_bytes()); // library_nid
        fstubs_data[4..8].copy_from_slice(&2u32.to_le_bytes()); // module_nid
        fstubs_data[8..12].copy_from_slice(&3u32.to_le_bytes()); // target_nid

        let rel_off = fstubs_off + fstubs_data.len();
        // One Elf32_Rel: r_offset = vaddr of .text, r_info = (symndx<<8)|type
        let text_vaddr = 0x1000u32;
        let symndx = 1u32; // symtab[0] is the null entry
        let r_type = 2u32; // R_ARM_ABS32
        let mut rel_data = [0u8; 8];
        rel_data[0..4].copy_from_slice(&text_vaddr.to_le_bytes());
        rel_data[4..8].copy_from_slice(&((symndx << 8) | r_type).to_le_bytes());

        let symtab_off = rel_off + rel_data.len();
        // strtab: \0 then "my_stub\0"
        let strtab = b"\0my_stub\0";
        let name_off_in_strtab = 1u32;

        let mut symtab_data = Vec::new();
        // null symbol
        symtab_data.extend_from_slice(&[0u8; 16]);
        // GLOBAL FUNC symbol pointing at fstubs section, value = fstubs vaddr
        let fstubs_vaddr = 0x2000u32;
        let fstubs_shndx = 2u16; // section index, filled in below
        let mut sym1 = [0u8; 16];
        sym1[0..4].copy_from_slice(&name_off_in_strtab.to_le_bytes());
        sym1[4..8].copy_from_slice(&fstubs_vaddr.to_le_bytes()); // st_value
        sym1[8..12].copy_from_slice(&0u32.to_le_bytes()); // st_size
        sym1[12] = (1 << 4) | 2; // st_info: bind=GLOBAL(1), type=FUNC(2)
        sym1[13] = 0; // st_other
        sym1[14..16].copy_from_slice(&fstubs_shndx.to_le_bytes());
        symtab_data.extend_from_slice(&sym1);

        let strtab_off = symtab_off + symtab_data.len();

        let shstrtab_off = strtab_off + strtab.len();
        // shstrtab: \0 .text\0 .vitalink.fstubs\0 .rel.text\0 .symtab\0 .strtab\0 .shstrtab\0
        let mut shstrtab = vec![0u8];
        let text_name = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".text\0");
        let fstubs_name = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".vitalink.fstubs\0");
        let rel_name = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".rel.text\0");
        let symtab_name = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".symtab\0");
        let strtab_name = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".strtab\0");
        let shstrtab_name = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".shstrtab\0");

        let shoff = shstrtab_off + shstrtab.len();
        let phoff = shoff; // program headers right after; no section data overlap needed

        // Section header indices: 0=null, 1=.text, 2=.vitalink.fstubs,
        // 3=.rel.text, 4=.symtab, 5=.strtab, 6=.shstrtab
        const SHT_NULL: u32 = 0;
        const SHT_PROGBITS: u32 = 1;
        const SHT_SYMTAB: u32 = 2;
        const SHT_STRTAB: u32 = 3;
        const SHT_REL: u32 = 9;

        let mut shdrs = Vec::new();
        shdrs.push(shdr(0, SHT_NULL, 0, 0, 0, 0, 0, 0));
        shdrs.push(shdr(text_name, SHT_PROGBITS, text_vaddr, text_off as u32, text_data.len() as u32, 0, 0, 4));
        shdrs.push(shdr(fstubs_name, SHT_PROGBITS, fstubs_vaddr, fstubs_off as u32, fstubs_data.len() as u32, 0, 0, 4));
        shdrs.push(shdr(rel_name, SHT_REL, 0, rel_off as u32, rel_data.len() as u32, 4 /* sh_link=symtab */, 1 /* sh_info=target .text */, 4));
        shdrs.push(shdr(symtab_name, SHT_SYMTAB, 0, symtab_off as u32, symtab_data.len() as u32, 5 /* sh_link=strtab */, 1, 4));
        shdrs.push(shdr(strtab_name, SHT_STRTAB, 0, strtab_off as u32, strtab.len() as u32, 0, 0, 1));
        shdrs.push(shdr(shstrtab_name, SHT_STRTAB, 0, shstrtab_off as u32, shstrtab.len() as u32, 0, 0, 1));

        const PT_LOAD: u32 = 1;
        let mut phdrs = Vec::new();
        phdrs.push(phdr(PT_LOAD, text_off as u32, text_vaddr, (fstubs_off - text_off + fstubs_data.len()) as u32));

        let mut buf = Vec::new();
        buf.extend_from_slice(&elf_header(
            ehsize as u16,
            phoff as u32,
            phdrs.len() as u16,
            shoff as u32,
            shdrs.len() as u16,
            6, // e_shstrndx
        ));
        buf.extend_from_slice(&text_data);
        buf.extend_from_slice(&fstubs_data);
        buf.extend_from_slice(&rel_data);
        buf.extend_from_slice(&symtab_data);
        buf.extend_from_slice(&strtab);
        buf.extend_from_slice(&shstrtab);
        for p in &phdrs {
            buf.extend_from_slice(p);
        }
        for s in &shdrs {
            buf.extend_from_slice(s);
        }
        buf
    }
}

fn elf_header(ehsize: u16, phoff: u32, phnum: u16, shoff: u32, shnum: u16, shstrndx: u16) -> Vec<u8> {
    let mut h = vec![0u8; ehsize as usize];
    h[0..4].copy_from_slice(&[0x7f, b'E', b'L', b'F']);
    h[EI_CLASS] = ELFCLASS32;
    h[EI_DATA] = ELFDATA2LSB;
    h[6] = 1; // EI_VERSION
    h[16..18].copy_from_slice(&1u16.to_le_bytes()); // e_type = ET_REL
    h[18..20].copy_from_slice(&(EM_ARM as u16).to_le_bytes());
    h[20..24].copy_from_slice(&1u32.to_le_bytes()); // e_version
    h[24..28].copy_from_slice(&0u32.to_le_bytes()); // e_entry
    h[28..32].copy_from_slice(&phoff.to_le_bytes());
    h[32..36].copy_from_slice(&shoff.to_le_bytes());
    h[36..40].copy_from_slice(&0u32.to_le_bytes()); // e_flags
    h[40..42].copy_from_slice(&ehsize.to_le_bytes());
    h[42..44].copy_from_slice(&32u16.to_le_bytes()); // e_phentsize
    h[44..46].copy_from_slice(&phnum.to_le_bytes());
    h[46..48].copy_from_slice(&40u16.to_le_bytes()); // e_shentsize
    h[48..50].copy_from_slice(&shnum.to_le_bytes());
    h[50..52].copy_from_slice(&shstrndx.to_le_bytes());
    h
}

#[allow(clippy::too_many_arguments)]
fn shdr(
    name: u32,
    sh_type: u32,
    addr: u32,
    offset: u32,
    size: u32,
    link: u32,
    info: u32,
    align: u32,
) -> Vec<u8> {
    let mut s = vec![0u8; 40];
    s[0..4].copy_from_slice(&name.to_le_bytes());
    s[4..8].copy_from_slice(&sh_type.to_le_bytes());
    s[8..12].copy_from_slice(&0u32.to_le_bytes()); // sh_flags
    s[12..16].copy_from_slice(&addr.to_le_bytes());
    s[16..20].copy_from_slice(&offset.to_le_bytes());
    s[20..24].copy_from_slice(&size.to_le_bytes());
    s[24..28].copy_from_slice(&link.to_le_bytes());
    s[28..32].copy_from_slice(&info.to_le_bytes());
    s[32..36].copy_from_slice(&align.to_le_bytes());
    s[36..40].copy_from_slice(&0u32.to_le_bytes()); // sh_entsize
    s
}

fn phdr(p_type: u32, offset: u32, vaddr: u32, filesz: u32) -> Vec<u8> {
    let mut p = vec![0u8; 32];
    p[0..4].copy_from_slice(&p_type.to_le_bytes());
    p[4..8].copy_from_slice(&offset.to_le_bytes());
    p[8..12].copy_from_slice(&vaddr.to_le_bytes());
    p[12..16].copy_from_slice(&vaddr.to_le_bytes()); // p_paddr
    p[16..20].copy_from_slice(&filesz.to_le_bytes());
    p[20..24].copy_from_slice(&filesz.to_le_bytes()); // p_memsz
    p[24..28].copy_from_slice(&6u32.to_le_bytes()); // p_flags RW
    p[28..32].copy_from_slice(&4u32.to_le_bytes()); // p_align
    p
}

fn write_temp_elf() -> std::path::PathBuf {
    let bytes = ElfBuilder::build();
    let mut path = std::env::temp_dir();
    path.push(format!("sce-elf-e2e-{}.elf", std::process::id()));
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(&bytes).unwrap();
    path
}

#[test]
fn loads_minimal_relocatable_and_links_stub() {
    let path = write_temp_elf();
    let ctx = sce_elf::ElfContext::load(&path).expect("loads");
    std::fs::remove_file(&path).ok();

    assert_eq!(ctx.fstubs.stubs.len(), 1);
    assert_eq!(ctx.fstubs.stubs[0].symbol, Some(1));
    assert_eq!(ctx.reloc_tables.len(), 1);
    assert_eq!(ctx.reloc_tables[0].entries.len(), 1);
}

#[test]
fn unresolved_imports_still_produce_output() {
    let path = write_temp_elf();
    let mut ctx = sce_elf::ElfContext::load(&path).expect("loads");
    std::fs::remove_file(&path).ok();

    let databases: Vec<Box<dyn sce_elf::import_db::ImportDatabase>> = Vec::new();
    let all_resolved = sce_elf::resolve::resolve_imports(
        &mut ctx.fstubs,
        &mut ctx.vstubs,
        &databases,
        &ctx.symbols,
    );
    assert!(!all_resolved);

    let info = sce_elf::encode::encode_module_info(&ctx, all_resolved);
    assert_eq!(info.imports.len(), 1);
    assert!(!info.imports[0].resolved);

    let mut out_path = std::env::temp_dir();
    out_path.push(format!("sce-elf-e2e-out-{}.bin", std::process::id()));
    sce_elf::encode::write_output_elf(&ctx, &info, &out_path).expect("writes");
    let written = std::fs::metadata(&out_path).unwrap();
    assert!(written.len() > 0);
    std::fs::remove_file(&out_path).ok();
}
