//! Address-space mapper (spec §4.1): bidirectional mapping between guest
//! virtual addresses, (segment index, offset) pairs, and host addresses in
//! a reserved per-segment placeholder buffer.

use std::io;

use bitflags::bitflags;
use memmap2::MmapMut;

bitflags! {
    /// Program header `p_flags`: readable/writable/executable, as carried
    /// straight from the ELF program header into diagnostics and the SCE
    /// encoder (which needs to know which segments are executable).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SegmentFlags: u32 {
        const EXEC = 1 << 0;
        const WRITE = 1 << 1;
        const READ = 1 << 2;
    }
}

/// Program header type, as far as the mapper cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Load,
    Exidx,
    Other(u32),
}

impl SegmentKind {
    pub fn from_p_type(p_type: u32) -> Self {
        match p_type {
            goblin::elf::program_header::PT_LOAD => SegmentKind::Load,
            // ARM-specific PT_ARM_EXIDX; goblin doesn't export a named
            // constant for it, so we match the raw value from the ARM ELF
            // ABI supplement.
            0x7000_0001 => SegmentKind::Exidx,
            other => SegmentKind::Other(other),
        }
    }
}

/// One program header's worth of address-space bookkeeping. The host
/// placeholder is an anonymous mapping that is never read from; its only
/// purpose is to hand every guest address a unique host pointer so the SCE
/// encoder can do pointer arithmetic uniformly (see DESIGN.md).
pub struct SegmentInfo {
    pub kind: SegmentKind,
    pub vaddr: u32,
    pub memsz: u32,
    pub flags: SegmentFlags,
    host: Option<MmapMut>,
}

impl SegmentInfo {
    pub fn new(kind: SegmentKind, vaddr: u32, memsz: u32, flags: SegmentFlags) -> io::Result<Self> {
        let host = if memsz == 0 {
            None
        } else {
            Some(MmapMut::map_anon(memsz as usize)?)
        };
        Ok(SegmentInfo {
            kind,
            vaddr,
            memsz,
            flags,
            host,
        })
    }

    fn vaddr_top(&self) -> Option<*mut u8> {
        self.host.as_ref().map(|m| m.as_ptr() as *mut u8)
    }

    fn vaddr_bottom(&self) -> Option<*mut u8> {
        self.host
            .as_ref()
            .map(|m| unsafe { (m.as_ptr() as *mut u8).add(m.len()) })
    }

    fn contains_vaddr(&self, a: u32) -> bool {
        a >= self.vaddr && a < self.vaddr.wrapping_add(self.memsz)
    }

    fn contains_host(&self, p: *const u8) -> bool {
        match (self.vaddr_top(), self.vaddr_bottom()) {
            (Some(top), Some(bottom)) => (top as *const u8) <= p && p < (bottom as *const u8),
            _ => false,
        }
    }
}

/// Mapper methods, implemented over a segment slice exactly as spec'd:
/// each is a single linear scan.
pub trait AddressSpaceMapper {
    fn segments(&self) -> &[SegmentInfo];

    fn vaddr_to_host(&self, a: u32) -> Option<*mut u8> {
        for seg in self.segments() {
            if seg.contains_vaddr(a) {
                let top = seg.vaddr_top()?;
                return Some(unsafe { top.add((a - seg.vaddr) as usize) });
            }
        }
        None
    }

    fn host_to_vaddr(&self, p: *const u8) -> u32 {
        if p.is_null() {
            return 0;
        }
        for seg in self.segments() {
            if seg.contains_host(p) {
                let top = seg.vaddr_top().unwrap();
                let delta = p as usize - top as usize;
                return seg.vaddr.wrapping_add(delta as u32);
            }
        }
        0
    }

    fn segoffset_to_host(&self, segndx: usize, offset: u32) -> Option<*mut u8> {
        let seg = self.segments().get(segndx)?;
        if offset < seg.memsz {
            let top = seg.vaddr_top()?;
            Some(unsafe { top.add(offset as usize) })
        } else {
            None
        }
    }

    fn host_to_segoffset(&self, p: *const u8, segndx: usize) -> i32 {
        let Some(seg) = self.segments().get(segndx) else {
            return -1;
        };
        if p.is_null() {
            return 0;
        }
        if seg.contains_host(p) {
            let top = seg.vaddr_top().unwrap();
            (p as usize - top as usize) as i32
        } else {
            -1
        }
    }

    /// Like `vaddr_to_host`, but returns the segment index. Skips `EXIDX`
    /// segments: they shadow `.ARM.extab`/`.ARM.exidx` data that is already
    /// present in a `LOAD` segment, and the loadable one must win.
    fn vaddr_to_segndx(&self, a: u32) -> Option<usize> {
        for (i, seg) in self.segments().iter().enumerate() {
            if seg.kind == SegmentKind::Exidx {
                continue;
            }
            if seg.contains_vaddr(a) {
                return Some(i);
            }
        }
        None
    }

    /// Raw subtraction; does not verify containment.
    fn vaddr_to_segoffset(&self, a: u32, segndx: usize) -> u32 {
        a.wrapping_sub(self.segments()[segndx].vaddr)
    }
}
