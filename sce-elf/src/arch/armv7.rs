//! ARM (32-bit, little-endian) REL decoding — spec §4.5.
//!
//! Mirrors the teacher's per-arch module shape (`arch::x86_64`,
//! `arch::aarch64`): a `#[repr(u32)]` relocation-type enum with explicit
//! discriminants, plus pure decode functions kept apart from the
//! section-walking orchestration in `reloc.rs`.

use int_enum::IntEnum;

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntEnum)]
#[allow(non_camel_case_types)]
pub enum ArmRelocType {
    R_ARM_NONE = 0,
    R_ARM_ABS32 = 2,
    R_ARM_REL32 = 3,
    R_ARM_THM_CALL = 10,
    R_ARM_CALL = 28,
    R_ARM_JUMP24 = 29,
    R_ARM_THM_JUMP24 = 30,
    R_ARM_TARGET1 = 38,
    R_ARM_V4BX = 40,
    R_ARM_TARGET2 = 41,
    R_ARM_PREL31 = 42,
    R_ARM_MOVW_ABS_NC = 43,
    R_ARM_MOVT_ABS = 44,
    R_ARM_THM_MOVW_ABS_NC = 47,
    R_ARM_THM_MOVT_ABS = 48,
    /// Emitted by libstdc++; PC-relative and already fully encoded in
    /// place, so the relocation loader skips it entirely.
    R_ARM_THM_PC11 = 102,
}

type Rt = ArmRelocType;

/// How a relocation type participates in the loader's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling {
    Normal,
    Ignore,
    Invalid,
}

pub fn handling(ty: ArmRelocType) -> Handling {
    match ty {
        Rt::R_ARM_NONE | Rt::R_ARM_V4BX => Handling::Ignore,
        Rt::R_ARM_ABS32
        | Rt::R_ARM_TARGET1
        | Rt::R_ARM_REL32
        | Rt::R_ARM_TARGET2
        | Rt::R_ARM_PREL31
        | Rt::R_ARM_CALL
        | Rt::R_ARM_JUMP24
        | Rt::R_ARM_THM_CALL
        | Rt::R_ARM_MOVW_ABS_NC
        | Rt::R_ARM_MOVT_ABS
        | Rt::R_ARM_THM_MOVW_ABS_NC
        | Rt::R_ARM_THM_MOVT_ABS => Handling::Normal,
        Rt::R_ARM_THM_PC11 => Handling::Invalid, // never reaches here: skipped upstream
    }
}

/// `R_ARM_THM_JUMP24` behaves exactly like `R_ARM_THM_CALL` as far as the
/// target loader is concerned; normalize to the latter so the two are
/// indistinguishable after loading (spec invariant 6). `R_ARM_THM_PC11`
/// is reported so the caller can skip it before it ever reaches
/// `handling`/`decode_target`.
pub fn normalize(raw_type: u32) -> Option<ArmRelocType> {
    let raw_type = if raw_type == Rt::R_ARM_THM_JUMP24 as u32 {
        Rt::R_ARM_THM_CALL as u32
    } else {
        raw_type
    };
    ArmRelocType::try_from(raw_type).ok()
}

/// Byte-swap the two halfwords of a 32-bit Thumb-2 instruction word. The
/// instruction is a pair of 16-bit halfwords in a specific order, but the
/// section data is handed to us in plain little-endian target byte order
/// — missing this swap silently corrupts every Thumb-32 addend.
fn thumb_shuffle(x: u32) -> u32 {
    ((x & 0xFFFF_0000) >> 16) | ((x & 0x0000_FFFF) << 16)
}

/// Decode the target address currently encoded in-place at `offset`,
/// given the raw 32-bit instruction word `data` already read from the
/// section (little-endian). This is the exact inverse of what the SCE
/// loader's relocation encoder will later re-apply; re-encoding
/// `adjusted_symbol_value + addend` must reproduce `data` bit-for-bit
/// (spec invariant 1).
pub fn decode_target(ty: ArmRelocType, data: u32, offset: u32) -> u32 {
    match ty {
        Rt::R_ARM_NONE | Rt::R_ARM_V4BX => 0xdead_beef,
        Rt::R_ARM_ABS32 | Rt::R_ARM_TARGET1 => data,
        Rt::R_ARM_REL32 | Rt::R_ARM_TARGET2 | Rt::R_ARM_PREL31 => data.wrapping_add(offset),
        Rt::R_ARM_CALL | Rt::R_ARM_JUMP24 => {
            // Sign-extend a 24-bit branch offset: shift the 24-bit field
            // up into the top of a 32-bit word, add, then arithmetic-shift
            // back down. `<<8` then `>>8` (arithmetic) is the standard
            // idiom for 26-bit sign extension here.
            let imm = ((data & 0x00FF_FFFF) << 2).wrapping_add(offset);
            (((imm as i32) << 8) >> 8) as u32
        }
        Rt::R_ARM_THM_CALL => {
            let data = thumb_shuffle(data);
            let upper = data >> 16;
            let lower = data & 0xFFFF;
            let sign = (upper >> 10) & 1;
            let j1 = (lower >> 13) & 1;
            let j2 = (lower >> 11) & 1;
            let imm10 = upper & 0x3FF;
            let imm11 = lower & 0x7FF;
            let i1 = u32::from(!(j1 ^ sign) != 0);
            let i2 = u32::from(!(j2 ^ sign) != 0);
            let imm = imm11 | (imm10 << 11) | (i2 << 21) | (i1 << 22) | (sign << 23);
            let signed = (imm << 1) | if sign != 0 { 0xFF00_0000 } else { 0 };
            offset.wrapping_add(signed)
        }
        Rt::R_ARM_MOVW_ABS_NC => ((data & 0xF_0000) >> 4) | (data & 0xFFF),
        Rt::R_ARM_MOVT_ABS => (((data & 0xF_0000) >> 4) | (data & 0xFFF)) << 16,
        Rt::R_ARM_THM_MOVW_ABS_NC => {
            let data = thumb_shuffle(data);
            (((data >> 16) & 0xF) << 12)
                | (((data >> 26) & 0x1) << 11)
                | (((data >> 12) & 0x7) << 8)
                | (data & 0xFF)
        }
        Rt::R_ARM_THM_MOVT_ABS => {
            let data = thumb_shuffle(data);
            (((data >> 16) & 0xF) << 28)
                | (((data >> 26) & 0x1) << 27)
                | (((data >> 12) & 0x7) << 24)
                | ((data & 0xFF) << 16)
        }
        Rt::R_ARM_THM_PC11 => unreachable!("R_ARM_THM_PC11 is skipped before decoding"),
    }
}

/// The adjustment subtracted from the decoded target to recover the
/// addend, per spec §4.5 step 6.
pub fn adjusted_symbol_value(ty: ArmRelocType, symbol_value: u32) -> u32 {
    match ty {
        Rt::R_ARM_MOVT_ABS | Rt::R_ARM_THM_MOVT_ABS => symbol_value & 0xFFFF_0000,
        Rt::R_ARM_MOVW_ABS_NC | Rt::R_ARM_THM_MOVW_ABS_NC => symbol_value & 0x0000_FFFF,
        Rt::R_ARM_THM_CALL => symbol_value & 0xFFFF_FFFE,
        _ => symbol_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thm_jump24_normalizes_to_thm_call() {
        assert_eq!(
            normalize(Rt::R_ARM_THM_JUMP24 as u32),
            Some(Rt::R_ARM_THM_CALL)
        );
    }

    #[test]
    fn unknown_type_fails_to_normalize() {
        assert_eq!(normalize(9999), None);
    }

    /// Scenario S1: a BL to self-4, symbol's Thumb bit set.
    #[test]
    fn thumb_bl_addend() {
        let data = u32::from_le_bytes([0xFF, 0xF7, 0xFE, 0xFF]);
        let offset = 0x81000;
        let target = decode_target(Rt::R_ARM_THM_CALL, data, offset);
        assert_eq!(target, 0x80FFC);
        let sym_value = 0x81001u32;
        let adj = adjusted_symbol_value(Rt::R_ARM_THM_CALL, sym_value);
        assert_eq!(adj, 0x81000);
        let addend = (target as i64) - (adj as i64);
        assert_eq!(addend, -6);
    }

    /// Scenario S2: MOVW/MOVT pair referencing the same symbol.
    #[test]
    fn movw_movt_pair_addends_are_zero() {
        let sym_value = 0xDEADBEEFu32;

        // movw encoding for immediate 0xBEEF: imm4=0xB, imm12=0xEEF
        let movw_data = (0xB << 16) | 0xEEF;
        let movw_target = decode_target(Rt::R_ARM_MOVW_ABS_NC, movw_data, 0);
        assert_eq!(movw_target, 0xBEEF);
        let adj = adjusted_symbol_value(Rt::R_ARM_MOVW_ABS_NC, sym_value);
        assert_eq!(movw_target as i64 - adj as i64, 0);

        // movt encoding for immediate 0xDEAD: imm4=0xD, imm12=0xEAD
        let movt_data = (0xD << 16) | 0xEAD;
        let movt_target = decode_target(Rt::R_ARM_MOVT_ABS, movt_data, 0);
        assert_eq!(movt_target, 0xDEAD_0000);
        let adj = adjusted_symbol_value(Rt::R_ARM_MOVT_ABS, sym_value);
        assert_eq!(movt_target as i64 - adj as i64, 0);
    }

    /// Scenario S3: plain ABS32.
    #[test]
    fn abs32_addend() {
        let target = decode_target(Rt::R_ARM_ABS32, 0x0000_8000, 0);
        let adj = adjusted_symbol_value(Rt::R_ARM_ABS32, 0x7000);
        assert_eq!(target as i64 - adj as i64, 0x1000);
    }

    #[test]
    fn thm_pc11_has_no_handling_normal_path() {
        // R_ARM_THM_PC11 is filtered out before `handling` is consulted;
        // this test documents that it must never be classified Normal.
        assert_ne!(handling(Rt::R_ARM_THM_PC11), Handling::Normal);
    }

    #[test]
    fn none_and_v4bx_are_ignored() {
        assert_eq!(handling(Rt::R_ARM_NONE), Handling::Ignore);
        assert_eq!(handling(Rt::R_ARM_V4BX), Handling::Ignore);
    }
}
