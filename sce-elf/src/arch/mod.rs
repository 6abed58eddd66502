//! Per-architecture relocation decoding, mirroring the shape the teacher
//! crate gives `arch::{x86_64, aarch64, riscv64}`: one module per target,
//! each exposing a relocation-type enum and a pure decode function kept
//! apart from the section-walking orchestration in `reloc.rs`.

pub mod armv7;

pub use armv7::{ArmRelocType, Handling};
