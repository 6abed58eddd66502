//! ELF-to-SCE-module transform engine: parses a statically-linked ARM
//! relocatable ELF, decodes its relocations, links its import/export
//! stub tables to the symbols that reference them, resolves those stubs
//! against one or more NID-keyed import databases, and encodes the
//! result as a loadable module.

pub mod arch;
pub mod context;
pub mod encode;
pub mod error;
pub mod import_db;
pub mod orchestrator;
pub mod reloc;
pub mod resolve;
pub mod segment;
pub mod stub;
pub mod symbol;

pub use context::ElfContext;
pub use error::{ElfReadError, LinkError, OrchestratorError, RelocError};
pub use orchestrator::run;
