use std::fmt;
use std::io;

/// Errors raised while ingesting sections, program headers and the ELF
/// header itself. All fatal: the loader bails on the first one.
#[derive(Debug)]
pub enum ElfReadError {
    Io(io::Error),
    Parse(goblin::error::Error),
    NotArm,
    Not32Bit,
    NotLittleEndian,
    RelaUnsupported,
    DebugInfoPresent(&'static str),
    MissingStubSections,
    MissingSymtab,
    MissingRelocations,
    MultipleSymtab,
    MultipleStubSection(&'static str),
    Reloc(RelocError),
    Link(LinkError),
}

impl fmt::Display for ElfReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElfReadError::Io(e) => write!(f, "I/O error: {e}"),
            ElfReadError::Parse(e) => write!(f, "failed to parse ELF: {e}"),
            ElfReadError::NotArm => write!(f, "input is not an ARM binary"),
            ElfReadError::Not32Bit => write!(f, "input is not a 32-bit ELF"),
            ElfReadError::NotLittleEndian => write!(f, "input is not little-endian"),
            ElfReadError::RelaUnsupported => write!(f, "RELA sections currently unsupported"),
            ElfReadError::DebugInfoPresent(name) => write!(
                f,
                "binary contains debugging information in '{name}'; strip it before linking"
            ),
            ElfReadError::MissingStubSections => write!(
                f,
                "no .vitalink stub sections in binary, probably not a Vita binary"
            ),
            ElfReadError::MissingSymtab => {
                write!(f, "no symbol table in binary, perhaps stripped out")
            }
            ElfReadError::MissingRelocations => write!(
                f,
                "no relocation sections in binary; use -Wl,-q while compiling"
            ),
            ElfReadError::MultipleSymtab => write!(f, "ELF file has multiple symbol tables"),
            ElfReadError::MultipleStubSection(name) => {
                write!(f, "multiple {name} sections in binary")
            }
            ElfReadError::Reloc(e) => write!(f, "{e}"),
            ElfReadError::Link(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ElfReadError {}

impl From<io::Error> for ElfReadError {
    fn from(e: io::Error) -> Self {
        ElfReadError::Io(e)
    }
}

impl From<goblin::error::Error> for ElfReadError {
    fn from(e: goblin::error::Error) -> Self {
        ElfReadError::Parse(e)
    }
}

impl From<RelocError> for ElfReadError {
    fn from(e: RelocError) -> Self {
        ElfReadError::Reloc(e)
    }
}

impl From<LinkError> for ElfReadError {
    fn from(e: LinkError) -> Self {
        ElfReadError::Link(e)
    }
}

/// Errors from relocation decoding (§4.5).
#[derive(Debug)]
pub enum RelocError {
    InvalidType(u32),
    SymbolOutOfRange { symndx: usize, num_symbols: usize },
    TargetSectionMissing(u32),
}

impl fmt::Display for RelocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelocError::InvalidType(t) => write!(f, "invalid relocation type: {t}"),
            RelocError::SymbolOutOfRange {
                symndx,
                num_symbols,
            } => write!(
                f,
                "REL entry tried to access symbol {symndx}, but only {num_symbols} symbols loaded"
            ),
            RelocError::TargetSectionMissing(ndx) => {
                write!(f, "relocation section targets missing section {ndx}")
            }
        }
    }
}

impl std::error::Error for RelocError {}

/// Errors from the stub-symbol linker (§4.6).
#[derive(Debug)]
pub enum LinkError {
    TypeMismatch {
        symbol: String,
        section: u32,
        expected: &'static str,
        actual: &'static str,
    },
    NoMatchingStub {
        symbol: String,
        section: u32,
    },
    DuplicateStub {
        addr: u32,
        section: u32,
        existing: String,
        new: String,
    },
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::TypeMismatch {
                symbol,
                section,
                expected,
                actual,
            } => write!(
                f,
                "global symbol {symbol} in section {section} expected to have type {expected}; instead has type {actual}"
            ),
            LinkError::NoMatchingStub { symbol, section } => write!(
                f,
                "global symbol {symbol} in section {section} not pointing to a valid stub"
            ),
            LinkError::DuplicateStub {
                addr,
                section,
                existing,
                new,
            } => write!(
                f,
                "stub at {addr:#06x} in section {section} has duplicate symbols: {existing}, {new}"
            ),
        }
    }
}

impl std::error::Error for LinkError {}

/// Top-level error produced by the orchestrator (§4.8). Everything that can
/// fail before import resolution composes into this via `From`.
#[derive(Debug)]
pub enum OrchestratorError {
    ElfRead(ElfReadError),
    Reloc(RelocError),
    Link(LinkError),
    ImportDb(io::Error),
    ImportDbParse(serde_json::Error),
    Encode(String),
    Write(io::Error),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorError::ElfRead(e) => write!(f, "{e}"),
            OrchestratorError::Reloc(e) => write!(f, "{e}"),
            OrchestratorError::Link(e) => write!(f, "{e}"),
            OrchestratorError::ImportDb(e) => write!(f, "failed to read import database: {e}"),
            OrchestratorError::ImportDbParse(e) => {
                write!(f, "failed to parse import database: {e}")
            }
            OrchestratorError::Encode(msg) => write!(f, "failed to encode module info: {msg}"),
            OrchestratorError::Write(e) => write!(f, "failed to write output ELF: {e}"),
        }
    }
}

impl std::error::Error for OrchestratorError {}

impl From<ElfReadError> for OrchestratorError {
    fn from(e: ElfReadError) -> Self {
        OrchestratorError::ElfRead(e)
    }
}

impl From<RelocError> for OrchestratorError {
    fn from(e: RelocError) -> Self {
        OrchestratorError::Reloc(e)
    }
}

impl From<LinkError> for OrchestratorError {
    fn from(e: LinkError) -> Self {
        OrchestratorError::Link(e)
    }
}
