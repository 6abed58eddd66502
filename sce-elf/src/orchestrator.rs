//! Orchestrator (spec §4.8): wires the ELF reader, import resolver, and
//! SCE encoder/writer into the single pipeline the CLI calls.

use std::path::{Path, PathBuf};

use crate::context::ElfContext;
use crate::encode;
use crate::error::OrchestratorError;
use crate::import_db::{ImportDatabase, JsonImportDb};
use crate::resolve;

/// Default import-database file names looked up next to the running
/// executable, mirroring the original tool's per-OS "next to argv[0]"
/// search with `std::env::current_exe()` standing in for the
/// platform-specific executable-path lookups.
const DEFAULT_DB_NAMES: &[&str] = &["db.json", "additional.json"];

fn default_db_paths() -> Vec<PathBuf> {
    let Ok(exe) = std::env::current_exe() else {
        return Vec::new();
    };
    let Some(dir) = exe.parent() else {
        return Vec::new();
    };
    DEFAULT_DB_NAMES
        .iter()
        .map(|name| dir.join(name))
        .filter(|p| p.exists())
        .collect()
}

/// Run the whole pipeline: load and validate `input_path`, resolve
/// imports against the default databases plus every path in
/// `extra_db_paths` (searched in that order, defaults first), encode the
/// module-info blob, and write it to `output_path`.
///
/// Returns `Ok(true)` if every import resolved, `Ok(false)` if the output
/// was still written but some imports are unresolved (spec §6 exit-code
/// contract), or `Err` on a fatal failure before an output could be
/// produced.
pub fn run(
    input_path: &Path,
    output_path: &Path,
    extra_db_paths: &[PathBuf],
) -> Result<bool, OrchestratorError> {
    let mut ctx = ElfContext::load(input_path)?;

    let mut db_paths = default_db_paths();
    db_paths.extend(extra_db_paths.iter().cloned());

    let mut databases: Vec<Box<dyn ImportDatabase>> = Vec::with_capacity(db_paths.len());
    for path in &db_paths {
        let db = JsonImportDb::load(path).map_err(|e| match e {
            crate::import_db::ImportDbError::Io(io_err) => OrchestratorError::ImportDb(io_err),
            crate::import_db::ImportDbError::Parse(json_err) => {
                OrchestratorError::ImportDbParse(json_err)
            }
        })?;
        databases.push(Box::new(db));
    }
    if databases.is_empty() {
        log::warn!("no import databases found; every stub will be left unresolved");
    }

    let all_resolved = resolve::resolve_imports(
        &mut ctx.fstubs,
        &mut ctx.vstubs,
        &databases,
        &ctx.symbols,
    );

    let info = encode::encode_module_info(&ctx, all_resolved);
    encode::write_output_elf(&ctx, &info, output_path).map_err(OrchestratorError::Write)?;

    if !all_resolved {
        log::warn!("output written to {} with unresolved imports", output_path.display());
    }

    Ok(all_resolved)
}
