//! Import database (spec §4.7a): the concrete, JSON-backed implementation
//! of the external-collaborator interface spec.md names only as
//! `find_lib` / `find_module` / `find_function` / `find_variable`.
//!
//! The on-disk shape mirrors what `vitasdk`-style `db.json` import
//! databases look like: a nested map from library name to NID to module
//! to NID to exported function/variable NID, keyed throughout by the
//! numeric NIDs the stub slots carry.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Function,
    Variable,
}

#[derive(Debug, Clone)]
pub struct ResolvedImport {
    pub library_name: String,
    pub module_name: String,
    pub target_nid: u32,
}

#[derive(Debug, Deserialize)]
struct RawDb {
    #[serde(default)]
    modules: HashMap<String, RawLibrary>,
}

#[derive(Debug, Deserialize)]
struct RawLibrary {
    nid: u32,
    #[serde(default)]
    modules: HashMap<String, RawModule>,
}

#[derive(Debug, Deserialize)]
struct RawModule {
    nid: u32,
    #[serde(default)]
    functions: HashMap<String, u32>,
    #[serde(default)]
    variables: HashMap<String, u32>,
}

struct Module {
    name: String,
    functions: HashMap<u32, String>,
    variables: HashMap<u32, String>,
}

struct Library {
    name: String,
    modules: HashMap<u32, Module>,
}

/// One loaded import database, indexed by NID for O(1) lookup at
/// resolution time instead of the linear scan the JSON shape implies.
pub struct JsonImportDb {
    libraries: HashMap<u32, Library>,
}

impl JsonImportDb {
    pub fn load(path: &Path) -> Result<Self, ImportDbError> {
        let text = fs::read_to_string(path).map_err(ImportDbError::Io)?;
        let raw: RawDb = serde_json::from_str(&text).map_err(ImportDbError::Parse)?;

        let mut libraries = HashMap::new();
        for (lib_name, raw_lib) in raw.modules {
            let mut modules = HashMap::new();
            for (mod_name, raw_mod) in raw_lib.modules {
                let functions = raw_mod
                    .functions
                    .into_iter()
                    .map(|(name, nid)| (nid, name))
                    .collect();
                let variables = raw_mod
                    .variables
                    .into_iter()
                    .map(|(name, nid)| (nid, name))
                    .collect();
                modules.insert(
                    raw_mod.nid,
                    Module {
                        name: mod_name,
                        functions,
                        variables,
                    },
                );
            }
            libraries.insert(
                raw_lib.nid,
                Library {
                    name: lib_name,
                    modules,
                },
            );
        }

        Ok(JsonImportDb { libraries })
    }
}

#[derive(Debug)]
pub enum ImportDbError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl std::fmt::Display for ImportDbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportDbError::Io(e) => write!(f, "{e}"),
            ImportDbError::Parse(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ImportDbError {}

/// The external-collaborator interface spec.md §4.7 names: a database
/// that can be walked in order looking for a library, then a module
/// within it, then a function or variable NID within that.
pub trait ImportDatabase {
    fn find_lib(&self, library_nid: u32) -> Option<&str>;
    fn find_module(&self, library_nid: u32, module_nid: u32) -> Option<&str>;
    fn find_function(&self, library_nid: u32, module_nid: u32, target_nid: u32) -> bool;
    fn find_variable(&self, library_nid: u32, module_nid: u32, target_nid: u32) -> bool;
}

impl ImportDatabase for JsonImportDb {
    fn find_lib(&self, library_nid: u32) -> Option<&str> {
        self.libraries.get(&library_nid).map(|l| l.name.as_str())
    }

    fn find_module(&self, library_nid: u32, module_nid: u32) -> Option<&str> {
        self.libraries
            .get(&library_nid)?
            .modules
            .get(&module_nid)
            .map(|m| m.name.as_str())
    }

    fn find_function(&self, library_nid: u32, module_nid: u32, target_nid: u32) -> bool {
        self.libraries
            .get(&library_nid)
            .and_then(|l| l.modules.get(&module_nid))
            .map(|m| m.functions.contains_key(&target_nid))
            .unwrap_or(false)
    }

    fn find_variable(&self, library_nid: u32, module_nid: u32, target_nid: u32) -> bool {
        self.libraries
            .get(&library_nid)
            .and_then(|l| l.modules.get(&module_nid))
            .map(|m| m.variables.contains_key(&target_nid))
            .unwrap_or(false)
    }
}
