//! CLI front-end (spec §6): `sce-elf-create input-elf output-elf [extra-db.json...]`
//!
//! Exit status: 0 if every stub resolved, 1 if the output was written but
//! some stubs remain unresolved, 2 on a fatal error before any output
//! could be produced.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "sce-elf-create",
    about = "Turn a statically-linked ARM ELF relocatable into a loadable SCE module"
)]
struct Args {
    /// Input relocatable ELF (built with -Wl,-q to keep relocations)
    input_elf: PathBuf,

    /// Output SCE module path
    output_elf: PathBuf,

    /// Additional import databases, searched after the default ones next
    /// to this executable, in the order given
    extra_dbs: Vec<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match sce_elf::run(&args.input_elf, &args.output_elf, &args.extra_dbs) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            log::warn!("some imports could not be resolved");
            ExitCode::from(1)
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(2)
        }
    }
}
