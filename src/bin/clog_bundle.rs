use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use clog_tools::logging::init_logging;
use clog_tools::{ClogError, SymbolTable, TableBundle};
use tracing::info;

/// Builds a self-contained decoder by appending the symbol and module
/// tables to a copy of the `clog_decode` binary.
#[derive(Debug, Parser)]
#[command(name = "clog_bundle", version)]
struct Args {
    /// The clog_decode binary to copy.
    decoder: PathBuf,

    /// Symbol table written by clog_extract.
    strings: PathBuf,

    /// Module definitions (`name=id,comment` lines).
    modules: PathBuf,

    /// Where to write the bundled decoder.
    output: PathBuf,
}

fn main() -> ExitCode {
    let _guard = init_logging();
    let args = Args::parse();

    match bundle(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("clog_bundle: {err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn bundle(args: &Args) -> Result<(), ClogError> {
    let mut host = fs::read(&args.decoder).map_err(|e| ClogError::open(&args.decoder, e))?;
    let strings = read_text(&args.strings)?;
    let modules = read_text(&args.modules)?;

    // Refuse to ship a table the decoder would reject at start-up.
    SymbolTable::parse(&strings).map_err(|source| ClogError::Table {
        path: args.strings.clone(),
        source,
    })?;

    TableBundle::new(strings, modules).append_to(&mut host);
    fs::write(&args.output, &host).map_err(|e| ClogError::open(&args.output, e))?;
    copy_permissions(&args.decoder, &args.output)?;

    info!(output = %args.output.display(), bytes = host.len(), "bundled decoder written");
    Ok(())
}

fn read_text(path: &Path) -> Result<String, ClogError> {
    fs::read_to_string(path).map_err(|e| ClogError::open(path, e))
}

fn copy_permissions(from: &Path, to: &Path) -> Result<(), ClogError> {
    let permissions = fs::metadata(from)?.permissions();
    fs::set_permissions(to, permissions)?;
    Ok(())
}
