use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use clap::Parser;
use clog_tools::logging::init_logging;
use clog_tools::{extract_tree, ExtractConfig};
use tracing::info;

/// Scans the current directory for compact log call sites and prints the
/// symbol table to stdout.
///
/// Files ending in .cpp, .cc or .mm are scanned; anything under a `clog_`
/// directory is skipped. Unparsable call sites are reported on stderr.
#[derive(Debug, Parser)]
#[command(name = "clog_extract", version)]
struct Args {}

fn main() -> ExitCode {
    let _guard = init_logging();
    let _args = Args::parse();

    let config = ExtractConfig::default();
    let extraction = extract_tree(&config);
    info!(
        files = extraction.files().len(),
        sites = extraction.sites.len(),
        malformed = extraction.diagnostics.len(),
        "scan complete"
    );

    let stdout = io::stdout().lock();
    let mut out = BufWriter::new(stdout);
    match extraction.write_table(&mut out).and_then(|_| out.flush()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("clog_extract: cannot write table: {err}");
            ExitCode::FAILURE
        }
    }
}
