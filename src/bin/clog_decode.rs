use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, CommandFactory, Parser};
use clog_tools::decoder::load_tables;
use clog_tools::logging::init_logging;
use clog_tools::timestamp::OffsetSource;
use clog_tools::{ClogError, DecodeConfig, DecodeStats, Decoder};

/// Exit status for help and usage errors.
const USAGE_EXIT: u8 = 2;

/// Rehydrates compact log lines into readable text.
///
/// With no FILE arguments the log is read from stdin. With one, FILE is the
/// log. With three, they are the log, the symbol table and the module table;
/// otherwise the tables embedded in this binary are used.
#[derive(Debug, Parser)]
#[command(
    name = "clog_decode",
    version,
    disable_help_flag = true,
    override_usage = "clog_decode [LOGFILE [STRINGSFILE MODULESFILE]]"
)]
struct Args {
    /// Print usage and exit with status 2.
    #[arg(short = 'h', long = "help", action = ArgAction::SetTrue)]
    help: bool,

    #[arg(value_name = "FILE", num_args = 0..=3)]
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let _guard = init_logging();
    let args = Args::parse();

    if args.help {
        println!("{}", Args::command().render_help());
        return ExitCode::from(USAGE_EXIT);
    }

    let mut files = args.files.into_iter();
    let (log_path, table_paths) = match (files.next(), files.next(), files.next()) {
        (log, None, None) => (log, None),
        (log, Some(symbols), Some(modules)) => (log, Some((symbols, modules))),
        _ => {
            eprintln!("{}", Args::command().render_usage());
            return ExitCode::from(USAGE_EXIT);
        }
    };

    let result = DecodeConfig::from_args(log_path, table_paths).and_then(run);
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("clog_decode: {err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(config: DecodeConfig) -> Result<DecodeStats, ClogError> {
    let input: Box<dyn BufRead> = match &config.log_path {
        Some(path) => {
            let file = File::open(path).map_err(|e| ClogError::open(path, e))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };

    let (symbols, modules) = load_tables(&config.tables)?;
    let offset = config
        .tz_offset
        .map_or(OffsetSource::Local, OffsetSource::Fixed);
    let decoder = Decoder::new(&symbols, &modules).with_offset(offset);

    match decoder.run(input, io::stdout().lock()) {
        Ok(stats) => Ok(stats),
        // The reader went away, e.g. `clog_decode app.log | head`.
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(DecodeStats::default()),
        Err(err) => Err(err.into()),
    }
}
