//! Rehydration of compact runtime log lines.
//!
//! A compact line looks like
//!
//! ```text
//! 15045599201964060 I 05 1b79d7299:42 100 200 started ok
//! ```
//!
//! that is `timestampNanos levelChar moduleId siteKey pid tid message`. The
//! decoder resolves the module and the call site against the tables and
//! prints
//!
//! ```text
//! 2017-09-04 21:18:40.196406+0000 I NET 100 200 Startup started ok [main.cpp:42]
//! ```
//!
//! Lines that are not in compact form are copied through untouched.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::bundle::load_embedded;
use crate::config::TableSource;
use crate::error::ClogError;
use crate::module_table::ModuleTable;
use crate::symbol_table::SymbolTable;
use crate::timestamp::{format_timestamp, OffsetSource};

/// Prefix that marks a compact line.
///
/// Known latent defect: this only matches Unix timestamps from July 2017
/// to September 2020. Compact lines from other epochs pass through as
/// free text.
pub const COMPACT_PREFIX: &[u8] = b"15";

/// Fields before the message.
const HEAD_FIELDS: usize = 6;

/// Outcome of decoding one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedLine {
    /// Not a compact line; emit the input as is.
    PassThrough,
    /// A compact line that could not be split into fields; emit as is.
    Malformed,
    /// The rehydrated text, without a line terminator.
    Rehydrated(String),
}

/// Line counts for one [`Decoder::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub lines: u64,
    pub rehydrated: u64,
    pub passed_through: u64,
    pub malformed: u64,
}

/// The fields of a compact line, borrowed from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLogRecord<'a> {
    pub timestamp: &'a str,
    pub level: &'a str,
    pub module_id: &'a str,
    pub site_key: &'a str,
    pub pid: &'a str,
    pub tid: &'a str,
    pub message: &'a str,
}

impl<'a> RawLogRecord<'a> {
    /// Splits a line into six whitespace-separated fields and the message.
    ///
    /// Runs of whitespace between fields collapse. The message is the rest
    /// of the line from its first non-blank character and keeps its inner
    /// and trailing spaces; it is empty when the line has only six fields.
    ///
    /// Returns `None` for fewer than six fields.
    pub fn split(line: &'a str) -> Option<Self> {
        let mut head = [""; HEAD_FIELDS];
        let mut rest = line;
        for slot in head.iter_mut() {
            rest = rest.trim_start();
            if rest.is_empty() {
                return None;
            }
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            *slot = &rest[..end];
            rest = &rest[end..];
        }
        let [timestamp, level, module_id, site_key, pid, tid] = head;
        Some(Self {
            timestamp,
            level,
            module_id,
            site_key,
            pid,
            tid,
            message: rest.trim_start(),
        })
    }
}

/// Rehydrates compact lines against a symbol table and a module table.
///
/// The tables are borrowed and never modified, so one pair of tables can
/// serve any number of decoders.
///
/// # Examples
///
/// ```
/// # use clog_tools::{Decoder, DecodedLine, ModuleTable, SymbolTable};
/// # use clog_tools::timestamp::OffsetSource;
/// # use chrono::FixedOffset;
/// let symbols = SymbolTable::parse(r#"L,1b79d7299,42,I,"Startup",src/main.cpp"#).unwrap();
/// let modules = ModuleTable::parse("NET=5,network module");
/// let decoder = Decoder::new(&symbols, &modules)
///     .with_offset(OffsetSource::Fixed(FixedOffset::east_opt(0).unwrap()));
///
/// let line = "15045599201964060 I 05 1b79d7299:42 100 200 started ok";
/// assert_eq!(
///     decoder.decode_line(line),
///     DecodedLine::Rehydrated(
///         "2017-09-04 21:18:40.196406+0000 I NET 100 200 Startup started ok [main.cpp:42]"
///             .to_string()
///     ),
/// );
/// ```
pub struct Decoder<'t> {
    symbols: &'t SymbolTable,
    modules: &'t ModuleTable,
    offset: OffsetSource,
}

impl<'t> Decoder<'t> {
    /// Creates a decoder that renders timestamps in the local offset.
    pub fn new(symbols: &'t SymbolTable, modules: &'t ModuleTable) -> Self {
        Self {
            symbols,
            modules,
            offset: OffsetSource::Local,
        }
    }

    pub fn with_offset(mut self, offset: OffsetSource) -> Self {
        self.offset = offset;
        self
    }

    /// Decodes a single line given without its terminator.
    pub fn decode_line(&self, line: &str) -> DecodedLine {
        if !is_compact(line.as_bytes()) {
            return DecodedLine::PassThrough;
        }
        let Some(record) = RawLogRecord::split(line) else {
            return DecodedLine::Malformed;
        };
        match self.rehydrate(&record) {
            Some(text) => DecodedLine::Rehydrated(text),
            None => DecodedLine::Malformed,
        }
    }

    /// Builds the output line for a split record.
    ///
    /// Returns `None` only when the timestamp field cannot be rendered.
    pub fn rehydrate(&self, record: &RawLogRecord<'_>) -> Option<String> {
        let timestamp = format_timestamp(record.timestamp, self.offset.current())?;

        let module = self
            .modules
            .find(record.module_id)
            .unwrap_or(record.module_id);

        let level_char = record.level.chars().next().unwrap_or('?');
        let (symbol, extra) = match self.symbols.find(record.site_key, level_char) {
            Some(site) => {
                let line_number = record
                    .site_key
                    .split_once(':')
                    .map_or("", |(_, line)| line);
                let file_name = Path::new(&site.source_file)
                    .file_name()
                    .map(|name| name.to_string_lossy())
                    .unwrap_or_else(|| site.source_file.as_str().into());
                (
                    site.symbolic_name.as_str(),
                    format!("[{file_name}:{line_number}]"),
                )
            }
            None => (record.site_key, String::new()),
        };

        Some(format!(
            "{} {} {} {} {} {} {} {}",
            timestamp, record.level, module, record.pid, record.tid, symbol, record.message, extra
        ))
    }

    /// Decodes `input` line by line into `output` until end of stream.
    ///
    /// Every output line is flushed as soon as it is written, so the
    /// decoder can sit at the end of a live pipe. Pass-through and malformed
    /// lines are copied byte for byte, including their original terminator.
    pub fn run<R: BufRead, W: Write>(&self, mut input: R, mut output: W) -> io::Result<DecodeStats> {
        let mut stats = DecodeStats::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            stats.lines += 1;

            let decoded = if is_compact(&buf) {
                let text = String::from_utf8_lossy(chomp(&buf));
                self.decode_line(&text)
            } else {
                DecodedLine::PassThrough
            };

            match decoded {
                DecodedLine::Rehydrated(text) => {
                    stats.rehydrated += 1;
                    output.write_all(text.as_bytes())?;
                    output.write_all(b"\n")?;
                }
                DecodedLine::PassThrough => {
                    stats.passed_through += 1;
                    output.write_all(&buf)?;
                }
                DecodedLine::Malformed => {
                    stats.malformed += 1;
                    debug!(line = stats.lines, "malformed compact line passed through");
                    output.write_all(&buf)?;
                }
            }
            output.flush()?;
        }

        debug!(
            lines = stats.lines,
            rehydrated = stats.rehydrated,
            passed_through = stats.passed_through,
            malformed = stats.malformed,
            "decode finished"
        );
        Ok(stats)
    }
}

/// Loads the symbol and module tables named by `source`.
///
/// Explicitly named files must exist and the symbol table must parse;
/// either failure aborts start-up.
pub fn load_tables(source: &TableSource) -> Result<(SymbolTable, ModuleTable), ClogError> {
    let (symbols, modules) = match source {
        TableSource::Embedded { bundle_override } => load_embedded(bundle_override.as_deref())?,
        TableSource::Files { symbols, modules } => {
            let symbols_text =
                fs::read_to_string(symbols).map_err(|e| ClogError::open(symbols, e))?;
            let modules_text =
                fs::read_to_string(modules).map_err(|e| ClogError::open(modules, e))?;
            let symbol_table =
                SymbolTable::parse(&symbols_text).map_err(|source| ClogError::Table {
                    path: symbols.clone(),
                    source,
                })?;
            (symbol_table, ModuleTable::parse(&modules_text))
        }
    };

    info!(
        sites = symbols.len(),
        modules = modules.len(),
        "decoder tables loaded"
    );
    Ok((symbols, modules))
}

fn is_compact(line: &[u8]) -> bool {
    line.starts_with(COMPACT_PREFIX)
}

fn chomp(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
