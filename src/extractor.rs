//! Build-time scan of a source tree for compact log call sites.
//!
//! Every source file may declare its id once with a directive such as
//!
//! ```text
//! #define LOCAL_CLOG_FILEID 0x1b79d7299
//! ```
//!
//! and every later call such as `CLOG_WARN(ModDisk, "diskFull", "%d", n)`
//! becomes one [`LogSite`] under that id. The result is written as the flat
//! two-section table that [`SymbolTable`](crate::SymbolTable) parses.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::config::ExtractConfig;
use crate::site::{FileIdRecord, LogSite};

/// Per-file scan state threaded through [`scan_line`].
///
/// Starts empty for every file; nothing carries over between files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanState {
    /// Id from the most recent file-id directive in this file.
    pub current_file_id: Option<String>,
}

/// A call-site line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractDiagnostic {
    pub source_file: String,
    pub line_number: u32,
    pub line: String,
}

/// What a single source line contributed to the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    FileId(FileIdRecord),
    Site(LogSite),
    Malformed(ExtractDiagnostic),
}

/// Everything found in one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileScan {
    pub file_ids: Vec<FileIdRecord>,
    pub sites: Vec<LogSite>,
    pub diagnostics: Vec<ExtractDiagnostic>,
}

impl FileScan {
    fn record(&mut self, event: LineEvent) {
        match event {
            LineEvent::FileId(record) => self.file_ids.push(record),
            LineEvent::Site(site) => self.sites.push(site),
            LineEvent::Malformed(diag) => self.diagnostics.push(diag),
        }
    }
}

/// Examines one line and returns the state for the next line.
///
/// A file-id directive replaces the current file id; one without a value
/// clears it. Any other line holding
/// the call marker is parsed as a call site under the current id, which may
/// still be `None` if no directive has been seen yet.
pub fn scan_line(
    state: ScanState,
    source_file: &str,
    line_number: u32,
    line: &str,
    config: &ExtractConfig,
) -> (ScanState, Option<LineEvent>) {
    if let Some((_, rest)) = line.split_once(config.file_id_marker.as_str()) {
        let Some(id) = rest.split_whitespace().next() else {
            trace!(source_file, line_number, "file-id marker without a value");
            return (ScanState::default(), None);
        };
        let record = FileIdRecord {
            file_id: id.to_string(),
            source_file: source_file.to_string(),
        };
        let next = ScanState {
            current_file_id: Some(record.file_id.clone()),
        };
        return (next, Some(LineEvent::FileId(record)));
    }

    let Some((_, content)) = line.split_once(config.call_marker.as_str()) else {
        return (state, None);
    };

    if content.trim().is_empty() {
        let diag = ExtractDiagnostic {
            source_file: source_file.to_string(),
            line_number,
            line: line.to_string(),
        };
        return (state, Some(LineEvent::Malformed(diag)));
    }

    let mut parts = content.splitn(3, ',');
    let level_token = parts.next().unwrap_or_default();
    let Some(symbol) = parts.next() else {
        return (state, None);
    };

    if level_token.starts_with(config.all_modules_sentinel.as_str()) {
        return (state, None);
    }

    let Some(level_char) = level_token.chars().next() else {
        return (state, None);
    };

    let symbol = unquote(symbol.trim());
    if symbol.chars().count() <= 1 {
        return (state, None);
    }

    let site = LogSite {
        file_id: state.current_file_id.clone(),
        line_number,
        level_char,
        symbolic_name: symbol.to_string(),
        source_file: source_file.to_string(),
    };
    (state, Some(LineEvent::Site(site)))
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
}

/// Scans one file's contents.
///
/// Each line is read as UTF-8, falling back to ISO-8859-1 when it is not
/// valid UTF-8, so any input decodes; only I/O errors from `reader` are
/// returned.
pub fn scan_source<R: BufRead>(
    source_file: &str,
    mut reader: R,
    config: &ExtractConfig,
) -> io::Result<FileScan> {
    let mut scan = FileScan::default();
    let mut state = ScanState::default();
    let mut buf = Vec::new();
    let mut line_number: u32 = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_number += 1;

        let line = decode_line(&buf);
        let (next, event) = scan_line(state, source_file, line_number, &line, config);
        state = next;
        if let Some(event) = event {
            scan.record(event);
        }
    }

    Ok(scan)
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Tables collected over a whole tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    files: Vec<FileIdRecord>,
    file_index: HashMap<String, usize>,
    pub sites: Vec<LogSite>,
    pub diagnostics: Vec<ExtractDiagnostic>,
}

impl Extraction {
    pub fn new() -> Self {
        Self::default()
    }

    /// File-id records in first-seen order.
    pub fn files(&self) -> &[FileIdRecord] {
        &self.files
    }

    /// Adds the results of one file scan.
    ///
    /// A file id declared again replaces the stored path but keeps its
    /// original position.
    pub fn merge(&mut self, scan: FileScan) {
        for record in scan.file_ids {
            match self.file_index.get(&record.file_id) {
                Some(&idx) => self.files[idx] = record,
                None => {
                    self.file_index.insert(record.file_id.clone(), self.files.len());
                    self.files.push(record);
                }
            }
        }
        self.sites.extend(scan.sites);
        self.diagnostics.extend(scan.diagnostics);
    }

    /// Writes the two-section table.
    ///
    /// Only table rows go to `out`; diagnostics are reported separately.
    pub fn write_table<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "=== files")?;
        for record in &self.files {
            writeln!(out, "{}", record.to_row())?;
        }
        writeln!(out)?;

        writeln!(out, "=== Log line symbols")?;
        for site in &self.sites {
            writeln!(out, "{}", site.to_row())?;
        }
        Ok(())
    }
}

/// Walks `config.root` and scans every matching source file.
///
/// Files are visited in file-name order. Unreadable files and directories
/// are skipped, and each malformed call-site line is logged as a warning.
pub fn extract_tree(config: &ExtractConfig) -> Extraction {
    let mut extraction = Extraction::new();
    let walker = WalkDir::new(&config.root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !(entry.depth() > 0
                && entry.file_type().is_dir()
                && entry.file_name() == config.excluded_dir.as_str())
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() || !has_extension(entry.path(), &config.extensions) {
            continue;
        }

        let label = relative_label(entry.path(), &config.root);
        let scan = File::open(entry.path())
            .and_then(|file| scan_source(&label, BufReader::new(file), config));
        match scan {
            Ok(scan) => {
                for diag in &scan.diagnostics {
                    warn!(
                        file = %diag.source_file,
                        line = diag.line_number,
                        "cannot parse call site: {}",
                        diag.line.trim()
                    );
                }
                extraction.merge(scan);
            }
            Err(err) => debug!(file = %label, "skipping file: {err}"),
        }
    }

    debug!(
        files = extraction.files.len(),
        sites = extraction.sites.len(),
        "extraction finished"
    );
    extraction
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy().to_lowercase();
    extensions
        .iter()
        .any(|ext| name.ends_with(&ext.to_lowercase()))
}

/// Path relative to the scan root with `/` separators.
fn relative_label(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
