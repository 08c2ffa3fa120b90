use std::env;
use std::path::PathBuf;

use chrono::FixedOffset;

use crate::error::ClogError;

/// Environment variable holding the `tracing` filter for the tools.
pub const LOG_FILTER_ENV: &str = "CLOG_LOG";

/// Environment variable naming a file to read the table bundle from instead
/// of the running executable.
pub const BUNDLE_PATH_ENV: &str = "CLOG_TABLES_BUNDLE";

/// Environment variable pinning the timezone offset used for timestamps.
pub const TZ_OFFSET_ENV: &str = "CLOG_TZ_OFFSET";

/// Settings for a source-tree scan.
///
/// The command line extractor always uses [`ExtractConfig::default`];
/// the fields exist so the library can scan other trees and conventions.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Directory to walk.
    pub root: PathBuf,

    /// File name suffixes to include, compared case-insensitively.
    pub extensions: Vec<String>,

    /// Substring marking a compact log call.
    pub call_marker: String,

    /// Substring marking the per-file id directive.
    pub file_id_marker: String,

    /// Directory name whose contents are never scanned.
    pub excluded_dir: String,

    /// Level-token prefix of the unscoped macro form, which is never a call site.
    pub all_modules_sentinel: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            extensions: vec![".cpp".into(), ".cc".into(), ".mm".into()],
            call_marker: "CLOG_".into(),
            file_id_marker: "LOCAL_CLOG_FILEID".into(),
            excluded_dir: "clog_".into(),
            all_modules_sentinel: "ALL_MOD".into(),
        }
    }
}

impl ExtractConfig {
    /// Default conventions rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }
}

/// Where the decoder reads its symbol and module tables from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    /// Tables appended to the decoder binary, or to the file named by
    /// `CLOG_TABLES_BUNDLE`.
    Embedded { bundle_override: Option<PathBuf> },

    /// Tables read from two files on disk.
    Files { symbols: PathBuf, modules: PathBuf },
}

/// Resolved decoder settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Log file to decode, `None` for standard input.
    pub log_path: Option<PathBuf>,
    pub tables: TableSource,
    /// Fixed offset for timestamps; `None` means the local offset, read
    /// fresh for every line.
    pub tz_offset: Option<FixedOffset>,
}

impl DecodeConfig {
    /// Builds the configuration from already validated positional
    /// arguments and the process environment.
    pub fn from_args(
        log_path: Option<PathBuf>,
        table_paths: Option<(PathBuf, PathBuf)>,
    ) -> Result<Self, ClogError> {
        let tables = match table_paths {
            Some((symbols, modules)) => TableSource::Files { symbols, modules },
            None => TableSource::Embedded {
                bundle_override: env::var_os(BUNDLE_PATH_ENV).map(PathBuf::from),
            },
        };

        let tz_offset = match env::var(TZ_OFFSET_ENV) {
            Ok(value) => Some(parse_offset(&value).ok_or(ClogError::Env {
                name: TZ_OFFSET_ENV,
                value,
            })?),
            Err(_) => None,
        };

        Ok(Self {
            log_path,
            tables,
            tz_offset,
        })
    }
}

/// Parses a `+HHMM` / `-HHMM` offset as printed by `%z`.
///
/// # Examples
///
/// ```
/// # use clog_tools::config::parse_offset;
/// assert_eq!(parse_offset("-0500").unwrap().local_minus_utc(), -5 * 3600);
/// assert!(parse_offset("EST").is_none());
/// ```
pub fn parse_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    let (sign, digits) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
