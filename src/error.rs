use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while splitting a single comma separated row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("unterminated quoted field")]
    UnterminatedQuote,

    #[error("unexpected character {0:?} after closing quote")]
    TrailingAfterQuote(char),
}

/// Errors raised while parsing a symbol table.
///
/// Line numbers are 1-based and refer to the table text, not to any source
/// file named inside it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

impl TableError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        TableError::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

/// Errors raised while reading an embedded table bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("bundle trailer declares {declared} bytes but only {available} are present")]
    Truncated { declared: u64, available: usize },

    #[error("bundle payload could not be decompressed: {0}")]
    Decompress(#[from] lz4_flex::block::DecompressError),

    #[error("bundle payload is corrupt: {0}")]
    Corrupt(&'static str),

    #[error("bundle text is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Top level error for the command line tools.
#[derive(Debug, Error)]
pub enum ClogError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed symbol table {}: {source}", path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: TableError,
    },

    #[error("malformed table bundle {}: {source}", path.display())]
    Bundle {
        path: PathBuf,
        #[source]
        source: BundleError,
    },

    #[error("invalid {name} value {value:?}")]
    Env { name: &'static str, value: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ClogError {
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ClogError::Open {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this error. Status 2 is reserved for usage
    /// and help output.
    pub fn exit_code(&self) -> i32 {
        match self {
            ClogError::Open { .. } => 3,
            ClogError::Table { .. } => 4,
            ClogError::Bundle { .. } => 5,
            ClogError::Env { .. } => 2,
            ClogError::Io(_) => 1,
        }
    }
}
