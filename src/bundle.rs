//! Packaging of the symbol and module tables into a self-contained decoder.
//!
//! The bundle is pure data. It is appended to a copy of the decoder binary
//! and located at start-up by a fixed trailer at the very end of the file:
//!
//! ```text
//! [ lz4 blob | blob length: u64 LE | magic "CLOGTBL1" ]
//! ```
//!
//! The blob decompresses to the symbol table text and the module table
//! text, each preceded by its length as a `u32` LE.

use std::env;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use tracing::{debug, warn};

use crate::error::{BundleError, ClogError, TableError};
use crate::module_table::ModuleTable;
use crate::symbol_table::SymbolTable;

/// Marks the end of a file carrying a bundle.
pub const BUNDLE_MAGIC: &[u8; 8] = b"CLOGTBL1";

/// Magic plus the blob length.
const TRAILER_SIZE: usize = 16;

/// The two table texts exactly as they were read at build time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableBundle {
    pub symbols: String,
    pub modules: String,
}

impl TableBundle {
    pub fn new(symbols: impl Into<String>, modules: impl Into<String>) -> Self {
        Self {
            symbols: symbols.into(),
            modules: modules.into(),
        }
    }

    /// Serializes the bundle into blob plus trailer.
    pub fn to_trailer(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.symbols.len() + self.modules.len() + 8);
        for text in [&self.symbols, &self.modules] {
            payload.extend_from_slice(&(text.len() as u32).to_le_bytes());
            payload.extend_from_slice(text.as_bytes());
        }

        let blob = compress_prepend_size(&payload);
        let mut out = Vec::with_capacity(blob.len() + TRAILER_SIZE);
        out.extend_from_slice(&blob);
        out.extend_from_slice(&(blob.len() as u64).to_le_bytes());
        out.extend_from_slice(BUNDLE_MAGIC);
        out
    }

    /// Appends the bundle to `host`, usually the bytes of the decoder binary.
    pub fn append_to(&self, host: &mut Vec<u8>) {
        host.extend_from_slice(&self.to_trailer());
    }

    /// Reads a bundle from the end of `bytes`.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - `bytes` does not end with the bundle magic
    /// * `Ok(Some(bundle))` - the embedded tables
    /// * `Err(_)` - the magic is present but the blob is damaged
    pub fn from_trailer(bytes: &[u8]) -> Result<Option<Self>, BundleError> {
        let Some(len_at) = bytes.len().checked_sub(TRAILER_SIZE) else {
            return Ok(None);
        };
        let mut trailer = [0u8; TRAILER_SIZE];
        trailer.copy_from_slice(&bytes[len_at..]);
        let Some(declared) = blob_len(&trailer) else {
            return Ok(None);
        };

        let blob_start = usize::try_from(declared)
            .ok()
            .and_then(|len| len_at.checked_sub(len))
            .ok_or(BundleError::Truncated {
                declared,
                available: len_at,
            })?;

        Self::from_blob(&bytes[blob_start..len_at]).map(Some)
    }

    /// Decodes the compressed blob that precedes the trailer.
    pub fn from_blob(blob: &[u8]) -> Result<Self, BundleError> {
        let payload = decompress_size_prepended(blob)?;
        let mut rest = payload.as_slice();
        let symbols = take_text(&mut rest)?;
        let modules = take_text(&mut rest)?;
        if !rest.is_empty() {
            return Err(BundleError::Corrupt("trailing bytes after module table"));
        }
        Ok(Self { symbols, modules })
    }

    /// Parses both texts into lookup tables.
    pub fn into_tables(self) -> Result<(SymbolTable, ModuleTable), TableError> {
        let symbols = SymbolTable::parse(&self.symbols)?;
        let modules = ModuleTable::parse(&self.modules);
        Ok((symbols, modules))
    }
}

/// Blob length declared by a trailer, or `None` without the magic.
fn blob_len(trailer: &[u8; TRAILER_SIZE]) -> Option<u64> {
    let (len_bytes, magic) = trailer.split_at(8);
    if magic != BUNDLE_MAGIC {
        return None;
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(len_bytes);
    Some(u64::from_le_bytes(buf))
}

fn take_text(rest: &mut &[u8]) -> Result<String, BundleError> {
    if rest.len() < 4 {
        return Err(BundleError::Corrupt("missing length prefix"));
    }
    let (len_bytes, tail) = rest.split_at(4);
    let len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
    if tail.len() < len {
        return Err(BundleError::Corrupt("text shorter than its length prefix"));
    }
    let (text, tail) = tail.split_at(len);
    *rest = tail;
    Ok(String::from_utf8(text.to_vec())?)
}

/// Reads only the trailer and the blob it declares from the end of `file`.
fn read_bundle(file: &mut File, path: &Path) -> Result<Option<TableBundle>, ClogError> {
    let bundle_error = |source: BundleError| ClogError::Bundle {
        path: path.to_path_buf(),
        source,
    };

    let file_len = file.metadata()?.len();
    if file_len < TRAILER_SIZE as u64 {
        return Ok(None);
    }

    let mut trailer = [0u8; TRAILER_SIZE];
    file.seek(SeekFrom::End(-(TRAILER_SIZE as i64)))?;
    file.read_exact(&mut trailer)?;
    let Some(declared) = blob_len(&trailer) else {
        return Ok(None);
    };

    let available = file_len - TRAILER_SIZE as u64;
    let blob_size = usize::try_from(declared)
        .ok()
        .filter(|_| declared <= available)
        .ok_or_else(|| {
            bundle_error(BundleError::Truncated {
                declared,
                available: usize::try_from(available).unwrap_or(usize::MAX),
            })
        })?;

    file.seek(SeekFrom::Start(available - declared))?;
    let mut blob = vec![0u8; blob_size];
    file.read_exact(&mut blob)?;
    TableBundle::from_blob(&blob).map(Some).map_err(bundle_error)
}

/// Loads the bundle embedded in `path`.
///
/// Only the trailer and the blob are read, not the whole file. A file
/// without a bundle yields empty tables and a warning, so decoding still
/// works with raw identifiers.
pub fn load_bundle_from(path: &Path) -> Result<(SymbolTable, ModuleTable), ClogError> {
    let mut file = File::open(path).map_err(|e| ClogError::open(path, e))?;
    match read_bundle(&mut file, path)? {
        Some(bundle) => {
            debug!(path = %path.display(), "loaded embedded tables");
            bundle.into_tables().map_err(|source| ClogError::Table {
                path: path.to_path_buf(),
                source,
            })
        }
        None => {
            warn!(
                path = %path.display(),
                "no embedded tables found, symbols and modules will not be resolved"
            );
            Ok((SymbolTable::new(), ModuleTable::new()))
        }
    }
}

/// Loads the tables embedded in the running decoder, or in `bundle_override`
/// when given.
pub fn load_embedded(bundle_override: Option<&Path>) -> Result<(SymbolTable, ModuleTable), ClogError> {
    let path: PathBuf = match bundle_override {
        Some(path) => path.to_path_buf(),
        None => env::current_exe()?,
    };
    load_bundle_from(&path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_bytes_have_no_bundle() {
        assert_eq!(TableBundle::from_trailer(b"").unwrap(), None);
        assert_eq!(TableBundle::from_trailer(b"\x7fELF some binary").unwrap(), None);
    }

    #[test]
    fn test_bundle_found_after_host_bytes() {
        let mut host = b"#!host program bytes".to_vec();
        let bundle = TableBundle::new("L,1,10,I,\"a\",f.cpp\n", "Foo=2,\n");
        bundle.append_to(&mut host);

        let found = TableBundle::from_trailer(&host).unwrap().unwrap();
        assert_eq!(found, bundle);
    }

    #[test]
    fn test_oversized_length_is_truncated_error() {
        let mut bytes = vec![0u8; 4];
        bytes.extend_from_slice(&1000u64.to_le_bytes());
        bytes.extend_from_slice(BUNDLE_MAGIC);
        let err = TableBundle::from_trailer(&bytes).unwrap_err();
        assert!(matches!(
            err,
            BundleError::Truncated {
                declared: 1000,
                available: 4
            }
        ));
    }

    #[test]
    fn test_bad_blob_is_error() {
        let mut bytes = vec![2u8, 0, 0, 0, 0xff, 0xff];
        bytes.extend_from_slice(&6u64.to_le_bytes());
        bytes.extend_from_slice(BUNDLE_MAGIC);
        assert!(TableBundle::from_trailer(&bytes).is_err());
    }

    #[test]
    fn test_trailer_without_magic() {
        let mut trailer = [0u8; TRAILER_SIZE];
        trailer[..8].copy_from_slice(&7u64.to_le_bytes());
        assert_eq!(blob_len(&trailer), None);
        trailer[8..].copy_from_slice(BUNDLE_MAGIC);
        assert_eq!(blob_len(&trailer), Some(7));
    }

    #[test]
    fn test_into_tables() {
        let (symbols, modules) = TableBundle::new("L,1,10,I,\"a\",f.cpp\n", "Foo=2,\n")
            .into_tables()
            .unwrap();
        assert_eq!(symbols.find("1:10", 'I').unwrap().symbolic_name, "a");
        assert_eq!(modules.find("02"), Some("Foo"));
    }
}
