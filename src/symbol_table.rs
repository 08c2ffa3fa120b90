use std::collections::HashMap;

use tracing::trace;

use crate::error::TableError;
use crate::site::{
    normalize_file_id, split_row, LogSite, SiteKey, FILE_ROW_TAG, SECTION_PREFIX, SITE_ROW_TAG,
};

/// Lookup from site key to the call site that produced it.
///
/// A `SymbolTable` is built once from the extractor's flat table and is
/// read-only afterwards. Rows tagged `L` populate the site lookup keyed by
/// `<fileId>:<lineNumber>` with the file id normalized. Rows tagged `F`
/// populate a file-id to file-name map that tooling can use; the decoder
/// itself only needs the sites.
///
/// # Examples
///
/// ```
/// # use clog_tools::SymbolTable;
/// let table = SymbolTable::parse(r#"
/// === files
/// F,0x1b79d7299,main.cpp
///
/// === Log line symbols
/// L,0x1b79d7299,42,I,"Startup",main.cpp
/// "#).unwrap();
///
/// let site = table.find("1b79d7299:42", 'I').unwrap();
/// assert_eq!(site.symbolic_name, "Startup");
/// assert_eq!(table.file_name("1B79D7299"), Some("main.cpp"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    sites: HashMap<SiteKey, LogSite>,
    files: HashMap<String, String>,
}

impl SymbolTable {
    /// Creates a table with no entries. Every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the flat table text.
    ///
    /// Empty rows and `===` section headers are skipped, rows with an
    /// unknown tag are ignored. A later `L` row with the same key as an
    /// earlier one replaces it.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Malformed`] when a row has broken quoting, an
    /// `L` row has fewer than six fields or a non-numeric line number, or an
    /// `F` row has fewer than three fields.
    pub fn parse(text: &str) -> Result<Self, TableError> {
        let mut table = Self::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let row = raw.trim_end_matches('\r');
            if row.trim().is_empty() || row.starts_with(SECTION_PREFIX) {
                continue;
            }

            let fields =
                split_row(row).map_err(|e| TableError::malformed(line_no, e.to_string()))?;

            match fields[0].as_str() {
                SITE_ROW_TAG => {
                    let site = parse_site_row(&fields, line_no)?;
                    table.insert(site);
                }
                FILE_ROW_TAG => {
                    if fields.len() < 3 {
                        return Err(TableError::malformed(
                            line_no,
                            format!("file row has {} fields, expected 3", fields.len()),
                        ));
                    }
                    table
                        .files
                        .insert(normalize_file_id(&fields[1]), fields[2].clone());
                }
                other => trace!(line = line_no, tag = other, "ignoring row with unknown tag"),
            }
        }

        Ok(table)
    }

    /// Adds a site, replacing any site already stored under the same key.
    pub fn insert(&mut self, site: LogSite) {
        self.sites.insert(site.key(), site);
    }

    /// Looks up the call site for a raw `fileId:lineNumber` key.
    ///
    /// The level character is part of the lookup contract but does not take
    /// part in matching: a key resolves to the same site at every level.
    pub fn find(&self, key: &str, _level_char: char) -> Option<&LogSite> {
        let key = SiteKey::parse(key)?;
        self.sites.get(&key)
    }

    /// Returns the file that declared `file_id`, if it was recorded.
    pub fn file_name(&self, file_id: &str) -> Option<&str> {
        self.files.get(&normalize_file_id(file_id)).map(String::as_str)
    }

    /// Iterates over every stored site in no particular order.
    pub fn sites(&self) -> impl Iterator<Item = &LogSite> {
        self.sites.values()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

fn parse_site_row(fields: &[String], line_no: usize) -> Result<LogSite, TableError> {
    if fields.len() < 6 {
        return Err(TableError::malformed(
            line_no,
            format!("log-site row has {} fields, expected 6", fields.len()),
        ));
    }

    let line_number = fields[2].trim().parse::<u32>().map_err(|_| {
        TableError::malformed(line_no, format!("invalid line number {:?}", fields[2]))
    })?;

    let file_id = match fields[1].trim() {
        "" => None,
        id => Some(id.to_string()),
    };

    Ok(LogSite {
        file_id,
        line_number,
        level_char: fields[3].chars().next().unwrap_or('?'),
        symbolic_name: fields[4].clone(),
        source_file: fields[5].clone(),
    })
}
