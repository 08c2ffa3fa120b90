//! Shared data model for compact log call sites.
//!
//! A compact log line carries only `fileId:lineNumber` for its call site.
//! The types here describe the build-time records that let a decoder turn
//! that pair back into a symbolic name and a source location, plus the row
//! codec used by the flat table file.

use std::fmt;

use crate::error::RowError;

/// Row tag for a file-id record.
pub const FILE_ROW_TAG: &str = "F";

/// Row tag for a log-site record.
pub const SITE_ROW_TAG: &str = "L";

/// Prefix of the human-readable section header lines.
pub const SECTION_PREFIX: &str = "===";

/// One compact log call site found in the source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSite {
    /// File id as written in the source, `None` when the call appeared
    /// before any file-id directive in its file.
    pub file_id: Option<String>,

    /// 1-based source line of the call.
    pub line_number: u32,

    /// First character of the level token (`I`, `E`, `W`, ...).
    pub level_char: char,

    /// Developer supplied label for the call.
    pub symbolic_name: String,

    /// Path of the file relative to the scan root.
    pub source_file: String,
}

impl LogSite {
    /// Returns the lookup key for this site, with the file id normalized.
    pub fn key(&self) -> SiteKey {
        SiteKey {
            file_id: normalize_file_id(self.file_id.as_deref().unwrap_or("")),
            line_number: self.line_number.to_string(),
        }
    }

    /// Serializes the site as an `L` row.
    ///
    /// The symbol is always quoted. Every other field is quoted only when it
    /// would otherwise break the row.
    ///
    /// # Examples
    ///
    /// ```
    /// # use clog_tools::site::LogSite;
    /// let site = LogSite {
    ///     file_id: Some("AB12".to_string()),
    ///     line_number: 77,
    ///     level_char: 'W',
    ///     symbolic_name: "diskFull".to_string(),
    ///     source_file: "src/disk.cpp".to_string(),
    /// };
    /// assert_eq!(site.to_row(), r#"L,AB12,77,W,"diskFull",src/disk.cpp"#);
    /// ```
    pub fn to_row(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            SITE_ROW_TAG,
            quote_field(self.file_id.as_deref().unwrap_or("")),
            self.line_number,
            quote_field(&self.level_char.to_string()),
            always_quote(&self.symbolic_name),
            quote_field(&self.source_file),
        )
    }
}

/// Association between a file id and the file that declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdRecord {
    pub file_id: String,
    pub source_file: String,
}

impl FileIdRecord {
    /// Serializes the record as an `F` row.
    pub fn to_row(&self) -> String {
        format!(
            "{},{},{}",
            FILE_ROW_TAG,
            quote_field(&self.file_id),
            quote_field(&self.source_file)
        )
    }
}

/// `fileId:lineNumber` identifying one call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteKey {
    pub file_id: String,
    pub line_number: String,
}

impl SiteKey {
    /// Splits a raw site key on its first `:`, normalizing the file id.
    ///
    /// Returns `None` when there is no `:`.
    pub fn parse(raw: &str) -> Option<SiteKey> {
        let (file_id, line_number) = raw.split_once(':')?;
        Some(SiteKey {
            file_id: normalize_file_id(file_id),
            line_number: line_number.to_string(),
        })
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_id, self.line_number)
    }
}

/// Normalizes a file id to bare lowercase hex digits.
///
/// # Examples
///
/// ```
/// # use clog_tools::site::normalize_file_id;
/// assert_eq!(normalize_file_id("0x1B79D7299"), "1b79d7299");
/// assert_eq!(normalize_file_id("1b79d7299"), "1b79d7299");
/// ```
pub fn normalize_file_id(raw: &str) -> String {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    digits.to_ascii_lowercase()
}

fn needs_quotes(value: &str) -> bool {
    value.contains([',', '"', '\n', '\r'])
}

fn always_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Quotes `value` only if it contains a delimiter, quote or line break.
pub fn quote_field(value: &str) -> String {
    if needs_quotes(value) {
        always_quote(value)
    } else {
        value.to_string()
    }
}

/// Splits one table row into its fields.
///
/// Fields are separated by commas and may be wrapped in double quotes, in
/// which case a doubled quote stands for a literal one.
///
/// # Examples
///
/// ```
/// # use clog_tools::site::split_row;
/// let fields = split_row(r#"L,1,10,I,"a, ""b""",f.cpp"#).unwrap();
/// assert_eq!(fields, vec!["L", "1", "10", "I", r#"a, "b""#, "f.cpp"]);
/// ```
pub fn split_row(row: &str) -> Result<Vec<String>, RowError> {
    let mut fields = Vec::new();
    let mut chars = row.chars().peekable();

    loop {
        let mut field = String::new();

        if chars.peek() == Some(&'"') {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') if chars.peek() == Some(&'"') => {
                        chars.next();
                        field.push('"');
                    }
                    Some('"') => break,
                    Some(c) => field.push(c),
                    None => return Err(RowError::UnterminatedQuote),
                }
            }
            match chars.next() {
                None => {
                    fields.push(field);
                    return Ok(fields);
                }
                Some(',') => fields.push(field),
                Some(c) => return Err(RowError::TrailingAfterQuote(c)),
            }
        } else {
            loop {
                match chars.next() {
                    None => {
                        fields.push(field);
                        return Ok(fields);
                    }
                    Some(',') => break,
                    Some(c) => field.push(c),
                }
            }
            fields.push(field);
        }
    }
}
