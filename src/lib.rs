//! # clog tools
//!
//! Offline tooling for the compact logging scheme, where a log call site
//! embeds only a numeric file id, a line number and a level character instead
//! of a full format string:
//!
//! * **Extraction**: scan a source tree at build time and record every call
//!   site with its symbolic name and source file
//! * **Rehydration**: replay compact runtime log lines against those tables
//!   and print readable lines with timestamp, module, symbol and location
//! * **Bundling**: append both tables to a copy of the decoder so it can be
//!   shipped as a single file
//!
//! ## Main Components
//!
//! * `extractor`: source-tree scanner producing the symbol table file
//! * `SymbolTable`: `fileId:lineNumber` to call-site lookup
//! * `ModuleTable`: module id to module name lookup
//! * `Decoder`: streaming line-by-line rehydration
//! * `bundle`: the embedded-table blob read by a self-contained decoder
//!
//! ## Quick Start
//!
//! ```
//! use clog_tools::{Decoder, ModuleTable, SymbolTable};
//!
//! let symbols = SymbolTable::parse(r#"L,1b79d7299,42,I,"Startup",main.cpp"#).unwrap();
//! let modules = ModuleTable::parse("NET=5,network module");
//! let decoder = Decoder::new(&symbols, &modules);
//!
//! let input = "15045599201964060 I 05 1b79d7299:42 100 200 started ok\nplain text\n";
//! let mut output = Vec::new();
//! let stats = decoder.run(input.as_bytes(), &mut output).unwrap();
//!
//! assert_eq!(stats.rehydrated, 1);
//! assert_eq!(stats.passed_through, 1);
//! let text = String::from_utf8(output).unwrap();
//! assert!(text.lines().next().unwrap().ends_with(" NET 100 200 Startup started ok [main.cpp:42]"));
//! assert!(text.ends_with("plain text\n"));
//! ```

pub mod bundle;
pub mod config;
pub mod decoder;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod module_table;
pub mod site;
pub mod symbol_table;
pub mod timestamp;

pub use bundle::TableBundle;
pub use config::{DecodeConfig, ExtractConfig, TableSource};
pub use decoder::{DecodeStats, DecodedLine, Decoder, RawLogRecord};
pub use error::{BundleError, ClogError, TableError};
pub use extractor::{extract_tree, scan_source, Extraction};
pub use module_table::ModuleTable;
pub use site::{FileIdRecord, LogSite, SiteKey};
pub use symbol_table::SymbolTable;
