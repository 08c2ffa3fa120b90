use std::collections::HashMap;

/// Lookup from module id to a human-readable module name.
///
/// Built from text where every meaningful line has the form
/// `name=id,optional comment`. That also covers an application's module
/// enum header, e.g. `ModHttp = 2, // web server`. Lines without `=` are
/// ignored.
///
/// Ids are normalized by an integer round trip on both insert and lookup,
/// so `"02"` and `"2"` are the same module. Ids that do not parse as an
/// integer are used verbatim.
///
/// # Examples
///
/// ```
/// # use clog_tools::ModuleTable;
/// let modules = ModuleTable::parse("NET=5,network module\nenum {\n");
/// assert_eq!(modules.find("05"), Some("NET"));
/// assert_eq!(modules.find("6"), None);
/// ```
#[derive(Debug, Default, Clone)]
pub struct ModuleTable {
    names: HashMap<String, String>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses module definitions from text. Later definitions of an id
    /// replace earlier ones.
    pub fn parse(text: &str) -> Self {
        Self::from_lines(text.lines())
    }

    /// Same as [`ModuleTable::parse`], for already split lines.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut table = Self::new();
        for line in lines {
            let Some((name, rest)) = line.split_once('=') else {
                continue;
            };
            let id = rest.split_once(',').map_or(rest, |(id, _)| id);
            table.insert(id.trim(), name.trim());
        }
        table
    }

    pub fn insert(&mut self, id: &str, name: &str) {
        self.names.insert(normalize_module_id(id), name.to_string());
    }

    /// Returns the module name for `module_id`. A miss is not an error;
    /// callers display the raw id instead.
    pub fn find(&self, module_id: &str) -> Option<&str> {
        self.names
            .get(&normalize_module_id(module_id))
            .map(String::as_str)
    }

    /// Iterates over `(normalized id, name)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(id, name)| (id.as_str(), name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// `"02"` becomes `"2"`; anything that is not an integer is returned as is.
fn normalize_module_id(raw: &str) -> String {
    let id = raw.trim();
    id.parse::<i64>()
        .map(|n| n.to_string())
        .unwrap_or_else(|_| id.to_string())
}
