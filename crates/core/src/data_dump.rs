//! The theme data dump: a scoped snapshot of content tables.
//!
//! Serialized as one JSON object mapping table name to an ordered list of
//! row objects. Export collects `page` rows first and then every table in
//! the export map; import replays each listed table by delete + reinsert.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{DbId, Row};

/// Table holding site pages; always exported first.
pub const PAGE_TABLE: &str = "page";

/// Derived cache of page content, purged whenever pages are replayed.
pub const OPTIMIZED_TABLE: &str = "optimized";

static TABLE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid regex"));

/// Errors reading or writing a data dump.
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("Malformed data dump: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid table name '{0}' in data dump")]
    InvalidTable(String),
}

/// Whether `name` is safe to interpolate as a table identifier.
pub fn is_valid_table_name(name: &str) -> bool {
    TABLE_NAME_RE.is_match(name)
}

// ---------------------------------------------------------------------------
// Export descriptors
// ---------------------------------------------------------------------------

/// How one table is selected for export.
///
/// When `page_scoped` is set the query takes the exported page ids as `$1`
/// (a `BIGINT[]`, used as `= ANY($1)`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableExport {
    pub table: String,
    pub query: String,
    pub page_scoped: bool,
}

impl TableExport {
    pub fn scoped(table: &str, query: &str) -> Self {
        Self {
            table: table.to_string(),
            query: query.to_string(),
            page_scoped: true,
        }
    }

    pub fn unscoped(table: &str, query: &str) -> Self {
        Self {
            table: table.to_string(),
            query: query.to_string(),
            page_scoped: false,
        }
    }
}

/// Tables exported with every full theme, after `page`.
pub fn builtin_tables() -> Vec<TableExport> {
    vec![
        TableExport::scoped(
            "container",
            "SELECT * FROM container WHERE page_id IS NULL OR page_id = ANY($1) ORDER BY id",
        ),
        TableExport::unscoped("featured_area", "SELECT * FROM featured_area ORDER BY id"),
        TableExport::scoped(
            "page_fa",
            "SELECT * FROM page_fa WHERE page_id = ANY($1) ORDER BY page_id, fa_id",
        ),
        TableExport::unscoped("page_option", "SELECT * FROM page_option ORDER BY id"),
        TableExport::scoped(
            "page_has_option",
            "SELECT * FROM page_has_option WHERE page_id = ANY($1) ORDER BY page_id, option_id",
        ),
        TableExport::unscoped("form", "SELECT * FROM form ORDER BY id"),
    ]
}

/// Append plugin-declared tables to the export map.
///
/// A plugin can never replace `page` or a table already in the map, and
/// tables with unusable names are ignored. Returns the names that were
/// skipped.
pub fn merge_table_exports(base: &mut Vec<TableExport>, extra: Vec<TableExport>) -> Vec<String> {
    let mut skipped = Vec::new();
    for table in extra {
        let reserved = table.table == PAGE_TABLE || base.iter().any(|t| t.table == table.table);
        if reserved || !is_valid_table_name(&table.table) {
            skipped.push(table.table);
            continue;
        }
        base.push(table);
    }
    skipped
}

/// What a plugin contributes to a full export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginExport {
    /// Extra `page` rows (their ids join the scoped page set).
    #[serde(default)]
    pub pages: Vec<Row>,
    /// Extra tables to dump.
    #[serde(default)]
    pub tables: Vec<TableExport>,
    /// Extra media paths relative to the website root.
    #[serde(default)]
    pub media: Vec<String>,
}

// ---------------------------------------------------------------------------
// Dump
// ---------------------------------------------------------------------------

/// Table name to ordered rows, in export order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataDump {
    tables: IndexMap<String, Vec<Row>>,
}

impl DataDump {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a dump and check every table name.
    pub fn parse(input: &str) -> Result<Self, DumpError> {
        let dump: DataDump = serde_json::from_str(input)?;
        if let Some(bad) = dump.tables.keys().find(|t| !is_valid_table_name(t)) {
            return Err(DumpError::InvalidTable(bad.clone()));
        }
        Ok(dump)
    }

    pub fn to_json_pretty(&self) -> Result<String, DumpError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Set the rows for a table, keeping its original position if present.
    pub fn insert(&mut self, table: impl Into<String>, rows: Vec<Row>) {
        self.tables.insert(table.into(), rows);
    }

    pub fn rows(&self, table: &str) -> Option<&[Row]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Tables with at least one row, in dump order.
    pub fn non_empty_tables(&self) -> impl Iterator<Item = (&str, &[Row])> {
        self.tables
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(t, rows)| (t.as_str(), rows.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Distinct `id`s of the `page` rows, in row order.
    pub fn page_ids(&self) -> Vec<DbId> {
        let mut ids: Vec<DbId> = Vec::new();
        for row in self.rows(PAGE_TABLE).unwrap_or_default() {
            if let Some(id) = row.get("id").and_then(row_id) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }
}

/// Read an id that may have been stored as a number or numeric string.
fn row_id(value: &serde_json::Value) -> Option<DbId> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn table_name_rules() {
        assert!(is_valid_table_name("page_has_option"));
        assert!(is_valid_table_name("_plugin"));
        assert!(!is_valid_table_name("page; DROP TABLE page"));
        assert!(!is_valid_table_name("1page"));
        assert!(!is_valid_table_name(""));
    }

    #[test]
    fn builtin_tables_scope() {
        let tables = builtin_tables();
        let scoped: Vec<&str> = tables
            .iter()
            .filter(|t| t.page_scoped)
            .map(|t| t.table.as_str())
            .collect();
        assert_eq!(scoped, vec!["container", "page_fa", "page_has_option"]);
        assert!(tables.iter().all(|t| t.table != PAGE_TABLE));
    }

    #[test]
    fn plugin_tables_never_override_builtin() {
        let mut base = builtin_tables();
        let skipped = merge_table_exports(
            &mut base,
            vec![
                TableExport::unscoped("container", "SELECT 1"),
                TableExport::unscoped("page", "SELECT 1"),
                TableExport::unscoped("bad name", "SELECT 1"),
                TableExport::scoped("shopping_product", "SELECT * FROM shopping_product"),
            ],
        );
        assert_eq!(skipped, vec!["container", "page", "bad name"]);
        assert_eq!(base.len(), builtin_tables().len() + 1);
        assert_eq!(base.last().unwrap().table, "shopping_product");
        let container = base.iter().find(|t| t.table == "container").unwrap();
        assert!(container.query.contains("ANY($1)"));
    }

    #[test]
    fn parse_keeps_table_order() {
        let dump = DataDump::parse(
            r#"{"page": [{"id": 1}, {"id": "2"}, {"id": 1}], "container": [], "form": [{"id": 9}]}"#,
        )
        .unwrap();
        assert_eq!(
            dump.table_names().collect::<Vec<_>>(),
            vec!["page", "container", "form"]
        );
        assert_eq!(dump.page_ids(), vec![1, 2]);
        let non_empty: Vec<&str> = dump.non_empty_tables().map(|(t, _)| t).collect();
        assert_eq!(non_empty, vec!["page", "form"]);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_matches!(DataDump::parse("{not json"), Err(DumpError::Parse(_)));
        assert_matches!(DataDump::parse(r#"{"page": {}}"#), Err(DumpError::Parse(_)));
        assert_matches!(
            DataDump::parse(r#"{"page x": []}"#),
            Err(DumpError::InvalidTable(t)) if t == "page x"
        );
    }

    #[test]
    fn serializes_as_plain_mapping() {
        let mut dump = DataDump::new();
        let row = json!({"id": 1, "h1": "Home", "draft": false, "teaser_text": null});
        dump.insert(PAGE_TABLE, vec![row.as_object().cloned().unwrap()]);
        let text = dump.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["page"][0]["h1"], "Home");
        assert!(value["page"][0]["teaser_text"].is_null());
        assert_eq!(DataDump::parse(&text).unwrap(), dump);
    }
}
