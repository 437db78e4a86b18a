//! Outcome of replaying a data dump.

use serde::Serialize;

/// Counts for one replayed table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReplay {
    pub table: String,
    pub deleted: u64,
    pub inserted: u64,
}

/// A dump row the database refused. The rest of its table still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub table: String,
    /// Zero-based position of the row in the dump.
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub tables: Vec<TableReplay>,
    pub skipped_rows: Vec<SkippedRow>,
    /// Dump tables that do not exist in this database.
    pub missing_tables: Vec<String>,
    /// Rows removed from the derived `optimized` cache.
    pub optimized_purged: u64,
}

impl ReplayReport {
    pub fn inserted_total(&self) -> u64 {
        self.tables.iter().map(|t| t.inserted).sum()
    }

    pub fn table(&self, name: &str) -> Option<&TableReplay> {
        self.tables.iter().find(|t| t.table == name)
    }

    /// Every row of every table was loaded.
    pub fn is_clean(&self) -> bool {
        self.skipped_rows.is_empty() && self.missing_tables.is_empty()
    }
}
