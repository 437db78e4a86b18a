/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A dynamic table row as moved through the data dump: column name to value.
pub type Row = serde_json::Map<String, serde_json::Value>;
