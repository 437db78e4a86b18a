//! Site configuration key-value rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Key under which the active theme name is stored.
pub const CURRENT_THEME_KEY: &str = "currentTheme";

/// A `config` row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub name: String,
    pub value: String,
}
