//! Installed plugin rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use themesmith_core::types::DbId;

pub const STATUS_ENABLED: &str = "enabled";
pub const STATUS_DISABLED: &str = "disabled";

/// A `plugin` row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Plugin {
    pub id: DbId,
    pub name: String,
    pub status: String,
}

impl Plugin {
    pub fn is_enabled(&self) -> bool {
        self.status == STATUS_ENABLED
    }
}
