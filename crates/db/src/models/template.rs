//! Template models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use themesmith_core::template::TemplateType;
use themesmith_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A `template` row.
///
/// `template_type` is the stored type name (`typeregular`, `typemobile`, ...).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Template {
    pub id: DbId,
    pub name: String,
    pub content: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub template_type: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Template {
    /// Parsed type, falling back to regular for unknown stored values.
    pub fn kind(&self) -> TemplateType {
        TemplateType::from_name(&self.template_type).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for inserting a template.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplate {
    pub name: String,
    pub content: String,
    pub template_type: TemplateType,
}

// ---------------------------------------------------------------------------
// Update DTO
// ---------------------------------------------------------------------------

/// Patch for an existing template, located by its current name.
/// `None` fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTemplate {
    pub name: Option<String>,
    pub content: Option<String>,
    pub template_type: Option<TemplateType>,
}
