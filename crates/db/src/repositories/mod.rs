//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod config_repo;
pub mod dump_repo;
pub mod plugin_repo;
pub mod template_repo;

pub use config_repo::ConfigRepo;
pub use dump_repo::DumpRepo;
pub use plugin_repo::PluginRepo;
pub use template_repo::TemplateRepo;
