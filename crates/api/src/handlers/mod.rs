pub mod templates;
pub mod themes;
