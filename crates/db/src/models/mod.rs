//! Row structs and DTOs.
//!
//! `template`, `config` and `plugin` map single tables. `dump` holds the
//! report produced when a data dump is replayed.

pub mod config;
pub mod dump;
pub mod plugin;
pub mod template;
