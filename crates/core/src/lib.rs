//! Domain logic for the theme pipeline.
//!
//! Everything in this crate is pure: no database, no HTTP, and only the
//! small amount of path arithmetic needed to reason about theme layouts.
//! The `db` and `pipeline` crates do the I/O on top of these types.

pub mod apply;
pub mod data_dump;
pub mod error;
pub mod media;
pub mod template;
pub mod theme;
pub mod types;
