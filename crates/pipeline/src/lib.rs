//! Theme import, export and apply.
//!
//! Components, leaf first:
//!
//! - [`store::TemplateStore`]: mirrors a theme's `.html` files into the
//!   template table.
//! - [`media::MediaResolver`]: finds the media files an export must carry.
//! - [`dump::DataDumpCodec`]: writes and replays the `theme.json` dump.
//! - [`packager::ThemePackager`]: assembles exports, either as a zip
//!   archive or copied in place as a backup.
//! - [`applier::ThemeApplier`]: drives the apply state machine.
//! - [`catalog::ThemeCatalog`]: lists, installs and deletes theme
//!   directories.
//!
//! Collaborators are injected: [`settings::ThemeSettings`] for paths and
//! limits, a [`cache::CacheInvalidator`], and a [`plugins::PluginRegistry`].

pub mod applier;
pub mod archive;
pub mod cache;
pub mod catalog;
pub mod dump;
pub mod error;
mod files;
pub mod media;
pub mod packager;
pub mod plugins;
pub mod settings;
pub mod store;

pub use error::{ThemeError, ThemeResult};
pub use settings::ThemeSettings;
