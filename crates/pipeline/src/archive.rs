//! Zip packing and extraction of theme directories.
//!
//! Both directions are blocking and meant to run under `spawn_blocking`.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use themesmith_core::error::CoreError;
use themesmith_core::theme::is_excluded;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{ThemeError, ThemeResult};
use crate::files::list_files;

/// A file injected into an archive from outside the theme directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub source: PathBuf,
    /// Entry name inside the archive.
    pub name: String,
}

/// Write `theme_dir` plus `extra` files to a zip at `dest`.
///
/// Theme files matching `excluded` are left out. An injected entry whose
/// name is already taken by a theme file is skipped. Returns the number of
/// entries written.
pub fn pack(
    theme_dir: &Path,
    extra: &[ArchiveEntry],
    excluded: &[String],
    dest: &Path,
) -> ThemeResult<usize> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| ThemeError::io(parent, e))?;
    }
    let file = fs::File::create(dest).map_err(|e| ThemeError::io(dest, e))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut written: HashSet<String> = HashSet::new();

    for rel in list_files(theme_dir)? {
        if is_excluded(&rel, excluded) {
            continue;
        }
        let source = theme_dir.join(&rel);
        append(&mut writer, &source, &rel, options)?;
        written.insert(rel);
    }

    for entry in extra {
        if written.contains(&entry.name) {
            continue;
        }
        if !entry.source.is_file() {
            tracing::debug!(path = %entry.source.display(), "Media file vanished before packing");
            continue;
        }
        append(&mut writer, &entry.source, &entry.name, options)?;
        written.insert(entry.name.clone());
    }

    writer.finish()?;
    Ok(written.len())
}

fn append(
    writer: &mut ZipWriter<fs::File>,
    source: &Path,
    name: &str,
    options: SimpleFileOptions,
) -> ThemeResult<()> {
    let mut input = fs::File::open(source).map_err(|e| ThemeError::io(source, e))?;
    writer.start_file(name, options)?;
    io::copy(&mut input, writer).map_err(|e| ThemeError::io(source, e))?;
    Ok(())
}

/// Names of the file entries in an archive.
pub fn entry_names(bytes: &[u8]) -> ThemeResult<Vec<String>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut names = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if !entry.is_dir() {
            names.push(entry.name().to_string());
        }
    }
    Ok(names)
}

/// Extract every entry of `bytes` below `dest_dir`.
///
/// When all entries share one top-level folder that folder is stripped,
/// so archives of `business/...` and of the bare theme contents install
/// alike. Entries that would land outside `dest_dir` reject the whole
/// archive before anything is written. Returns the relative paths written.
pub fn extract(bytes: &[u8], dest_dir: &Path) -> ThemeResult<Vec<String>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut planned: Vec<(usize, PathBuf)> = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(path) = entry.enclosed_name() else {
            return Err(CoreError::Validation(format!(
                "Archive entry '{}' escapes the theme directory",
                entry.name()
            ))
            .into());
        };
        planned.push((i, path));
    }

    let prefix = common_root(planned.iter().map(|(_, p)| p.as_path()));

    let mut written = Vec::new();
    for (i, path) in planned {
        let rel = match &prefix {
            Some(prefix) => path.strip_prefix(prefix).unwrap_or(path.as_path()).to_path_buf(),
            None => path,
        };
        let out_path = dest_dir.join(&rel);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ThemeError::io(parent, e))?;
        }
        let mut entry = archive.by_index(i)?;
        let mut output = fs::File::create(&out_path).map_err(|e| ThemeError::io(&out_path, e))?;
        io::copy(&mut entry, &mut output).map_err(|e| ThemeError::io(&out_path, e))?;
        written.push(rel.to_string_lossy().replace('\\', "/"));
    }
    Ok(written)
}

/// The single top-level folder shared by every path, if any.
fn common_root<'a>(paths: impl Iterator<Item = &'a Path>) -> Option<PathBuf> {
    let mut root: Option<&std::ffi::OsStr> = None;
    for path in paths {
        let mut components = path.components();
        let first = components.next()?;
        // A file at the archive root means there is no wrapping folder.
        components.next()?;
        match root {
            None => root = Some(first.as_os_str()),
            Some(r) if r == first.as_os_str() => {}
            Some(_) => return None,
        }
    }
    root.map(PathBuf::from)
}
