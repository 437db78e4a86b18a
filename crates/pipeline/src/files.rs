//! Blocking filesystem helpers. Callers run them on the blocking pool.

use std::fs;
use std::path::Path;

use crate::error::{ThemeError, ThemeResult};

/// Every regular file below `root`, as sorted `/`-separated relative paths.
///
/// A missing `root` yields an empty list.
pub fn list_files(root: &Path) -> ThemeResult<Vec<String>> {
    let mut files = Vec::new();
    if root.is_dir() {
        collect(root, root, &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<String>) -> ThemeResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| ThemeError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ThemeError::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| ThemeError::io(&path, e))?;
        if file_type.is_dir() {
            collect(root, &path, out)?;
        } else if file_type.is_file() {
            if let Ok(rel) = path.strip_prefix(root) {
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    Ok(())
}

/// Copy `source` to `dest`, creating parent directories.
pub fn copy_file(source: &Path, dest: &Path) -> ThemeResult<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| ThemeError::io(parent, e))?;
    }
    fs::copy(source, dest).map_err(|e| ThemeError::io(source, e))
}
