//! Locating `.lsif` inputs and naming outputs.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{LsifError, Result};

pub const LSIF_EXTENSION: &str = "lsif";
pub const NORMALIZED_SUFFIX: &str = ".normalized.lsif";
pub const LINKED_SUFFIX: &str = ".linked.lsif";

/// Which `.lsif` files a directory walk should pick up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LsifFileKind {
    /// Raw producer output (no generated files).
    Shard,
    /// Anything but our own flatten output.
    Flattenable,
    /// Output of `link`.
    Linked,
}

impl LsifFileKind {
    fn accepts(self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        if !lower.ends_with(&format!(".{LSIF_EXTENSION}")) {
            return false;
        }
        let normalized = lower.ends_with(NORMALIZED_SUFFIX);
        let linked = lower.ends_with(LINKED_SUFFIX);
        match self {
            LsifFileKind::Shard => !normalized && !linked,
            LsifFileKind::Flattenable => !normalized,
            LsifFileKind::Linked => linked,
        }
    }
}

/// A file path is returned as is; a directory is walked recursively and the
/// matching files returned in sorted path order.
pub fn resolve_lsif_files(path: &Path, kind: LsifFileKind) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(LsifError::InvalidPath {
            path: path.to_path_buf(),
            message: "no such file or directory".to_string(),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| LsifError::InvalidPath {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if entry.file_type().is_file() && kind.accepts(&entry.file_name().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// `<input>.normalized.lsif`, next to the input.
pub fn normalized_output_path(input: &Path) -> PathBuf {
    append_suffix(input, NORMALIZED_SUFFIX)
}

/// `foo.lsif` → `foo.linked.lsif`; a directory `dir/` → sibling `dir.linked.lsif`.
pub fn linked_output_path(input: &Path) -> PathBuf {
    if input.is_dir() || input.extension().is_none() {
        append_suffix(input, LINKED_SUFFIX)
    } else {
        input.with_extension(LINKED_SUFFIX.trim_start_matches('.'))
    }
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    // Re-collecting components drops a trailing separator (`dir/` → `dir`).
    let mut text = path.components().collect::<PathBuf>().into_os_string();
    text.push(suffix);
    PathBuf::from(text)
}

pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| LsifError::io(path, e))
}

/// Write one record per line. The parent directory must already exist.
pub fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        if !parent.is_dir() {
            return Err(LsifError::InvalidPath {
                path: path.to_path_buf(),
                message: "output directory does not exist".to_string(),
            });
        }
    }

    let mut text = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    fs::write(path, text).map_err(|e| LsifError::io(path, e))
}
