//! Opening linked dumps in an editor that has the LSIF visualizer extension.
//!
//! The editor is an opaque external process: we only look at whether it can
//! be found and at its exit status.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;
use lsif_debug_core::{resolve_lsif_files, LsifFileKind};

use crate::console;

pub const EXTENSION_ID: &str = "ms-vscode.lsif-visualizer-extension";
pub const EXTENSION_VSIX: &str = "lsif-visualizer-extension-0.0.1.vsix";

const EDITOR_CANDIDATES: &[&str] = &["code", "code.cmd", "code.sh"];

#[derive(Debug, Clone, Default)]
pub struct VisualizeOptions {
    /// Editor executable; discovered on `PATH` when unset.
    pub editor: Option<PathBuf>,
    /// Extension package; defaults to the one shipped next to this binary.
    pub extension_vsix: Option<PathBuf>,
}

pub fn cmd_visualize(path: &Path, options: &VisualizeOptions) -> Result<bool> {
    let linked = resolve_lsif_files(path, LsifFileKind::Linked)
        .with_context(|| format!("failed to resolve linked dumps under {}", path.display()))?;
    if linked.is_empty() {
        bail!(
            "no .linked.lsif files found under {}; run `lsif-debug link` first",
            path.display()
        );
    }

    let editor = match &options.editor {
        Some(editor) => editor.clone(),
        None => env::var_os("PATH")
            .and_then(|paths| find_editor(&paths))
            .ok_or_else(|| {
                anyhow!("could not find `code` on PATH; pass --editor to choose an editor")
            })?,
    };
    tracing::info!(editor = %editor.display(), "using editor");

    ensure_extension(&editor, options)?;

    let mut all_ok = true;
    for file in &linked {
        let file = file
            .canonicalize()
            .with_context(|| format!("failed to resolve {}", file.display()))?;
        eprintln!("{} {}", "Opening".green().bold(), file.display());

        let status = Command::new(&editor)
            .arg(format!("--folder-uri={}", folder_uri(&file)))
            .status()
            .with_context(|| format!("failed to launch {}", editor.display()))?;
        if status.success() {
            console::write_success(&file.display().to_string());
        } else {
            console::write_error(&format!("editor exited with {status} for {}", file.display()));
            all_ok = false;
        }
    }
    Ok(all_ok)
}

fn ensure_extension(editor: &Path, options: &VisualizeOptions) -> Result<()> {
    let out = Command::new(editor)
        .arg("--list-extensions")
        .output()
        .with_context(|| format!("failed to run `{} --list-extensions`", editor.display()))?;
    if !out.status.success() {
        return Err(anyhow!(
            "listing editor extensions failed:\n{}",
            String::from_utf8_lossy(&out.stderr)
        ));
    }
    if has_extension(&String::from_utf8_lossy(&out.stdout)) {
        return Ok(());
    }

    let vsix = match &options.extension_vsix {
        Some(vsix) => vsix.clone(),
        None => bundled_vsix()?,
    };
    console::write_info(&format!("installing {EXTENSION_ID} from {}", vsix.display()));

    let out = Command::new(editor)
        .arg("--install-extension")
        .arg(&vsix)
        .output()
        .with_context(|| format!("failed to install {}", vsix.display()))?;
    if !out.status.success() {
        return Err(anyhow!(
            "installing {EXTENSION_ID} failed:\n{}",
            String::from_utf8_lossy(&out.stderr)
        ));
    }
    Ok(())
}

fn bundled_vsix() -> Result<PathBuf> {
    let exe = env::current_exe().context("failed to locate the lsif-debug executable")?;
    let dir = exe.parent().unwrap_or(Path::new("."));
    Ok(dir.join(EXTENSION_VSIX))
}

fn has_extension(listing: &str) -> bool {
    listing
        .lines()
        .any(|line| line.trim().eq_ignore_ascii_case(EXTENSION_ID))
}

/// First editor candidate present in any directory of a `PATH`-style list.
fn find_editor(paths: &OsStr) -> Option<PathBuf> {
    env::split_paths(paths).find_map(|dir| {
        EDITOR_CANDIDATES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

/// `lsif:///<path>` with forward slashes, as the visualizer extension expects.
fn folder_uri(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    format!("lsif:///{}", text.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_folder_uri() {
        assert_eq!(
            folder_uri(Path::new("/tmp/out/shards.linked.lsif")),
            "lsif:///tmp/out/shards.linked.lsif"
        );
    }

    #[test]
    fn test_extension_listing() {
        assert!(has_extension("ms-python.python\nms-vscode.lsif-visualizer-extension\n"));
        assert!(!has_extension("ms-python.python\n"));
    }

    #[test]
    fn test_find_editor_scans_path_in_order() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        fs::write(second.path().join("code.sh"), "#!/bin/sh\n").unwrap();

        let paths = env::join_paths([first.path(), second.path()]).unwrap();
        assert_eq!(find_editor(&paths), Some(second.path().join("code.sh")));

        let empty = env::join_paths([first.path()]).unwrap();
        assert_eq!(find_editor(&empty), None);
    }

    #[test]
    fn test_missing_linked_files_fail() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.lsif"), "").unwrap();
        assert!(cmd_visualize(dir.path(), &VisualizeOptions::default()).is_err());
    }
}
