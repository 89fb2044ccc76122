use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colored::Colorize;
use lsif_debug_core::{
    linked_output_path, resolve_lsif_files, write_lines, Diagnostics, LinkOptions, Linker,
    LsifFileKind, Shard,
};

use crate::console;

pub fn cmd_link(path: &Path, source: &Path, options: LinkOptions) -> Result<bool> {
    let path = if path.is_dir() {
        path.canonicalize()
            .with_context(|| format!("failed to resolve {}", path.display()))?
    } else {
        path.to_path_buf()
    };

    let inputs = resolve_lsif_files(&path, LsifFileKind::Shard)
        .with_context(|| format!("failed to resolve shards under {}", path.display()))?;
    if inputs.is_empty() {
        bail!("no .lsif shards found under {}", path.display());
    }
    let out = linked_output_path(&path);

    let linker = Linker::new(source, options)
        .with_context(|| format!("failed to index source directory {}", source.display()))?;
    eprintln!(
        "{} {} shard(s) against {}",
        "Linking".green().bold(),
        inputs.len(),
        linker.workspace_root()
    );

    let mut diagnostics = Diagnostics::new();
    let shards = read_shards(&inputs, &mut diagnostics);
    let output = linker.link(&shards);

    for summary in &output.shards {
        console::write_success(&format!(
            "{} ({} records, ids from {}, {} paths linked, {} documents embedded)",
            summary.name,
            summary.records,
            summary.id_offset,
            summary.linked_paths,
            summary.embedded_documents
        ));
    }

    let lines = output.to_lines()?;
    write_lines(&out, &lines).with_context(|| format!("failed to write {}", out.display()))?;
    eprintln!("{} {}", "wrote".green().bold(), out.display().to_string().bold());

    diagnostics.extend(output.diagnostics);
    console::replay(&diagnostics);
    Ok(!diagnostics.has_errors())
}

/// Unreadable shards are reported and left out; the rest still link.
fn read_shards(inputs: &[PathBuf], diagnostics: &mut Diagnostics) -> Vec<Shard> {
    inputs
        .iter()
        .filter_map(|input| match Shard::read(input) {
            Ok(shard) => Some(shard),
            Err(err) => {
                diagnostics.error(format!("failed to read shard, skipping: {err}"));
                None
            }
        })
        .collect()
}
