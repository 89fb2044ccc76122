use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use lsif_debug_core::files::read_text;
use lsif_debug_core::{
    flatten_text, normalized_output_path, resolve_lsif_files, write_lines, Diagnostics,
    FlattenOptions, FlattenOutput, LsifFileKind,
};

use crate::console;

pub fn cmd_flatten(path: &Path, options: &FlattenOptions) -> Result<bool> {
    let inputs = resolve_lsif_files(path, LsifFileKind::Flattenable)
        .with_context(|| format!("failed to resolve inputs under {}", path.display()))?;
    if inputs.is_empty() {
        console::write_warning(&format!("no .lsif files found under {}", path.display()));
        return Ok(true);
    }

    let mut diagnostics = Diagnostics::new();
    for input in &inputs {
        eprintln!("{} {}", "Flattening".green().bold(), input.display());
        match flatten_file(input, options) {
            Ok(output) => {
                if output.remaining_active_documents > 0 || output.remaining_active_projects > 0 {
                    console::write_info(&format!(
                        "{} document(s) and {} project(s) were never ended",
                        output.remaining_active_documents, output.remaining_active_projects
                    ));
                }
                diagnostics.extend(output.diagnostics);
            }
            Err(err) => diagnostics.error(format!("{}: {err:#}", input.display())),
        }
    }

    console::replay(&diagnostics);
    Ok(!diagnostics.has_errors())
}

fn flatten_file(input: &Path, options: &FlattenOptions) -> Result<FlattenOutput> {
    let text = read_text(input)?;
    let output = flatten_text(&text, options)
        .with_context(|| format!("failed to flatten {}", input.display()))?;

    let out = normalized_output_path(input);
    write_lines(&out, &output.lines)
        .with_context(|| format!("failed to write {}", out.display()))?;

    console::write_success(&format!(
        "{} records → {}",
        output.lines.len(),
        out.display().to_string().bold()
    ));
    Ok(output)
}
