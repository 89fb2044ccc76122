//! lsif-debug CLI
//!
//! Command-line interface for inspecting LSIF dumps:
//! - `flatten`: annotate records with human-readable derived fields
//! - `link`: merge CI-produced shards into one dump bound to a local checkout
//! - `visualize`: open linked dumps in an external editor

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use lsif_debug_core::{FlattenOptions, LinkOptions};
use tracing_subscriber::EnvFilter;

mod console;
mod flatten;
mod link;
mod visualize;

use visualize::VisualizeOptions;

#[derive(Parser)]
#[command(name = "lsif-debug")]
#[command(author, version, about = "Flatten, link and visualize LSIF dumps")]
struct Cli {
    #[command(flatten)]
    log: LogArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct LogArgs {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

impl LogArgs {
    fn default_directive(&self) -> &'static str {
        match self.verbose {
            0 => "error",
            1 => "info",
            _ => "debug",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Add derived, human-readable fields to every record.
    ///
    /// A directory is searched recursively for `.lsif` files; each one is
    /// written next to itself as `<file>.normalized.lsif`.
    Flatten {
        /// Input `.lsif` file or directory
        path: PathBuf,
        /// Pretty-print each record
        #[arg(long)]
        format_output: bool,
        /// Replace identifiers with placeholders so differently numbered dumps diff cleanly
        #[arg(long)]
        strip_ids: bool,
        /// Sort output records
        #[arg(long)]
        sort_output: bool,
        /// Warn about ranges without a containing document
        #[arg(long)]
        strict: bool,
    },

    /// Merge shards into one dump whose paths point into a local checkout.
    ///
    /// A directory's shards are linked in sorted path order into the sibling
    /// `<dir>.linked.lsif`; a single file becomes `<stem>.linked.lsif`.
    Link {
        /// Shard `.lsif` file or directory of shards
        path: PathBuf,
        /// Local source checkout the dump was generated from
        source: PathBuf,
        /// Do not embed document contents
        #[arg(long)]
        no_embed: bool,
    },

    /// Open linked dumps in an editor with the LSIF visualizer extension.
    Visualize {
        /// `.linked.lsif` file or directory containing them
        path: PathBuf,
        /// Editor executable (default: `code` found on PATH)
        #[arg(long)]
        editor: Option<PathBuf>,
        /// Visualizer extension package to install when missing
        #[arg(long)]
        extension_vsix: Option<PathBuf>,
    },
}

fn init_tracing(log: &LogArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log.default_directive()));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            console::write_error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every input was processed successfully.
fn run(command: Commands) -> Result<bool> {
    match command {
        Commands::Flatten {
            path,
            format_output,
            strip_ids,
            sort_output,
            strict,
        } => {
            let options = FlattenOptions {
                format_output,
                strip_ids,
                sort_output,
                report_unresolved_documents: strict,
            };
            flatten::cmd_flatten(&path, &options)
        }
        Commands::Link {
            path,
            source,
            no_embed,
        } => {
            let options = LinkOptions {
                embed_contents: !no_embed,
            };
            link::cmd_link(&path, &source, options)
        }
        Commands::Visualize {
            path,
            editor,
            extension_vsix,
        } => {
            let options = VisualizeOptions {
                editor,
                extension_vsix,
            };
            visualize::cmd_visualize(&path, &options)
        }
    }
}
