//! TippyTap CLI - Markdown round-trip editor engine.
//!
//! Provides commands for:
//! - `render`: Render a Markdown file to HTML
//! - `fmt`: Rewrite a Markdown file in canonical form
//! - `diff`: Show a word diff of two Markdown files
//! - `toc`: Print a file's table of contents
//! - `watch`: Watch a file for external changes and resolve them

mod commands;
mod error;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{DiffArgs, FmtArgs, RenderArgs, TocArgs, WatchArgs};
use error::CliError;
use output::Output;

/// TippyTap - Markdown round-trip editor engine.
#[derive(Parser)]
#[command(name = "tippytap", version, about)]
struct Cli {
    /// Path to configuration file (default: auto-discover tippytap.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a Markdown file to HTML.
    Render(RenderArgs),
    /// Rewrite a Markdown file in canonical form.
    Fmt(FmtArgs),
    /// Show a word diff of two Markdown files.
    Diff(DiffArgs),
    /// Print the table of contents of a Markdown file.
    Toc(TocArgs),
    /// Watch a Markdown file and resolve external changes.
    Watch(WatchArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli) {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Render(args) => runtime()?.block_on(args.execute(config)),
        Commands::Fmt(args) => args.execute(config),
        Commands::Diff(args) => args.execute(config),
        Commands::Toc(args) => args.execute(),
        Commands::Watch(args) => runtime()?.block_on(args.execute(config)),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
