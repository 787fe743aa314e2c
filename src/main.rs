// Copyright 2026 Quire Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{Parser, Subcommand};
use quire::cli;

#[derive(Parser)]
#[command(
    name = "quire",
    about = "Quire — bind web-hosted chapters into per-chapter PDFs",
    version,
    after_help = "Run 'quire <command> --help' for details on each command."
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Suppress per-chapter progress output
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect a series' chapter links into chapters.txt
    Discover {
        /// Series landing page URL
        url: String,
    },
    /// Acquire every chapter listed in chapters.txt
    Run,
    /// Acquire a single chapter page
    Chapter {
        /// Chapter page URL
        url: String,
    },
}

fn init_tracing(verbose: bool) {
    let directive = if verbose { "quire=debug" } else { "quire=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let result = match args.command {
        Commands::Discover { url } => cli::discover_cmd::run(&url).await,
        Commands::Run => cli::run_cmd::run(args.quiet).await,
        Commands::Chapter { url } => cli::chapter_cmd::run(&url, args.quiet).await,
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }
    result
}
