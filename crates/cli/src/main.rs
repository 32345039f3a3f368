// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fab: build FPGA images on a fleet of build hosts

mod color;
mod commands;
mod env;
mod exit_error;
mod logging;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{build::BuildArgs, check::CheckArgs};

#[derive(Parser)]
#[command(
    name = "fab",
    version = env::VERSION,
    about = "Build FPGA images on a fleet of build hosts",
    styles = color::styles()
)]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every job in a recipe, register the images, release the hosts
    Build(BuildArgs),
    /// Validate a recipe and print the job plan
    Check(CheckArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {:#}", e);
        std::process::exit(exit_error::exit_code(&e));
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Flushes the log file when this scope ends
    let _guard = logging::init(&env::log_filter(), cli.log_file.as_deref())?;
    match cli.command {
        Commands::Build(args) => commands::build::handle(args).await,
        Commands::Check(args) => commands::check::handle(args),
    }
}
