//! Stamp - minify, bundle and fingerprint the assets of a static site.

mod asset;
mod cli;
mod config;
mod dom;
mod logger;
mod pipeline;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::StampConfig;

fn main() {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    if let Err(e) = run(&cli) {
        log!("error"; "{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = StampConfig::load(cli)?;

    match &cli.command {
        Commands::Build { .. } => cli::build::build(&config).map(|_| ()),
    }
}
