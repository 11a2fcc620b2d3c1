//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Stamp static asset pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Source directory path (relative to project root)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub source: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Config file path (default: stamp.toml)
    #[arg(short = 'C', long, global = true, default_value = "stamp.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Copy the source tree and fingerprint its stylesheets and scripts
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },
}

/// Build command arguments
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Minify the final HTML
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub minify: Option<bool>,

    /// Keep `console.*` calls in minified scripts
    #[arg(long)]
    pub keep_console: bool,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build() {
        let cli = Cli::try_parse_from(["stamp", "build", "-o", "out", "--minify=false", "-V"]).unwrap();
        assert_eq!(cli.output, Some(PathBuf::from("out")));
        assert_eq!(cli.config, PathBuf::from("stamp.toml"));
        let Commands::Build { build_args } = cli.command;
        assert_eq!(build_args.minify, Some(false));
        assert!(build_args.verbose);
        assert!(!build_args.keep_console);
    }

    #[test]
    fn test_parse_alias() {
        let cli = Cli::try_parse_from(["stamp", "b", "--source", "src"]).unwrap();
        assert_eq!(cli.source, Some(PathBuf::from("src")));
    }

    #[test]
    fn test_minify_flag_without_value() {
        let cli = Cli::try_parse_from(["stamp", "build", "-m"]).unwrap();
        let Commands::Build { build_args } = cli.command;
        assert_eq!(build_args.minify, Some(true));
    }
}
