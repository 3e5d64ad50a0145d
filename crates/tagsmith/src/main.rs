//! Tagsmith CLI - bulk image tagging with a DeepDanbooru-style classifier.
//!
//! Tagsmith classifies every image in a folder, lets you curate the proposed
//! tags, and stores the accepted tags in each image's metadata (or a `.txt`
//! sidecar next to it).
//!
//! # Usage
//!
//! ```bash
//! # Predict tags for a folder and export them
//! tagsmith predict ./pictures --output tags.jsonl --format jsonl
//!
//! # Predict and write the default-accepted tags into every image
//! tagsmith predict ./pictures --write
//!
//! # Review tags image by image before writing them
//! tagsmith review ./pictures
//!
//! # Inspect or overwrite stored tags
//! tagsmith read ./pictures/cat.png
//! tagsmith write ./pictures/cat.png "rating:safe, cat, sitting"
//!
//! # View configuration
//! tagsmith config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Tagsmith - bulk image tagging with a DeepDanbooru-style classifier.
#[derive(Parser, Debug)]
#[command(name = "tagsmith")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Predict tags for every image in a folder
    Predict(cli::predict::PredictArgs),

    /// Predict tags, then review and write them interactively
    Review(cli::review::ReviewArgs),

    /// Print the tags stored in an image
    Read(cli::tags::ReadArgs),

    /// Store a tag string in an image
    Write(cli::tags::WriteArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match tagsmith_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `tagsmith config path`."
            );
            tagsmith_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Tagsmith v{}", tagsmith_core::VERSION);

    match cli.command {
        Commands::Predict(args) => cli::predict::execute(args, config).await,
        Commands::Review(args) => cli::review::execute(args, config).await,
        Commands::Read(args) => cli::tags::read(args, &config),
        Commands::Write(args) => cli::tags::write(args, &config),
        Commands::Config(args) => cli::config::execute(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_predict_with_overrides() {
        let cli = Cli::try_parse_from([
            "tagsmith",
            "predict",
            "./pics",
            "--general",
            "40",
            "--character",
            "90",
            "--format",
            "jsonl",
            "--write",
        ])
        .unwrap();

        match cli.command {
            Commands::Predict(args) => {
                assert_eq!(args.run.dir, PathBuf::from("./pics"));
                assert_eq!(args.run.general, Some(40));
                assert_eq!(args.run.character, Some(90));
                assert!(args.write);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        assert!(Cli::try_parse_from(["tagsmith", "predict", ".", "--general", "0"]).is_err());
        assert!(Cli::try_parse_from(["tagsmith", "predict", ".", "--general", "101"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tagsmith", "read", "a.png", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(!cli.json_logs);
    }

    #[test]
    fn parses_config_set() {
        let cli =
            Cli::try_parse_from(["tagsmith", "config", "set", "writer.kind", "sidecar"]).unwrap();
        assert!(matches!(cli.command, Commands::Config(_)));
    }
}
