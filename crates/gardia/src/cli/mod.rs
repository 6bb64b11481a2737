//! Command-line interface for gardia.
//!
//! This module provides the CLI structure for the `gardia` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

pub use commands::{CompactCommand, ConfigCommand, ServeCommand};

/// gardia - Emergency reports over a Meshtastic mesh
///
/// Serves a web form for incident reports and relays each report as a
/// compact JSON text message on a Meshtastic channel.
#[derive(Debug, Parser)]
#[command(name = "gardia")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the web server
    Serve(ServeCommand),

    /// Print the payload a report would be sent as
    Compact(CompactCommand),

    /// View or initialize configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Verbosity from the flags, or from `configured` (the `logging.level`
    /// value) when no flag is given.
    #[must_use]
    pub fn verbosity(&self, configured: &str) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::from_config_level(configured),
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }

    /// Configuration file in use.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
        assert_eq!(Cli::command().get_name(), "gardia");
    }

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(parse(&["gardia", "-q", "serve"]).verbosity("DEBUG"), Verbosity::Quiet);
        assert_eq!(parse(&["gardia", "-v", "serve"]).verbosity("ERROR"), Verbosity::Verbose);
        assert_eq!(parse(&["gardia", "-vv", "serve"]).verbosity("INFO"), Verbosity::Trace);
    }

    #[test]
    fn test_verbosity_from_config() {
        let cli = parse(&["gardia", "serve"]);
        assert_eq!(cli.verbosity("WARNING"), Verbosity::Warnings);
        assert_eq!(cli.verbosity("INFO"), Verbosity::Normal);
    }

    #[test]
    fn test_parse_serve() {
        let cli = parse(&["gardia", "serve", "--dry-run"]);
        assert!(matches!(cli.command, Command::Serve(ServeCommand { dry_run: true })));
    }

    #[test]
    fn test_parse_compact() {
        let cli = parse(&[
            "gardia", "compact", "--name", "Jean", "--phone", "06", "--address", "Paris",
            "--type", "Incendie", "--limit", "120",
        ]);
        let Command::Compact(cmd) = cli.command else {
            panic!("expected compact");
        };
        assert_eq!(cmd.incident_type, "Incendie");
        assert_eq!(cmd.limit, Some(120));
        assert!(cmd.details.is_empty());
    }

    #[test]
    fn test_parse_config_commands() {
        let cli = parse(&["gardia", "config", "init", "--force"]);
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Init { force: true })));

        let cli = parse(&["gardia", "-c", "/srv/gardia.yaml", "config", "path"]);
        assert_eq!(cli.config_path(), PathBuf::from("/srv/gardia.yaml"));
    }

    #[test]
    fn test_default_config_path() {
        assert_eq!(parse(&["gardia", "config", "path"]).config_path(), PathBuf::from("config.yaml"));
    }

    #[test]
    fn test_compact_requires_fields() {
        assert!(Cli::try_parse_from(["gardia", "compact", "--name", "Jean"]).is_err());
    }
}
