//! Command-line interface for dormkeep.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// Dormkeep - campus dormitory and repair ticket service
#[derive(Parser)]
#[command(name = "dormkeep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of the search paths
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server
    #[default]
    Serve,

    /// Create default config file
    Init,

    /// Load and validate the configuration, then exit
    CheckConfig,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load_from_path(path),
            None => Config::load(),
        }
    }

    #[must_use]
    pub fn command(&self) -> Commands {
        self.command.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_is_default() {
        let cli = Cli::parse_from(["dormkeep"]);
        assert_eq!(cli.command(), Commands::Serve);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::parse_from(["dormkeep", "check-config", "--config", "/tmp/dk.toml"]);
        assert_eq!(cli.command(), Commands::CheckConfig);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/dk.toml")));

        let cli = Cli::parse_from(["dormkeep", "init"]);
        assert_eq!(cli.command(), Commands::Init);
    }
}
