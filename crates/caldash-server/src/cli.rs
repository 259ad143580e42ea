//! Command-line interface definition.

use std::path::PathBuf;

use caldash_core::TracingOutputFormat;
use clap::{Parser, Subcommand};

/// caldash - Your Google Calendar in a browser tab
#[derive(Debug, Parser)]
#[command(name = "caldash")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALDASH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on (overrides `server.bind`)
    #[arg(long, env = "CALDASH_BIND")]
    pub bind: Option<String>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log output format: pretty, compact or json
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    pub log_format: TracingOutputFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the web server (default)
    Serve,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::try_parse_from(["caldash"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.debug);
        assert_eq!(cli.log_format, TracingOutputFormat::Pretty);
    }

    #[test]
    fn global_flags() {
        let cli = Cli::try_parse_from([
            "caldash",
            "--config",
            "/tmp/caldash.toml",
            "--bind",
            "0.0.0.0:8080",
            "-v",
            "--log-format",
            "json",
            "serve",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/caldash.toml")));
        assert_eq!(cli.bind.as_deref(), Some("0.0.0.0:8080"));
        assert!(cli.debug);
        assert_eq!(cli.log_format, TracingOutputFormat::Json);
        assert!(matches!(cli.command, Some(Command::Serve)));
    }

    #[test]
    fn config_subcommands() {
        let cli = Cli::try_parse_from(["caldash", "config", "validate"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Validate
            })
        ));
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!(Cli::try_parse_from(["caldash", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
