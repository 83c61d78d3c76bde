//! CLI arguments and subcommands for nvidia-smi-exporter.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Parses "5s", "1m30s", "400ms" and friends.
fn parse_interval(s: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(s)
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "nvidia-smi-exporter",
    about = "Prometheus exporter for nvidia-smi GPU metrics",
    long_about = "Prometheus exporter for nvidia-smi GPU metrics.\n\n\
                  Runs nvidia-smi in streaming mode and exposes memory, utilization, \
                  temperature and power draw per GPU on /metrics.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// How often to request stats from nvidia-smi (e.g. 5s, 1m)
    #[arg(long, value_parser = parse_interval)]
    pub interval: Option<Duration>,

    /// HTTP port to expose metrics on
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Path to the nvidia-smi binary
    #[arg(long = "nvidia-smi")]
    pub nvidia_smi: Option<PathBuf>,

    /// Log level (overrides config file)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Query nvidia-smi once and print the parsed samples
    Test {
        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_leave_overrides_unset() {
        let args = Args::try_parse_from(["nvidia-smi-exporter"]).unwrap();
        assert!(args.interval.is_none());
        assert!(args.port.is_none());
        assert!(args.log_level.is_none());
        assert!(args.command.is_none());
    }

    #[test]
    fn test_interval_accepts_human_durations() {
        let args =
            Args::try_parse_from(["nvidia-smi-exporter", "--interval", "1m30s", "-p", "9000"])
                .unwrap();
        assert_eq!(args.interval, Some(Duration::from_secs(90)));
        assert_eq!(args.port, Some(9000));

        let args = Args::try_parse_from(["nvidia-smi-exporter", "--interval", "400ms"]).unwrap();
        assert_eq!(args.interval, Some(Duration::from_millis(400)));
    }

    #[test]
    fn test_interval_rejects_garbage() {
        assert!(Args::try_parse_from(["nvidia-smi-exporter", "--interval", "often"]).is_err());
    }

    #[test]
    fn test_test_subcommand() {
        let args = Args::try_parse_from(["nvidia-smi-exporter", "test", "--format", "json"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Commands::Test {
                format: ConfigFormat::Json
            })
        ));
    }
}
