//! Configuration management for nvidia-smi-exporter.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat, LogLevel};
use nvidia_smi_exporter::interval_seconds;
use nvidia_smi_exporter::sampler::DEFAULT_TOOL;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9523;
pub const DEFAULT_INTERVAL: &str = "5s";

/// Exporter configuration. `None` fields fall back to the defaults above.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Sampling
    /// Poll interval as a human-readable duration ("5s", "1m").
    pub interval: Option<String>,
    #[serde(alias = "nvidia-smi")]
    pub nvidia_smi: Option<PathBuf>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,

    /// File the values were read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            interval: Some(DEFAULT_INTERVAL.to_string()),
            nvidia_smi: Some(PathBuf::from(DEFAULT_TOOL)),
            log_level: Some("info".into()),
            source: None,
        }
    }
}

impl Config {
    /// Effective poll interval.
    pub fn interval(&self) -> Result<Duration, Box<dyn std::error::Error>> {
        let raw = self.interval.as_deref().unwrap_or(DEFAULT_INTERVAL);
        humantime::parse_duration(raw)
            .map_err(|e| format!("Invalid interval '{}': {}", raw, e).into())
    }

    /// Effective listen address. IPv6 literals such as `::1` are accepted.
    pub fn socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        let bind = self.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        let ip: IpAddr = bind
            .parse()
            .map_err(|e| format!("Invalid bind address '{}': {}", bind, e))?;
        Ok(SocketAddr::new(ip, self.port.unwrap_or(DEFAULT_PORT)))
    }

    /// Effective nvidia-smi path.
    pub fn tool(&self) -> PathBuf {
        self.nvidia_smi
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOOL))
    }

    /// Effective log level; CLI already merged in by `resolve_config`.
    pub fn log_level(&self) -> Result<LogLevel, Box<dyn std::error::Error>> {
        match self.log_level.as_deref().unwrap_or("info") {
            "off" => Ok(LogLevel::Off),
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!(
                "Invalid log_level '{}', expected one of off/error/warn/info/debug/trace",
                other
            )
            .into()),
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let interval = cfg.interval()?;
    interval_seconds(interval)?;

    if cfg.tool().as_os_str().is_empty() {
        return Err("nvidia_smi path must not be empty".into());
    }

    cfg.socket_addr()?;

    cfg.log_level()?;

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }
    if let Some(interval) = args.interval {
        config.interval = Some(humantime::format_duration(interval).to_string());
    }
    if let Some(tool) = &args.nvidia_smi {
        config.nvidia_smi = Some(tool.clone());
    }
    if let Some(level) = args.log_level {
        config.log_level = Some(format!("{:?}", level).to_lowercase());
    }

    Ok(config)
}

/// Configuration loading with multiple format support
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(format!("Config file not found: {}", p.display()).into());
            }
            p.to_path_buf()
        }
        None => {
            let defaults = [
                "/etc/nvidia-smi-exporter/config.yaml",
                "./nvidia-smi-exporter.yaml",
                "./nvidia-smi-exporter.json",
            ];

            match defaults.iter().map(|p| Path::new(*p)).find(|p| p.exists()) {
                Some(p) => p.to_path_buf(),
                None => return Ok(Config::default()),
            }
        }
    };

    let content = fs::read_to_string(&path)?;

    // Logging is not set up yet; main reports `source` once it is.
    let mut config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        // Default to YAML
        _ => serde_yaml::from_str(&content)?,
    };
    config.source = Some(path);
    Ok(config)
}

/// Renders configuration in the requested format.
pub fn render_config(
    config: &Config,
    format: &ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, &format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["nvidia-smi-exporter"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    fn config_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = resolve_config(&args(&["--no-config"])).unwrap();
        assert_eq!(config.port, Some(9523));
        assert_eq!(config.interval().unwrap(), Duration::from_secs(5));
        assert_eq!(config.tool(), PathBuf::from("nvidia-smi"));
        validate_effective_config(&config).unwrap();
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = config_file(".yaml", "port: 9100\ninterval: 10s\nlog_level: debug\n");
        let path = file.path().to_str().unwrap();

        let from_file = resolve_config(&args(&["-c", path])).unwrap();
        assert_eq!(from_file.port, Some(9100));
        assert_eq!(from_file.interval().unwrap(), Duration::from_secs(10));

        let overridden =
            resolve_config(&args(&["-c", path, "-p", "9200", "--interval", "2s"])).unwrap();
        assert_eq!(overridden.port, Some(9200));
        assert_eq!(overridden.interval().unwrap(), Duration::from_secs(2));
        assert!(matches!(overridden.log_level().unwrap(), LogLevel::Debug));
    }

    #[test]
    fn test_json_and_toml_files() {
        let json = config_file(".json", r#"{"port": 9301, "nvidia_smi": "/opt/bin/nvidia-smi"}"#);
        let config = load_config(Some(json.path())).unwrap();
        assert_eq!(config.port, Some(9301));
        assert_eq!(config.tool(), PathBuf::from("/opt/bin/nvidia-smi"));

        let toml = config_file(".toml", "port = 9302\ninterval = \"3s\"\n");
        let config = load_config(Some(toml.path())).unwrap();
        assert_eq!(config.port, Some(9302));
        assert_eq!(config.interval().unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn test_loaded_file_is_recorded_as_source() {
        let file = config_file(".toml", "port = 9303\n");
        let config = resolve_config(&args(&["-c", file.path().to_str().unwrap()])).unwrap();
        assert_eq!(config.source.as_deref(), Some(file.path()));

        let config = resolve_config(&args(&["--no-config"])).unwrap();
        assert!(config.source.is_none());

        let rendered = render_config(&Config::default(), &ConfigFormat::Yaml).unwrap();
        assert!(!rendered.contains("source"));
    }

    #[test]
    fn test_ipv6_bind_resolves_to_socket_addr() {
        let config = resolve_config(&args(&["--no-config", "--bind", "::1"])).unwrap();
        validate_effective_config(&config).unwrap();
        assert_eq!(
            config.socket_addr().unwrap(),
            "[::1]:9523".parse::<SocketAddr>().unwrap()
        );

        let config = resolve_config(&args(&["--no-config", "--bind", "127.0.0.1", "-p", "9100"]))
            .unwrap();
        assert_eq!(
            config.socket_addr().unwrap(),
            "127.0.0.1:9100".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(load_config(Some(Path::new("/nonexistent/exporter.yaml"))).is_err());
    }

    #[test]
    fn test_sub_second_interval_is_invalid() {
        let config = resolve_config(&args(&["--no-config", "--interval", "400ms"])).unwrap();
        let err = validate_effective_config(&config).unwrap_err();
        assert!(err.to_string().contains("at least 1 second"));
    }

    #[test]
    fn test_garbage_values_are_invalid() {
        let mut config = Config::default();
        config.interval = Some("soon".into());
        assert!(validate_effective_config(&config).is_err());

        let mut config = Config::default();
        config.bind = Some("not-an-ip".into());
        assert!(validate_effective_config(&config).is_err());

        let mut config = Config::default();
        config.log_level = Some("loud".into());
        assert!(validate_effective_config(&config).is_err());

        let mut config = Config::default();
        config.nvidia_smi = Some(PathBuf::new());
        assert!(validate_effective_config(&config).is_err());
    }

    #[test]
    fn test_render_config_roundtrips_yaml() {
        let rendered = render_config(&Config::default(), &ConfigFormat::Yaml).unwrap();
        let parsed: Config = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(parsed.port, Some(DEFAULT_PORT));
        assert_eq!(parsed.interval.as_deref(), Some(DEFAULT_INTERVAL));
    }
}
