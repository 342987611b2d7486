//! Configuration for the sockctl binary.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "sockctl")]
#[command(author = "sockctl authors")]
#[command(version = "0.1.0")]
#[command(about = "Send commands to, or serve, a process control socket", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path of the control socket
    #[arg(short = 'f', long, global = true)]
    pub socket: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error) [default: info]
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub mode: Mode,
}

/// What the binary does once configured
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Send one command with its arguments and print the reply
    Send {
        /// Command name followed by its arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Serve the built-in commands until interrupted
    Serve,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Control socket configuration
#[derive(Debug, Deserialize, Default)]
pub struct ControlConfig {
    /// Path of the control socket
    pub socket: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub socket: PathBuf,
    pub log_level: String,
    pub mode: Mode,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Merge parsed CLI args with the TOML file they name, if any.
    /// CLI arguments take precedence over TOML file values.
    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|source| ConfigError::FileRead {
                    path: config_path.clone(),
                    source,
                })?;
            toml::from_str(&contents).map_err(|source| ConfigError::TomlParse {
                path: config_path.clone(),
                source,
            })?
        } else {
            TomlConfig::default()
        };

        Ok(Config {
            socket: cli
                .socket
                .or(toml_config.control.socket)
                .ok_or(ConfigError::MissingSocket)?,
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
            mode: cli.mode,
        })
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", path.display())]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("No control socket given: pass --socket or set [control] socket in the config file")]
    MissingSocket,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Result<Config, ConfigError> {
        let cli = CliArgs::try_parse_from(args).unwrap();
        Config::from_args(cli)
    }

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.control.socket, None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [control]
            socket = "/run/myapp/ctl.sock"

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.control.socket,
            Some(PathBuf::from("/run/myapp/ctl.sock"))
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_send_arguments() {
        let config =
            parse(&["sockctl", "-f", "/tmp/ctl.sock", "send", "foo", "-x", "baz"]).unwrap();
        assert_eq!(config.socket, PathBuf::from("/tmp/ctl.sock"));
        assert_eq!(config.log_level, "info");
        assert_eq!(
            config.mode,
            Mode::Send {
                args: vec!["foo".to_string(), "-x".to_string(), "baz".to_string()]
            }
        );
    }

    #[test]
    fn test_missing_socket() {
        assert!(matches!(
            parse(&["sockctl", "serve"]),
            Err(ConfigError::MissingSocket)
        ));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[control]\nsocket = \"/from/file.sock\"\n\n[logging]\nlevel = \"warn\""
        )
        .unwrap();
        let config_path = file.path().to_str().unwrap();

        let config = parse(&["sockctl", "-c", config_path, "serve"]).unwrap();
        assert_eq!(config.socket, PathBuf::from("/from/file.sock"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.mode, Mode::Serve);

        let config = parse(&[
            "sockctl",
            "-c",
            config_path,
            "--socket",
            "/from/cli.sock",
            "--log-level",
            "trace",
            "serve",
        ])
        .unwrap();
        assert_eq!(config.socket, PathBuf::from("/from/cli.sock"));
        assert_eq!(config.log_level, "trace");

        // An explicit level wins even when it matches the default.
        let config =
            parse(&["sockctl", "-c", config_path, "--log-level", "info", "serve"]).unwrap();
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_unreadable_file() {
        let err = parse(&["sockctl", "-c", "/nonexistent/sockctl.toml", "-f", "x", "serve"])
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
        assert!(err.to_string().contains("/nonexistent/sockctl.toml"));
    }
}
