//! TOML-backed host configuration.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use shell_engine::SessionConfig;

use crate::error::{TerminalError, TerminalResult};

/// Settings of the `ping` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PingConfig {
    /// Probes sent before the command completes on its own.
    pub attempts: u32,
    /// Delay between probes, in milliseconds.
    pub interval_ms: u64,
    /// Connect timeout of one probe, in milliseconds.
    pub timeout_ms: u64,
    /// Port probed when the target names none.
    pub port: u16,
}

impl PingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            attempts: 4,
            interval_ms: 1000,
            timeout_ms: 3000,
            port: 443,
        }
    }
}

/// Complete host configuration. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Texts and limits of the shell session.
    pub session: SessionConfig,
    /// JSON-lines file backing command history; `None` keeps history in memory only.
    pub history_file: Option<PathBuf>,
    /// Default `env_logger` filter, overridden by `RUST_LOG`.
    pub log_level: String,
    pub ping: PingConfig,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            history_file: None,
            log_level: "warn".to_string(),
            ping: PingConfig::default(),
        }
    }
}

impl TerminalConfig {
    /// Parses a TOML document.
    pub fn from_toml(path: &Path, body: &str) -> TerminalResult<Self> {
        toml::from_str(body).map_err(|source| TerminalError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the file at `path`; a missing file yields the defaults.
    ///
    /// Unreadable files and TOML parse failures are errors.
    pub fn load(path: &Path) -> TerminalResult<Self> {
        match fs::read_to_string(path) {
            Ok(body) => Self::from_toml(path, &body),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::info!("config {} not found; using defaults", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(TerminalError::io("reading config", path, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("terminal.toml");
        fs::write(
            &path,
            "log_level = \"debug\"\n\n[session]\nwelcome_message = \"Howdy\"\n\n[ping]\nattempts = 2\n",
        )
        .expect("write config");

        let config = TerminalConfig::load(&path).expect("load");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.session.welcome_message, "Howdy");
        assert_eq!(config.session.not_found_message, "Command not found.");
        assert_eq!(
            config.ping,
            PingConfig {
                attempts: 2,
                ..PingConfig::default()
            }
        );
        assert_eq!(config.history_file, None);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = TerminalConfig::load(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(config, TerminalConfig::default());
    }

    #[test]
    fn invalid_toml_names_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.toml");
        fs::write(&path, "log_level = [").expect("write");
        let err = TerminalConfig::load(&path).expect_err("broken config");
        assert!(matches!(err, TerminalError::ConfigParse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }
}
