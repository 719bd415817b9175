//! Daemon settings
//!
//! Layered: built-in defaults, then an optional TOML file, then
//! `LAUNCHPAD__SECTION__KEY` environment overrides.

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use launchpad_core::OrchestratorConfig;
use serde::Deserialize;
use std::path::PathBuf;

pub const CONFIG_PATH_ENV: &str = "LAUNCHPAD_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "~/.launchpad/launchpad.toml";
const DEFAULT_DATABASE_URL: &str = "sqlite://~/.launchpad/launchpad.db";
const SQLITE_SCHEME: &str = "sqlite://";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcSettings {
    pub host: String,
    pub port: u16,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9527,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// JSON-RPC endpoint fronting the external collaborators
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9600".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_url: String,
    pub rpc: RpcSettings,
    pub gateway: GatewaySettings,
    /// `pretty` or `json`; `LAUNCHPAD_LOG_FORMAT` wins when set
    pub log_format: String,
    /// Daily-rolling log files go here when set
    pub log_dir: Option<String>,
    pub orchestrator: OrchestratorConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            rpc: RpcSettings::default(),
            gateway: GatewaySettings::default(),
            log_format: "pretty".to_string(),
            log_dir: None,
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

impl Settings {
    /// Load from `LAUNCHPAD_CONFIG` (or the default path) plus the environment
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path, Environment::with_prefix("LAUNCHPAD").separator("__"))
    }

    fn load_from(path: &str, env: Environment) -> Result<Self> {
        let path = shellexpand::tilde(path).into_owned();
        let settings: Settings = Config::builder()
            .add_source(File::new(&path, FileFormat::Toml).required(false))
            .add_source(env)
            .build()
            .with_context(|| format!("failed to read settings from {}", path))?
            .try_deserialize()
            .context("invalid settings")?;
        Ok(settings.expanded())
    }

    fn expanded(mut self) -> Self {
        self.database_url = expand_database_url(&self.database_url);
        self.orchestrator.backup_dir = shellexpand::tilde(&self.orchestrator.backup_dir).into_owned();
        self.log_dir = self.log_dir.map(|d| shellexpand::tilde(&d).into_owned());
        self
    }

    /// On-disk location of the database, if it is file-backed
    pub fn database_file(&self) -> Option<PathBuf> {
        let rest = self.database_url.strip_prefix(SQLITE_SCHEME)?;
        let path = rest.split('?').next().unwrap_or(rest);
        if path.is_empty() || path.starts_with(":memory:") {
            return None;
        }
        Some(PathBuf::from(path))
    }
}

fn expand_database_url(url: &str) -> String {
    match url.strip_prefix(SQLITE_SCHEME) {
        Some(rest) => format!("{}{}", SQLITE_SCHEME, shellexpand::tilde(rest)),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env() -> Environment {
        Environment::with_prefix("LAUNCHPAD").separator("__").source(Some(HashMap::new()))
    }

    fn write_toml(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("launchpad-{}-{}.toml", name, std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_when_file_missing() {
        let settings = Settings::load_from("/nonexistent/launchpad.toml", no_env()).unwrap();
        assert_eq!(settings.rpc.port, 9527);
        assert_eq!(settings.gateway.timeout_secs, 30);
        assert!(settings.database_url.starts_with("sqlite://"));
        assert!(!settings.database_url.contains('~'));
        assert!(!settings.orchestrator.backup_dir.starts_with('~'));
        assert_eq!(settings.orchestrator, {
            let mut expected = OrchestratorConfig::default();
            expected.backup_dir = settings.orchestrator.backup_dir.clone();
            expected
        });
    }

    #[test]
    fn test_file_overrides_are_partial() {
        let path = write_toml(
            "partial",
            r#"
database_url = "sqlite:///tmp/launchpad-test.db"

[rpc]
port = 9999

[orchestrator]
evaluation_window_days = 14

[orchestrator.thresholds]
scale_threshold = 90.0

[orchestrator.concurrency]
business-creation = 1
"#,
        );
        let settings = Settings::load_from(path.to_str().unwrap(), no_env()).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(settings.rpc.port, 9999);
        assert_eq!(settings.rpc.host, "127.0.0.1");
        assert_eq!(settings.orchestrator.evaluation_window_days, 14);
        assert_eq!(settings.orchestrator.thresholds.scale_threshold, 90.0);
        assert_eq!(settings.orchestrator.thresholds.pause_threshold, 30.0);
        assert_eq!(settings.orchestrator.concurrency.get("business-creation"), Some(&1));
        assert_eq!(
            settings.database_file(),
            Some(PathBuf::from("/tmp/launchpad-test.db"))
        );
    }

    #[test]
    fn test_environment_overrides_file() {
        let path = write_toml("env", "[rpc]\nport = 9999\n");
        let env = Environment::with_prefix("LAUNCHPAD").separator("__").source(Some(
            HashMap::from([
                ("LAUNCHPAD__RPC__PORT".to_string(), "7000".to_string()),
                ("LAUNCHPAD__LOG_FORMAT".to_string(), "json".to_string()),
            ]),
        ));
        let settings = Settings::load_from(path.to_str().unwrap(), env).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(settings.rpc.port, 7000);
        assert_eq!(settings.log_format, "json");
    }

    #[test]
    fn test_memory_database_has_no_file() {
        let settings = Settings {
            database_url: "sqlite::memory:".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.database_file(), None);
        assert_eq!(expand_database_url("sqlite::memory:"), "sqlite::memory:");
    }
}
