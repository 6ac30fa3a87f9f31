//! Configuration for the PhishNet client.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (PHISHNET_API_BASE)
//! 2. Config file (.phishnet/config.yaml)
//! 3. Defaults (local development API, 0.4/0.6 thresholds)
//!
//! Config file discovery searches the current directory and its parents for
//! .phishnet/config.yaml.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::DEFAULT_API_BASE;
use crate::core::FailurePolicy;
use crate::domain::StatusThresholds;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Default request timeout for the detection API; batches are scored by LLM
/// agents and take a while
const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub status: Option<StatusConfig>,
    #[serde(default)]
    pub inbox: Option<InboxConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    /// Base URL; endpoints are appended to it
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    pub phishing_max: Option<f64>,
    pub cleared_min: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboxConfig {
    pub on_failure: Option<FailurePolicy>,
}

/// Environment overrides, captured once so resolution stays testable
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub api_base: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            api_base: std::env::var("PHISHNET_API_BASE").ok(),
        }
    }
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Detection API base URL
    pub api_base: String,
    /// Per-request timeout for the detection API
    pub api_timeout: Duration,
    /// Status classification thresholds
    pub thresholds: StatusThresholds,
    /// What the inbox does with a batch whose request failed
    pub failure_policy: FailurePolicy,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".phishnet").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Combine defaults, an optional config file and environment overrides
fn resolve_config(
    config_path: Option<PathBuf>,
    file: Option<ConfigFile>,
    env: EnvOverrides,
) -> Result<ResolvedConfig> {
    let api = file.as_ref().map(|f| f.api.clone()).unwrap_or_default();

    let api_base = env
        .api_base
        .or(api.base_url)
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

    let api_timeout =
        Duration::from_secs(api.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS));

    let defaults = StatusThresholds::default();
    let status = file.as_ref().and_then(|f| f.status.as_ref());
    let thresholds = StatusThresholds {
        phishing_max: status
            .and_then(|s| s.phishing_max)
            .unwrap_or(defaults.phishing_max),
        cleared_min: status
            .and_then(|s| s.cleared_min)
            .unwrap_or(defaults.cleared_min),
    };
    thresholds
        .validate()
        .context("Invalid status thresholds in config")?;

    let failure_policy = file
        .as_ref()
        .and_then(|f| f.inbox.as_ref())
        .and_then(|i| i.on_failure)
        .unwrap_or_default();

    Ok(ResolvedConfig {
        api_base,
        api_timeout,
        thresholds,
        failure_policy,
        config_file: config_path,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_path = find_config_file();
    let file = match config_path {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    resolve_config(config_path, file, EnvOverrides::from_env())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let config = resolve_config(None, None, EnvOverrides::default()).unwrap();

        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.api_timeout, Duration::from_secs(60));
        assert_eq!(config.thresholds, StatusThresholds::default());
        assert_eq!(config.failure_policy, FailurePolicy::Drop);
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let phishnet_dir = temp.path().join(".phishnet");
        std::fs::create_dir_all(&phishnet_dir).unwrap();

        let config_path = phishnet_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
api:
  base_url: https://phishnet.example.org/api
  timeout_seconds: 15
status:
  phishing_max: 0.3
  cleared_min: 0.7
inbox:
  on_failure: keep_unannotated
"#
        )
        .unwrap();

        let parsed = load_config_file(&config_path).unwrap();
        assert_eq!(parsed.version, "1.0");

        let config =
            resolve_config(Some(config_path.clone()), Some(parsed), EnvOverrides::default())
                .unwrap();

        assert_eq!(config.config_file, Some(config_path));
        assert_eq!(config.api_base, "https://phishnet.example.org/api");
        assert_eq!(config.api_timeout, Duration::from_secs(15));
        assert_eq!(config.thresholds.phishing_max, 0.3);
        assert_eq!(config.thresholds.cleared_min, 0.7);
        assert_eq!(config.failure_policy, FailurePolicy::KeepUnannotated);
    }

    #[test]
    fn test_env_overrides_file() {
        let parsed: ConfigFile = serde_yaml::from_str(
            r#"
version: "1.0"
api:
  base_url: http://from-file/api
"#,
        )
        .unwrap();

        let env = EnvOverrides {
            api_base: Some("http://from-env/api".to_string()),
        };

        let config = resolve_config(None, Some(parsed), env).unwrap();
        assert_eq!(config.api_base, "http://from-env/api");
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let parsed: ConfigFile = serde_yaml::from_str(
            r#"
version: "1.0"
status:
  phishing_max: 0.8
"#,
        )
        .unwrap();

        let result = resolve_config(None, Some(parsed), EnvOverrides::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let parsed: ConfigFile = serde_yaml::from_str(
            r#"
version: "1.0"
home: ./state
"#,
        )
        .unwrap();

        let config = resolve_config(None, Some(parsed), EnvOverrides::default()).unwrap();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }
}
