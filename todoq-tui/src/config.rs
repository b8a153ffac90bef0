//! Configuration loading for the todoq terminal front end.
//!
//! All fields are required. No defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use todoq_core::{ApiConfig, CacheSettings, ConfigError, MutationConfig, PaginationConfig, TodoqConfig};

/// Environment variable consulted when `--config` is absent.
pub const CONFIG_ENV: &str = "TODOQ_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TuiConfig {
    pub api: ApiConfig,
    pub cache: CacheSettings,
    pub pagination: PaginationConfig,
    pub mutation: MutationConfig,
    pub terminal: TerminalConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerminalConfig {
    /// Redraw interval while idle.
    pub refresh_interval_ms: u64,
    /// Log file; the terminal itself belongs to the UI.
    pub log_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Missing configuration file path (use --config or {CONFIG_ENV})")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

impl TuiConfig {
    /// Load from `--config <path>`, falling back to `TODOQ_CONFIG`.
    pub fn load() -> Result<Self, ConfigLoadError> {
        let path = config_path(std::env::args().skip(1), std::env::var(CONFIG_ENV).ok())
            .ok_or(ConfigLoadError::MissingConfigPath)?;
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigLoadError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigLoadError> {
        let config: TuiConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.core().validate()?;
        if self.terminal.refresh_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "terminal.refresh_interval_ms".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.terminal.log_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "terminal.log_path".to_string(),
            });
        }
        Ok(())
    }

    /// The library-facing part of the configuration.
    pub fn core(&self) -> TodoqConfig {
        TodoqConfig {
            api: self.api.clone(),
            cache: self.cache.clone(),
            pagination: self.pagination.clone(),
            mutation: self.mutation.clone(),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.terminal.refresh_interval_ms)
    }
}

/// `--config <path>` wins over the environment value.
pub fn config_path(
    args: impl IntoIterator<Item = String>,
    env_value: Option<String>,
) -> Option<PathBuf> {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    env_value.filter(|value| !value.is_empty()).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[api]
base_url = "https://jsonplaceholder.typicode.com"
request_timeout_ms = 5000

[cache]
eviction_grace_ms = 60000

[pagination]
page_limit = 10
initial_page = 0

[mutation]
owner_ref = 1

[terminal]
refresh_interval_ms = 250
log_path = "todoq.log"
"#;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sample_parses() {
        let config = TuiConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.pagination.page_limit, 10);
        assert_eq!(config.refresh_interval(), Duration::from_millis(250));
        assert_eq!(config.core().default_key().limit(), 10);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let contents = format!("{SAMPLE}\n[extra]\nvalue = 1\n");
        assert!(matches!(
            TuiConfig::from_toml(&contents),
            Err(ConfigLoadError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_table_rejected() {
        let contents = SAMPLE.replace("[mutation]\nowner_ref = 1\n", "");
        assert!(matches!(
            TuiConfig::from_toml(&contents),
            Err(ConfigLoadError::Parse(_))
        ));
    }

    #[test]
    fn test_zero_refresh_rejected() {
        let contents = SAMPLE.replace("refresh_interval_ms = 250", "refresh_interval_ms = 0");
        assert!(matches!(
            TuiConfig::from_toml(&contents),
            Err(ConfigLoadError::Invalid(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_core_validation_applies() {
        let contents = SAMPLE.replace("page_limit = 10", "page_limit = 0");
        assert!(matches!(
            TuiConfig::from_toml(&contents),
            Err(ConfigLoadError::Invalid(_))
        ));
    }

    #[test]
    fn test_config_path_prefers_flag() {
        assert_eq!(
            config_path(args(&["--config", "a.toml"]), Some("b.toml".to_string())),
            Some(PathBuf::from("a.toml"))
        );
        assert_eq!(
            config_path(args(&[]), Some("b.toml".to_string())),
            Some(PathBuf::from("b.toml"))
        );
        assert_eq!(config_path(args(&["--config"]), None), None);
        assert_eq!(config_path(args(&[]), Some(String::new())), None);
    }
}
