//! Configuration types

use crate::{ConfigError, OwnerRef, QueryKey};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base URL of the public fake-data todo service.
pub const PUBLIC_TODO_API: &str = "https://jsonplaceholder.typicode.com";

/// Remote service connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Query cache retention settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    /// How long an unobserved entry is kept before eviction. Zero evicts
    /// as soon as the last observer leaves.
    pub eviction_grace_ms: u64,
}

impl CacheSettings {
    pub fn eviction_grace(&self) -> Duration {
        Duration::from_millis(self.eviction_grace_ms)
    }
}

/// Page window settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaginationConfig {
    pub page_limit: u32,
    pub initial_page: u32,
}

/// Defaults applied to new todos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MutationConfig {
    pub owner_ref: OwnerRef,
}

/// Master configuration struct.
/// ALL values are required - no defaults anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TodoqConfig {
    pub api: ApiConfig,
    pub cache: CacheSettings,
    pub pagination: PaginationConfig,
    pub mutation: MutationConfig,
}

impl TodoqConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "api.base_url".to_string(),
            });
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url".to_string(),
                value: self.api.base_url.clone(),
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.api.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "api.request_timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.pagination.page_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pagination.page_limit".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if self.mutation.owner_ref <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "mutation.owner_ref".to_string(),
                value: self.mutation.owner_ref.to_string(),
                reason: "must be a positive user id".to_string(),
            });
        }
        Ok(())
    }

    /// Page window optimistic creations are applied to.
    pub fn default_key(&self) -> QueryKey {
        QueryKey::first_page(self.pagination.page_limit)
    }

    /// Page window shown first.
    pub fn initial_key(&self) -> QueryKey {
        QueryKey::page(self.pagination.initial_page, self.pagination.page_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn base_config() -> TodoqConfig {
        TodoqConfig {
            api: ApiConfig {
                base_url: PUBLIC_TODO_API.to_string(),
                request_timeout_ms: 5_000,
            },
            cache: CacheSettings {
                eviction_grace_ms: 60_000,
            },
            pagination: PaginationConfig {
                page_limit: 10,
                initial_page: 0,
            },
            mutation: MutationConfig { owner_ref: 1 },
        }
    }

    #[test]
    fn test_base_config_is_valid() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_base_url() {
        let mut config = base_config();
        config.api.base_url = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired { .. })
        ));
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let mut config = base_config();
        config.api.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_page_limit() {
        let mut config = base_config();
        config.pagination.page_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_derived_keys() {
        let mut config = base_config();
        config.pagination.initial_page = 2;
        assert_eq!(config.default_key(), QueryKey::new(0, 10).unwrap());
        assert_eq!(config.initial_key(), QueryKey::new(20, 10).unwrap());
        assert_eq!(config.api.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.cache.eviction_grace(), Duration::from_secs(60));
    }

    #[test]
    fn test_toml_like_json_rejects_unknown_fields() {
        let json = r#"{"base_url":"http://x","request_timeout_ms":1,"retries":3}"#;
        assert!(serde_json::from_str::<ApiConfig>(json).is_err());
    }

    proptest! {
        #[test]
        fn valid_limits_and_timeouts_accepted(limit in 1u32..500, timeout in 1u64..60_000) {
            let mut config = base_config();
            config.pagination.page_limit = limit;
            config.api.request_timeout_ms = timeout;
            prop_assert!(config.validate().is_ok());
        }

        #[test]
        fn non_positive_owner_rejected(owner in i64::MIN..=0) {
            let mut config = base_config();
            config.mutation.owner_ref = owner;
            prop_assert!(config.validate().is_err());
        }
    }
}
