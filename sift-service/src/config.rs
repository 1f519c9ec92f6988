//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (prefix: SIFT_)
//! 2. Current working directory: ./sift.toml
//! 3. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Policy for filter/sort clauses naming an unregistered property
///
/// `Reject` is the default: the whole request fails with a validation error
/// naming every offending clause. `Ignore` must be opted into explicitly; it
/// drops the offending clause and evaluates the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownPropertyPolicy {
    /// Fail the request with a validation error (default)
    #[default]
    Reject,
    /// Drop the offending clause and evaluate the rest
    Ignore,
}

/// Query pipeline configuration
///
/// # Example
///
/// ```rust
/// use sift_service::config::QueryConfig;
///
/// let config = QueryConfig::default();
/// assert_eq!(config.default_page_size, 20);
/// assert_eq!(config.max_page_size, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Page size used when the request carries none
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Upper bound a requested page size is clamped to
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// What to do with clauses naming unregistered properties
    #[serde(default)]
    pub unknown_property: UnknownPropertyPolicy,

    /// Log level filter, e.g. "info" or "sift_service=debug"
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            unknown_property: UnknownPropertyPolicy::default(),
            log_level: default_log_level(),
        }
    }
}

impl QueryConfig {
    /// Load configuration from defaults, `./sift.toml`, and `SIFT_*`
    /// environment variables
    pub fn load() -> Result<Self> {
        Self::figment()
            .extract()
            .map_err(|e| Error::Config(e.to_string()))
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file("sift.toml"))
            .merge(Env::prefixed("SIFT_"))
    }
}

const fn default_page_size() -> u32 {
    20
}

const fn default_max_page_size() -> u32 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}
