// Service configuration: defaults, then stresslens.toml, then STRESSLENS_* env.

use crate::errors::{StressError, StressResult};
use crate::inference::DEFAULT_TOP_FACTORS;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const CONFIG_FILE: &str = "stresslens.toml";
pub const CONFIG_PATH_VAR: &str = "STRESSLENS_CONFIG";
pub const ENV_PREFIX: &str = "STRESSLENS_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub artifacts_dir: PathBuf,
    /// How many leading schema features are considered for contributing factors
    pub top_factors: usize,
    pub strict_ranges: bool,
    /// Allowed CORS origins; empty allows any
    #[serde(default)]
    pub cors_allow_origins: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            artifacts_dir: PathBuf::from("models"),
            top_factors: DEFAULT_TOP_FACTORS,
            strict_ranges: false,
            cors_allow_origins: Vec::new(),
        }
    }
}

impl ServiceConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> StressResult<()> {
        if self.top_factors == 0 {
            return Err(StressError::config("top_factors must be at least 1"));
        }
        if self.artifacts_dir.as_os_str().is_empty() {
            return Err(StressError::config("artifacts_dir cannot be empty"));
        }
        if self.host.trim().is_empty() {
            return Err(StressError::config("host cannot be empty"));
        }
        Ok(())
    }
}

/// Figment with every layer applied
pub fn figment() -> Figment {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| CONFIG_FILE.to_string());
    Figment::from(Serialized::defaults(ServiceConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX))
}

pub fn load_config() -> StressResult<ServiceConfig> {
    let config: ServiceConfig = figment().extract()?;
    config.validate()?;
    Ok(config)
}
