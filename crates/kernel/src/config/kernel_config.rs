use crate::config::{ConfigError, ConfigSource, ConfigValidator, PoolSizeValidator};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

/// Idle instances a pooled component keeps warm when its descriptor does not say otherwise
pub const DEFAULT_POOL_INITIAL_SIZE: usize = 5;

/// Idle instances a pooled component retains when its descriptor does not say otherwise
pub const DEFAULT_POOL_MAX_SIZE: usize = 15;

const ENV_POOL_INITIAL_SIZE: &str = "ELIF_KERNEL_POOL_INITIAL_SIZE";
const ENV_POOL_MAX_SIZE: &str = "ELIF_KERNEL_POOL_MAX_SIZE";
const ENV_RELEASE_POLICY: &str = "ELIF_KERNEL_RELEASE_POLICY";

/// Which release policy the kernel installs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePolicyKind {
    /// Track every burden that requires release until it is released or the kernel is disposed
    #[default]
    Lifecycled,
    /// Never track anything; callers own what they resolve
    NoTracking,
}

impl ReleasePolicyKind {
    /// Get the policy name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleasePolicyKind::Lifecycled => "lifecycled",
            ReleasePolicyKind::NoTracking => "no_tracking",
        }
    }
}

impl FromStr for ReleasePolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lifecycled" | "tracking" => Ok(ReleasePolicyKind::Lifecycled),
            "no_tracking" | "no-tracking" | "none" => Ok(ReleasePolicyKind::NoTracking),
            _ => Err(ConfigError::invalid_value(
                "release_policy",
                s,
                "lifecycled or no_tracking",
            )),
        }
    }
}

impl std::fmt::Display for ReleasePolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kernel-wide configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub pool_initial_size: usize,
    pub pool_max_size: usize,
    pub release_policy: ReleasePolicyKind,
}

impl KernelConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self {
            pool_initial_size: DEFAULT_POOL_INITIAL_SIZE,
            pool_max_size: DEFAULT_POOL_MAX_SIZE,
            release_policy: ReleasePolicyKind::Lifecycled,
        }
    }

    /// Set the default pool bounds
    pub fn with_pool_size(mut self, initial_size: usize, max_size: usize) -> Self {
        self.pool_initial_size = initial_size;
        self.pool_max_size = max_size;
        self
    }

    /// Set the release policy
    pub fn with_release_policy(mut self, release_policy: ReleasePolicyKind) -> Self {
        self.release_policy = release_policy;
        self
    }

    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new();

        if let Ok(value) = env::var(ENV_POOL_INITIAL_SIZE) {
            config.pool_initial_size = parse_size("pool_initial_size", &value)?;
        }

        if let Ok(value) = env::var(ENV_POOL_MAX_SIZE) {
            config.pool_max_size = parse_size("pool_max_size", &value)?;
        }

        if let Ok(value) = env::var(ENV_RELEASE_POLICY) {
            config.release_policy = value.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML document; missing fields keep their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        PoolSizeValidator.validate(&(self.pool_initial_size, self.pool_max_size))
    }

    /// Get configuration source information for debugging
    pub fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();

        sources.insert(
            "pool_initial_size".to_string(),
            env_or_default(ENV_POOL_INITIAL_SIZE, DEFAULT_POOL_INITIAL_SIZE.to_string()),
        );
        sources.insert(
            "pool_max_size".to_string(),
            env_or_default(ENV_POOL_MAX_SIZE, DEFAULT_POOL_MAX_SIZE.to_string()),
        );
        sources.insert(
            "release_policy".to_string(),
            env_or_default(ENV_RELEASE_POLICY, ReleasePolicyKind::default().to_string()),
        );

        sources
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_size(field: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid_value(field, value, "a non-negative integer"))
}

fn env_or_default(var: &str, default: String) -> ConfigSource {
    if env::var(var).is_ok() {
        ConfigSource::EnvVar(var.to_string())
    } else {
        ConfigSource::Default(default)
    }
}
