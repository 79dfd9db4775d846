use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Configuration validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create a validation failed error
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }
}

/// Trait for validating configuration values
pub trait ConfigValidator<T> {
    /// Validate a configuration value
    fn validate(&self, value: &T) -> Result<(), ConfigError>;
}

/// Validates the idle bounds of a component pool
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolSizeValidator;

impl ConfigValidator<(usize, usize)> for PoolSizeValidator {
    fn validate(&self, value: &(usize, usize)) -> Result<(), ConfigError> {
        let (initial_size, max_size) = *value;

        if max_size == 0 {
            return Err(ConfigError::invalid_value(
                "pool_max_size",
                max_size.to_string(),
                "a maximum pool size of at least 1",
            ));
        }

        if initial_size > max_size {
            return Err(ConfigError::validation_failed(format!(
                "pool_initial_size ({}) cannot exceed pool_max_size ({})",
                initial_size, max_size
            )));
        }

        Ok(())
    }
}
