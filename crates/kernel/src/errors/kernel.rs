use thiserror::Error;

use crate::config::ConfigError;

/// Core error type for the resolution kernel
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("Invalid argument '{argument}': {message}")]
    InvalidArgument { argument: String, message: String },

    #[error("No component found for {lookup}")]
    ComponentNotFound { lookup: String },

    #[error("Component registration failed for '{key}': {message}")]
    ComponentRegistration { key: String, message: String },

    #[error("Dependency resolution failed for '{component}': {message}")]
    DependencyResolutionFailed { component: String, message: String },

    #[error("Circular dependency detected: {path} (cycle at: {component})")]
    CircularDependency { path: String, component: String },

    #[error("Pool error for '{component}': {message}")]
    Pool { component: String, message: String },

    #[error("Component '{component}' requires an active scope")]
    ScopeNotActive { component: String },

    #[error("Activation of '{component}' failed: {source}")]
    Activation {
        component: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Instance of '{component}' is not a '{expected}'")]
    InvalidCast {
        component: String,
        expected: &'static str,
    },

    #[error("Kernel has been disposed")]
    Disposed,

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl KernelError {
    /// Create a new invalid argument error
    pub fn invalid_argument(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            message: message.into(),
        }
    }

    /// Create a new component not found error
    pub fn component_not_found(lookup: impl Into<String>) -> Self {
        Self::ComponentNotFound {
            lookup: lookup.into(),
        }
    }

    /// Create a new registration error
    pub fn registration(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ComponentRegistration {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a new dependency resolution error
    pub fn dependency_resolution(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DependencyResolutionFailed {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a new pool error
    pub fn pool(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pool {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a new activation error wrapping the activator's failure
    pub fn activation(
        component: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Activation {
            component: component.into(),
            source: source.into(),
        }
    }

    /// Check if the error is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ComponentNotFound { .. })
    }

    /// Check if the error is a circular dependency error
    pub fn is_circular(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }

    /// Check if the error is a pool error
    pub fn is_pool(&self) -> bool {
        matches!(self, Self::Pool { .. })
    }

    /// Check if the error is a precondition violation
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    /// Failures caused by an unsatisfiable dependency graph.
    ///
    /// `resolve_all` drops candidates failing this way and keeps going.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Self::ComponentNotFound { .. }
                | Self::DependencyResolutionFailed { .. }
                | Self::CircularDependency { .. }
                | Self::ScopeNotActive { .. }
        )
    }
}
