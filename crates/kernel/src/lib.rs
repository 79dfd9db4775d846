pub mod activation;
pub mod config;
pub mod context;
pub mod errors;
pub mod kernel;
pub mod lifestyle;
pub mod model;
pub mod release;

// Re-export key types for convenience
pub use activation::{
    ComponentActivator, Disposable, FactoryActivator, InterceptingActivator, ProxyFactory,
    Recyclable,
};
pub use config::{ConfigError, ConfigSource, KernelConfig, ReleasePolicyKind};
pub use context::CreationContext;
pub use errors::{KernelError, KernelResult};
pub use kernel::{Handler, HandlerState, Kernel};
pub use lifestyle::{Lifestyle, LifestyleManager, Pool, ScopeId};
pub use model::{
    Arguments, ComponentBuilder, ComponentDescriptor, DependencyModel, DependencyModelCollection,
    DependencyTarget, Instance, InstanceKey, InterceptorReference, InterceptorReferenceCollection,
    ServiceType,
};
pub use release::{Burden, LifecycledReleasePolicy, NoTrackingReleasePolicy, ReleasePolicy};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get kernel version
pub fn version() -> &'static str {
    VERSION
}
