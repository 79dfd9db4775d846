pub mod pool;
pub mod pooled;
pub mod scoped;
pub mod singleton;
pub mod transient;

pub use pool::{ComponentReleaser, Pool};
pub use pooled::PooledLifestyleManager;
pub use scoped::{ScopeId, ScopedLifestyleManager};
pub use singleton::SingletonLifestyleManager;
pub use transient::TransientLifestyleManager;

use std::sync::{Arc, Weak};

use crate::activation::ComponentActivator;
use crate::config::KernelConfig;
use crate::context::CreationContext;
use crate::errors::{KernelError, KernelResult};
use crate::kernel::KernelInner;
use crate::model::{ComponentDescriptor, Instance};
use crate::release::Burden;

/// Instance reuse policy of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifestyle {
    /// One instance for the lifetime of the kernel
    #[default]
    Singleton,
    /// New instance for each request
    Transient,
    /// Instances recycled through a bounded pool; unset sizes come from [`KernelConfig`]
    Pooled {
        initial_size: Option<usize>,
        max_size: Option<usize>,
    },
    /// One instance per open scope
    Scoped,
}

impl Lifestyle {
    /// Pooled lifestyle with the kernel's default pool bounds
    pub fn pooled() -> Self {
        Lifestyle::Pooled {
            initial_size: None,
            max_size: None,
        }
    }

    /// Pooled lifestyle with explicit bounds
    pub fn pooled_with(initial_size: usize, max_size: usize) -> Self {
        Lifestyle::Pooled {
            initial_size: Some(initial_size),
            max_size: Some(max_size),
        }
    }

    pub fn is_singleton(&self) -> bool {
        matches!(self, Lifestyle::Singleton)
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Lifestyle::Transient)
    }

    pub fn is_pooled(&self) -> bool {
        matches!(self, Lifestyle::Pooled { .. })
    }

    pub fn is_scoped(&self) -> bool {
        matches!(self, Lifestyle::Scoped)
    }

    /// Get the lifestyle name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifestyle::Singleton => "singleton",
            Lifestyle::Transient => "transient",
            Lifestyle::Pooled { .. } => "pooled",
            Lifestyle::Scoped => "scoped",
        }
    }
}

impl std::fmt::Display for Lifestyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Lifestyle {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "singleton" => Ok(Lifestyle::Singleton),
            "transient" => Ok(Lifestyle::Transient),
            "pooled" => Ok(Lifestyle::pooled()),
            "scoped" => Ok(Lifestyle::Scoped),
            _ => Err(KernelError::invalid_argument(
                "lifestyle",
                format!("unknown lifestyle '{}'", s),
            )),
        }
    }
}

/// Decides whether a request reuses an instance or creates a new one
pub trait LifestyleManager: Send + Sync + std::fmt::Debug {
    /// Produce an instance, filling `burden` with what the caller ends up owning
    fn resolve(&self, context: &mut CreationContext, burden: &mut Burden) -> KernelResult<Instance>;

    /// Give an instance back; returns `true` when it was destroyed
    fn release(&self, instance: &Instance) -> bool;

    /// Tear down everything this manager still holds
    fn dispose(&self);

    /// Instance to hand out when the component is requested again while it
    /// is still being built in `context`
    fn resolve_reentrant(&self, _context: &CreationContext) -> Option<Instance> {
        None
    }

    /// Whether this manager owns `instance` outside the release policy
    fn recognizes(&self, _instance: &Instance) -> bool {
        false
    }

    /// Close `scope`, destroying what was created inside it
    fn end_scope(&self, _scope: ScopeId) {}

    /// Prepare instances ahead of the first request; the component is on
    /// top of the `context` stack
    fn warm_up(&self, _context: &mut CreationContext) -> KernelResult<()> {
        Ok(())
    }

    /// The backing pool, once it exists
    fn pool(&self) -> Option<&Pool> {
        None
    }
}

/// Build an instance through `activator` and record it in `burden`
pub(crate) fn create_instance(
    activator: &dyn ComponentActivator,
    context: &mut CreationContext,
    burden: &mut Burden,
) -> KernelResult<Instance> {
    let instance = activator.create(context)?;
    burden.set_instance(instance.clone());
    burden.adopt(context.take_children());
    Ok(instance)
}

/// Build the manager matching the descriptor's lifestyle
pub(crate) fn create_manager(
    descriptor: &ComponentDescriptor,
    config: &KernelConfig,
    kernel: Weak<KernelInner>,
) -> KernelResult<Box<dyn LifestyleManager>> {
    let component = descriptor.key().to_string();
    let activator = Arc::clone(descriptor.activator());

    let manager: Box<dyn LifestyleManager> = match descriptor.lifestyle() {
        Lifestyle::Singleton => Box::new(SingletonLifestyleManager::new(component, activator)),
        Lifestyle::Transient => Box::new(TransientLifestyleManager::new(component, activator)),
        Lifestyle::Scoped => Box::new(ScopedLifestyleManager::new(component, activator)),
        Lifestyle::Pooled {
            initial_size,
            max_size,
        } => Box::new(PooledLifestyleManager::new(
            component,
            activator,
            initial_size.unwrap_or(config.pool_initial_size),
            max_size.unwrap_or(config.pool_max_size),
            kernel,
        )?),
    };

    Ok(manager)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifestyle_from_str() {
        assert_eq!("singleton".parse::<Lifestyle>().unwrap(), Lifestyle::Singleton);
        assert_eq!("Transient".parse::<Lifestyle>().unwrap(), Lifestyle::Transient);
        assert_eq!("pooled".parse::<Lifestyle>().unwrap(), Lifestyle::pooled());
        assert_eq!("scoped".parse::<Lifestyle>().unwrap(), Lifestyle::Scoped);

        assert!("per-thread".parse::<Lifestyle>().is_err());
    }

    #[test]
    fn test_lifestyle_display() {
        assert_eq!(format!("{}", Lifestyle::Singleton), "singleton");
        assert_eq!(format!("{}", Lifestyle::pooled_with(1, 2)), "pooled");
        assert_eq!(Lifestyle::default(), Lifestyle::Singleton);
        assert!(Lifestyle::pooled_with(1, 2).is_pooled());
    }
}
