use std::collections::HashMap;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::activation::ComponentActivator;
use crate::config::{ConfigValidator, PoolSizeValidator};
use crate::context::CreationContext;
use crate::errors::KernelResult;
use crate::kernel::{Kernel, KernelInner};
use crate::lifestyle::{ComponentReleaser, LifestyleManager, Pool};
use crate::model::{Instance, InstanceKey};
use crate::release::Burden;

/// Activator seen by the pool.
///
/// Parks the dependencies resolved for each pooled instance until that
/// instance is destroyed, so they outlive any single request.
pub(crate) struct PooledActivator {
    inner: Arc<dyn ComponentActivator>,
    kernel: Weak<KernelInner>,
    parked: Mutex<HashMap<InstanceKey, Vec<Burden>>>,
}

impl PooledActivator {
    fn new(inner: Arc<dyn ComponentActivator>, kernel: Weak<KernelInner>) -> Self {
        Self {
            inner,
            kernel,
            parked: Mutex::new(HashMap::new()),
        }
    }

    fn owns(&self, instance: &Instance) -> bool {
        self.parked.lock().contains_key(&InstanceKey::of(instance))
    }
}

impl ComponentActivator for PooledActivator {
    fn create(&self, context: &mut CreationContext) -> KernelResult<Instance> {
        if context.kernel().is_none() {
            if let Some(inner) = self.kernel.upgrade() {
                context.bind_kernel(Kernel::from_inner(inner));
            }
        }

        let instance = self.inner.create(context)?;
        let dependencies = context.take_children();
        self.parked
            .lock()
            .insert(InstanceKey::of(&instance), dependencies);
        Ok(instance)
    }

    fn destroy(&self, instance: &Instance) {
        let parked = self.parked.lock().remove(&InstanceKey::of(instance));
        if let Some(dependencies) = parked {
            self.inner.destroy(instance);
            for dependency in dependencies.into_iter().rev() {
                dependency.release();
            }
        }
    }

    fn recycle(&self, instance: &Instance) {
        self.inner.recycle(instance);
    }
}

/// Hands out instances from a [`Pool`] created on first use
pub struct PooledLifestyleManager {
    component: String,
    initial_size: usize,
    max_size: usize,
    activator: Arc<PooledActivator>,
    kernel: Weak<KernelInner>,
    pool: OnceCell<Pool>,
}

impl PooledLifestyleManager {
    pub(crate) fn new(
        component: impl Into<String>,
        activator: Arc<dyn ComponentActivator>,
        initial_size: usize,
        max_size: usize,
        kernel: Weak<KernelInner>,
    ) -> KernelResult<Self> {
        PoolSizeValidator.validate(&(initial_size, max_size))?;

        Ok(Self {
            component: component.into(),
            initial_size,
            max_size,
            activator: Arc::new(PooledActivator::new(activator, kernel.clone())),
            kernel,
            pool: OnceCell::new(),
        })
    }

    /// Pool for this component, created and warmed within `context` on first use
    fn ensure_pool(&self, context: &mut CreationContext) -> KernelResult<&Pool> {
        self.pool.get_or_try_init(|| {
            let activator: Arc<dyn ComponentActivator> = self.activator.clone();
            let owner: Weak<dyn ComponentReleaser> = self.kernel.clone();
            Pool::with_context(
                self.component.clone(),
                self.initial_size,
                self.max_size,
                activator,
                owner,
                context,
            )
        })
    }
}

impl LifestyleManager for PooledLifestyleManager {
    fn resolve(&self, context: &mut CreationContext, burden: &mut Burden) -> KernelResult<Instance> {
        let instance = self.ensure_pool(context)?.request(context)?;
        burden.set_instance(instance.clone());
        Ok(instance)
    }

    fn release(&self, instance: &Instance) -> bool {
        let Some(pool) = self.pool.get() else {
            return false;
        };
        let destroyed = pool.release(instance);
        if destroyed {
            self.activator.destroy(instance);
        }
        destroyed
    }

    fn dispose(&self) {
        if let Some(pool) = self.pool.get() {
            pool.dispose();
        }
    }

    fn recognizes(&self, instance: &Instance) -> bool {
        self.activator.owns(instance)
    }

    fn warm_up(&self, context: &mut CreationContext) -> KernelResult<()> {
        self.ensure_pool(context).map(|_| ())
    }

    fn pool(&self) -> Option<&Pool> {
        self.pool.get()
    }
}

impl std::fmt::Debug for PooledLifestyleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledLifestyleManager")
            .field("component", &self.component)
            .field("pool", &self.pool.get())
            .finish()
    }
}
