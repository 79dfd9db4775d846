use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::activation::ComponentActivator;
use crate::context::CreationContext;
use crate::errors::{KernelError, KernelResult};
use crate::lifestyle::{create_instance, LifestyleManager};
use crate::model::Instance;
use crate::release::Burden;

/// Creates one instance and hands it out until the kernel is disposed.
///
/// Construction runs at most once; concurrent first requests wait for it and
/// later reads never lock.
pub struct SingletonLifestyleManager {
    component: String,
    activator: Arc<dyn ComponentActivator>,
    cached: OnceCell<Instance>,
    owned: Mutex<Option<Burden>>,
    disposed: AtomicBool,
}

impl SingletonLifestyleManager {
    pub fn new(component: impl Into<String>, activator: Arc<dyn ComponentActivator>) -> Self {
        Self {
            component: component.into(),
            activator,
            cached: OnceCell::new(),
            owned: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }
}

impl LifestyleManager for SingletonLifestyleManager {
    fn resolve(&self, context: &mut CreationContext, burden: &mut Burden) -> KernelResult<Instance> {
        let mut created = false;
        let instance = self
            .cached
            .get_or_try_init(|| {
                let instance = create_instance(self.activator.as_ref(), context, burden)?;
                *self.owned.lock() = Some(burden.take_ownership());
                created = true;
                Ok::<_, KernelError>(instance)
            })?
            .clone();

        if created {
            tracing::debug!("Created singleton '{}'", self.component);
        } else {
            burden.set_instance(instance.clone());
            burden.set_requires_policy_release(false);
        }
        Ok(instance)
    }

    fn release(&self, _instance: &Instance) -> bool {
        false
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let owned = self.owned.lock().take();
        if let Some(burden) = owned {
            tracing::debug!("Disposing singleton '{}'", self.component);
            burden.decommission(self.activator.as_ref());
        }
    }

    fn resolve_reentrant(&self, context: &CreationContext) -> Option<Instance> {
        self.cached
            .get()
            .cloned()
            .or_else(|| context.in_progress(&self.component))
    }
}

impl std::fmt::Debug for SingletonLifestyleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingletonLifestyleManager")
            .field("component", &self.component)
            .field("created", &self.cached.get().is_some())
            .field("disposed", &self.disposed.load(Ordering::SeqCst))
            .finish()
    }
}
