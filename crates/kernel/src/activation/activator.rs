use std::any::Any;
use std::sync::Arc;

use crate::context::CreationContext;
use crate::errors::KernelResult;
use crate::model::Instance;

/// Creates and destroys the instances of one component
pub trait ComponentActivator: Send + Sync {
    /// Build a new instance.
    ///
    /// Dependencies are resolved through `context`; their burdens become
    /// children of the instance being built.
    fn create(&self, context: &mut CreationContext) -> KernelResult<Instance>;

    /// Tear an instance down for good
    fn destroy(&self, _instance: &Instance) {}

    /// Reset an instance before a pool hands it out again
    fn recycle(&self, _instance: &Instance) {}
}

/// Implemented by pooled components that reset their state when returned to the pool
pub trait Recyclable: Send + Sync {
    fn recycle(&self);
}

/// Implemented by components that release resources when destroyed
pub trait Disposable: Send + Sync {
    fn dispose(&self);
}

type CreateFn = Box<dyn Fn(&mut CreationContext) -> KernelResult<Instance> + Send + Sync>;
type InstanceHook = Box<dyn Fn(&Instance) + Send + Sync>;

/// Activator backed by a factory closure
pub struct FactoryActivator {
    create: CreateFn,
    destroy: Vec<InstanceHook>,
    recycle: Vec<InstanceHook>,
}

impl FactoryActivator {
    pub fn new<T, F>(factory: F) -> Self
    where
        F: Fn(&mut CreationContext) -> KernelResult<T> + Send + Sync + 'static,
        T: Any + Send + Sync,
    {
        Self {
            create: Box::new(move |context| {
                let instance = factory(context)?;
                Ok(Arc::new(instance) as Instance)
            }),
            destroy: Vec::new(),
            recycle: Vec::new(),
        }
    }

    /// Activator whose factory hands out the shared allocation itself.
    ///
    /// Lets a factory publish its instance with
    /// [`CreationContext::set_in_progress`] before resolving dependencies that
    /// point back at it.
    pub fn from_arc<T, F>(factory: F) -> Self
    where
        F: Fn(&mut CreationContext) -> KernelResult<Arc<T>> + Send + Sync + 'static,
        T: Any + Send + Sync,
    {
        Self {
            create: Box::new(move |context| {
                let instance = factory(context)?;
                Ok(instance as Instance)
            }),
            destroy: Vec::new(),
            recycle: Vec::new(),
        }
    }

    /// Activator building `T::default()` with no dependencies
    pub fn from_default<T: Default + Any + Send + Sync>() -> Self {
        Self::new(|_| Ok(T::default()))
    }

    pub fn on_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Instance) + Send + Sync + 'static,
    {
        self.destroy.push(Box::new(hook));
        self
    }

    pub fn on_recycle<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Instance) + Send + Sync + 'static,
    {
        self.recycle.push(Box::new(hook));
        self
    }

    /// Call [`Recyclable::recycle`] on instances of `T`
    pub fn recyclable<T: Recyclable + Any>(self) -> Self {
        self.on_recycle(|instance| {
            if let Some(recyclable) = instance.downcast_ref::<T>() {
                recyclable.recycle();
            }
        })
    }

    /// Call [`Disposable::dispose`] on instances of `T`
    pub fn disposable<T: Disposable + Any>(self) -> Self {
        self.on_destroy(|instance| {
            if let Some(disposable) = instance.downcast_ref::<T>() {
                disposable.dispose();
            }
        })
    }
}

impl ComponentActivator for FactoryActivator {
    fn create(&self, context: &mut CreationContext) -> KernelResult<Instance> {
        (self.create)(context)
    }

    fn destroy(&self, instance: &Instance) {
        for hook in &self.destroy {
            hook(instance);
        }
    }

    fn recycle(&self, instance: &Instance) {
        for hook in &self.recycle {
            hook(instance);
        }
    }
}

impl std::fmt::Debug for FactoryActivator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryActivator")
            .field("destroy_hooks", &self.destroy.len())
            .field("recycle_hooks", &self.recycle.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Connection {
        resets: AtomicUsize,
        closed: AtomicUsize,
    }

    impl Recyclable for Connection {
        fn recycle(&self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Disposable for Connection {
        fn dispose(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_hooks_reach_typed_instance() {
        let activator = FactoryActivator::from_default::<Connection>()
            .recyclable::<Connection>()
            .disposable::<Connection>();

        let instance = activator.create(&mut CreationContext::empty()).unwrap();
        activator.recycle(&instance);
        activator.recycle(&instance);
        activator.destroy(&instance);

        let connection = instance.downcast_ref::<Connection>().unwrap();
        assert_eq!(connection.resets.load(Ordering::SeqCst), 2);
        assert_eq!(connection.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hooks_ignore_other_types() {
        let activator = FactoryActivator::new(|_| Ok(42u32)).recyclable::<Connection>();
        let instance = activator.create(&mut CreationContext::empty()).unwrap();

        activator.recycle(&instance);
        assert_eq!(instance.downcast_ref::<u32>(), Some(&42));
    }
}
