use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::activation::ComponentActivator;
use crate::config::{ConfigValidator, PoolSizeValidator};
use crate::context::CreationContext;
use crate::errors::{KernelError, KernelResult};
use crate::model::{Instance, InstanceKey};

/// Release path of the container owning a pool
pub trait ComponentReleaser: Send + Sync {
    /// Release `instance` the way a client release would, cascading to its dependencies
    fn release_component(&self, instance: &Instance);
}

#[derive(Default)]
struct PoolState {
    available: Vec<Instance>,
    in_use: HashMap<InstanceKey, Instance>,
}

/// Bounded recycle pool for the instances of one component.
///
/// Only the idle stack is capped at `max_size`; the number of instances
/// handed out is not limited.
pub struct Pool {
    component: String,
    initial_size: usize,
    max_size: usize,
    state: Mutex<PoolState>,
    evicting: AtomicBool,
    activator: Arc<dyn ComponentActivator>,
    owner: Weak<dyn ComponentReleaser>,
}

impl Pool {
    /// Create a pool and warm it with `initial_size` idle instances
    pub fn new(
        component: impl Into<String>,
        initial_size: usize,
        max_size: usize,
        activator: Arc<dyn ComponentActivator>,
        owner: Weak<dyn ComponentReleaser>,
    ) -> KernelResult<Self> {
        Self::with_context(
            component,
            initial_size,
            max_size,
            activator,
            owner,
            &mut CreationContext::empty(),
        )
    }

    /// Like [`Pool::new`], warming up within `context`.
    ///
    /// The pooled component should be on top of the context stack so that a
    /// dependency leading back to it is reported as a cycle.
    pub fn with_context(
        component: impl Into<String>,
        initial_size: usize,
        max_size: usize,
        activator: Arc<dyn ComponentActivator>,
        owner: Weak<dyn ComponentReleaser>,
        context: &mut CreationContext,
    ) -> KernelResult<Self> {
        PoolSizeValidator.validate(&(initial_size, max_size))?;

        let pool = Self {
            component: component.into(),
            initial_size,
            max_size,
            state: Mutex::new(PoolState::default()),
            evicting: AtomicBool::new(false),
            activator,
            owner,
        };
        pool.warm_up(context)?;
        Ok(pool)
    }

    fn warm_up(&self, context: &mut CreationContext) -> KernelResult<()> {
        let mut created = Vec::with_capacity(self.initial_size);
        for _ in 0..self.initial_size {
            match self.request(context) {
                Ok(instance) => created.push(instance),
                Err(e) => {
                    for instance in created.iter().rev() {
                        self.discard(instance);
                    }
                    return Err(e);
                }
            }
        }
        for instance in &created {
            self.release(instance);
        }

        tracing::debug!(
            "Warmed pool for '{}' with {} instance(s)",
            self.component,
            created.len()
        );
        Ok(())
    }

    fn discard(&self, instance: &Instance) {
        self.state.lock().in_use.remove(&InstanceKey::of(instance));
        self.activator.destroy(instance);
    }

    /// Hand out an idle instance, or create one when none is idle.
    ///
    /// The pool lock is not held while the activator runs.
    pub fn request(&self, context: &mut CreationContext) -> KernelResult<Instance> {
        let idle = self.state.lock().available.pop();
        let reused = idle.is_some();
        let instance = match idle {
            Some(instance) => instance,
            None => self.activator.create(context)?,
        };

        let mut state = self.state.lock();
        if state.in_use.contains_key(&InstanceKey::of(&instance)) {
            let message = if reused {
                "Invalid instance on the pool stack"
            } else {
                "Activator didn't return a valid instance"
            };
            return Err(KernelError::pool(&self.component, message));
        }

        state
            .in_use
            .insert(InstanceKey::of(&instance), instance.clone());
        Ok(instance)
    }

    /// Take an instance back.
    ///
    /// Returns `true` when the instance was destroyed because the idle stack
    /// is full or the pool is evicting. An instance the pool does not hold
    /// reports the eviction flag.
    pub fn release(&self, instance: &Instance) -> bool {
        let mut state = self.state.lock();

        if state.in_use.remove(&InstanceKey::of(instance)).is_none() {
            return self.evicting.load(Ordering::SeqCst);
        }

        if !self.evicting.load(Ordering::SeqCst) && state.available.len() < self.max_size {
            self.activator.recycle(instance);
            state.available.push(instance.clone());
            false
        } else {
            self.activator.destroy(instance);
            true
        }
    }

    /// Evict every idle instance through the owner's release path
    pub fn dispose(&self) {
        self.evicting.store(true, Ordering::SeqCst);
        let idle = std::mem::take(&mut self.state.lock().available);

        tracing::debug!(
            "Evicting {} idle instance(s) of '{}'",
            idle.len(),
            self.component
        );

        match self.owner.upgrade() {
            Some(owner) => {
                for instance in idle.iter().rev() {
                    owner.release_component(instance);
                }
            }
            None => {
                for instance in idle.iter().rev() {
                    self.activator.destroy(instance);
                }
            }
        }
    }

    pub fn available_count(&self) -> usize {
        self.state.lock().available.len()
    }

    pub fn in_use_count(&self) -> usize {
        self.state.lock().in_use.len()
    }

    pub fn is_evicting(&self) -> bool {
        self.evicting.load(Ordering::SeqCst)
    }

    pub fn initial_size(&self) -> usize {
        self.initial_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("component", &self.component)
            .field("initial_size", &self.initial_size)
            .field("max_size", &self.max_size)
            .field("available", &self.available_count())
            .field("in_use", &self.in_use_count())
            .field("evicting", &self.is_evicting())
            .finish()
    }
}
