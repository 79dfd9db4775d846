use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::CreationContext;
use crate::errors::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::lifestyle::{LifestyleManager, Pool};
use crate::model::{Arguments, ComponentDescriptor, DependencyModel, Instance, ServiceType};
use crate::release::Burden;

/// Whether a handler can build its component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerState {
    Valid,
    /// Required dependencies with no matching registration yet
    WaitingDependency(Vec<DependencyModel>),
}

impl HandlerState {
    pub fn is_valid(&self) -> bool {
        matches!(self, HandlerState::Valid)
    }
}

/// Couples a registered component with its lifestyle manager
pub struct Handler {
    descriptor: ComponentDescriptor,
    lifestyle: Box<dyn LifestyleManager>,
    state: RwLock<HandlerState>,
}

impl Handler {
    pub(crate) fn new(descriptor: ComponentDescriptor, lifestyle: Box<dyn LifestyleManager>) -> Self {
        let required = descriptor
            .dependencies()
            .iter()
            .filter(|d| !d.is_optional())
            .cloned()
            .collect();

        Self {
            descriptor,
            lifestyle,
            state: RwLock::new(HandlerState::WaitingDependency(required)),
        }
    }

    pub fn key(&self) -> &str {
        self.descriptor.key()
    }

    pub fn descriptor(&self) -> &ComponentDescriptor {
        &self.descriptor
    }

    pub fn lifestyle(&self) -> &dyn LifestyleManager {
        self.lifestyle.as_ref()
    }

    pub fn state(&self) -> HandlerState {
        self.state.read().clone()
    }

    pub fn is_valid(&self) -> bool {
        self.state.read().is_valid()
    }

    pub fn supplies(&self, service: &ServiceType) -> bool {
        self.descriptor.supplies(service)
    }

    /// Pool backing a pooled component, once created
    pub fn pool(&self) -> Option<&Pool> {
        self.lifestyle.pool()
    }

    /// Record which dependencies are still missing; returns `true` if the
    /// handler just became valid
    pub(crate) fn update_state(&self, missing: Vec<DependencyModel>) -> bool {
        let mut state = self.state.write();
        let was_valid = state.is_valid();
        *state = if missing.is_empty() {
            HandlerState::Valid
        } else {
            HandlerState::WaitingDependency(missing)
        };
        !was_valid && state.is_valid()
    }

    /// Produce an instance within `context`
    pub fn resolve(
        self: &Arc<Self>,
        context: &mut CreationContext,
        arguments: Arguments,
    ) -> KernelResult<Instance> {
        if context.is_resolving(self.key()) {
            return self.lifestyle.resolve_reentrant(context).ok_or_else(|| {
                let mut path = context.resolution_path();
                path.push(self.key());
                KernelError::CircularDependency {
                    path: path.join(" -> "),
                    component: self.key().to_string(),
                }
            });
        }

        self.ensure_valid()?;

        let mut burden = Burden::new(Arc::clone(self));
        context.enter(Arc::clone(self), arguments);
        let result = self.lifestyle.resolve(context, &mut burden);
        for leftover in context.exit().into_iter().rev() {
            leftover.release();
        }

        let instance = result?;
        if burden.instance().is_some() {
            context.attach(burden);
        }
        Ok(instance)
    }

    fn ensure_valid(&self) -> KernelResult<()> {
        match &*self.state.read() {
            HandlerState::Valid => Ok(()),
            HandlerState::WaitingDependency(missing) => {
                let missing: Vec<String> = missing.iter().map(ToString::to_string).collect();
                Err(KernelError::dependency_resolution(
                    self.key(),
                    format!("waiting for {}", missing.join(", ")),
                ))
            }
        }
    }

    /// Hand an instance back to the lifestyle; returns `true` if it was destroyed
    pub fn release(&self, instance: &Instance) -> bool {
        self.lifestyle.release(instance)
    }

    /// Let the lifestyle prepare instances, with this component on the
    /// context stack so that dependencies leading back to it fail as cycles
    pub(crate) fn warm_up(self: &Arc<Self>, kernel: &Kernel) -> KernelResult<()> {
        let mut context = CreationContext::new(kernel.clone(), None);
        context.enter(Arc::clone(self), Arguments::new());
        let result = self.lifestyle.warm_up(&mut context);
        for leftover in context.exit().into_iter().rev() {
            leftover.release();
        }
        result
    }

    pub(crate) fn dispose(&self) {
        self.lifestyle.dispose();
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("key", &self.key())
            .field("lifestyle", &self.descriptor.lifestyle())
            .field("state", &*self.state.read())
            .finish()
    }
}
