use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::activation::ComponentActivator;
use crate::context::CreationContext;
use crate::errors::{KernelError, KernelResult};
use crate::lifestyle::{create_instance, LifestyleManager};
use crate::model::Instance;
use crate::release::Burden;

/// Identifier of an open resolution scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(Uuid);

impl ScopeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One instance per open scope, destroyed when the scope ends
pub struct ScopedLifestyleManager {
    component: String,
    activator: Arc<dyn ComponentActivator>,
    instances: Mutex<HashMap<ScopeId, Burden>>,
}

impl ScopedLifestyleManager {
    pub fn new(component: impl Into<String>, activator: Arc<dyn ComponentActivator>) -> Self {
        Self {
            component: component.into(),
            activator,
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Number of scopes currently holding an instance
    pub fn live_scopes(&self) -> usize {
        self.instances.lock().len()
    }
}

impl LifestyleManager for ScopedLifestyleManager {
    fn resolve(&self, context: &mut CreationContext, burden: &mut Burden) -> KernelResult<Instance> {
        let scope = context.scope().ok_or_else(|| KernelError::ScopeNotActive {
            component: self.component.clone(),
        })?;

        let mut instances = self.instances.lock();
        if let Some(instance) = instances.get(&scope).and_then(Burden::instance).cloned() {
            burden.set_instance(instance.clone());
            burden.set_requires_policy_release(false);
            return Ok(instance);
        }

        let instance = create_instance(self.activator.as_ref(), context, burden)?;
        instances.insert(scope, burden.take_ownership());
        Ok(instance)
    }

    fn release(&self, _instance: &Instance) -> bool {
        false
    }

    fn end_scope(&self, scope: ScopeId) {
        let owned = self.instances.lock().remove(&scope);
        if let Some(burden) = owned {
            tracing::trace!("Ending scope {} for '{}'", scope, self.component);
            burden.decommission(self.activator.as_ref());
        }
    }

    fn dispose(&self) {
        let drained: Vec<Burden> = self.instances.lock().drain().map(|(_, b)| b).collect();
        for burden in drained {
            burden.decommission(self.activator.as_ref());
        }
    }
}

impl std::fmt::Debug for ScopedLifestyleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedLifestyleManager")
            .field("component", &self.component)
            .finish()
    }
}
