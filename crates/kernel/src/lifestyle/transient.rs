use std::sync::Arc;

use crate::activation::ComponentActivator;
use crate::context::CreationContext;
use crate::errors::KernelResult;
use crate::lifestyle::{create_instance, LifestyleManager};
use crate::model::Instance;
use crate::release::Burden;

/// Creates a new instance on every request and destroys it on release
pub struct TransientLifestyleManager {
    component: String,
    activator: Arc<dyn ComponentActivator>,
}

impl TransientLifestyleManager {
    pub fn new(component: impl Into<String>, activator: Arc<dyn ComponentActivator>) -> Self {
        Self {
            component: component.into(),
            activator,
        }
    }
}

impl LifestyleManager for TransientLifestyleManager {
    fn resolve(&self, context: &mut CreationContext, burden: &mut Burden) -> KernelResult<Instance> {
        create_instance(self.activator.as_ref(), context, burden)
    }

    fn release(&self, instance: &Instance) -> bool {
        self.activator.destroy(instance);
        true
    }

    fn dispose(&self) {}
}

impl std::fmt::Debug for TransientLifestyleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransientLifestyleManager")
            .field("component", &self.component)
            .finish()
    }
}
