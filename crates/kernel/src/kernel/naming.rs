use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{KernelError, KernelResult};
use crate::kernel::Handler;
use crate::model::{DependencyModel, DependencyTarget, ServiceType};

/// Registered handlers, indexed by key and by service.
///
/// Handlers for a service are kept in registration order; the first one
/// registered is the default for that service.
#[derive(Default)]
pub(crate) struct NamingSubsystem {
    handlers: Vec<Arc<Handler>>,
    by_key: HashMap<String, Arc<Handler>>,
    by_service: HashMap<ServiceType, Vec<Arc<Handler>>>,
}

impl NamingSubsystem {
    pub fn register(&mut self, handler: Arc<Handler>) -> KernelResult<()> {
        let key = handler.key().to_string();
        if self.by_key.contains_key(&key) {
            return Err(KernelError::registration(
                key,
                "a component with this key is already registered",
            ));
        }

        for service in handler.descriptor().services() {
            self.by_service
                .entry(*service)
                .or_default()
                .push(Arc::clone(&handler));
        }
        self.by_key.insert(key, Arc::clone(&handler));
        self.handlers.push(handler);
        Ok(())
    }

    pub fn handler(&self, key: &str) -> Option<Arc<Handler>> {
        self.by_key.get(key).cloned()
    }

    /// Default handler for `service`: the first registered for it, else the
    /// first whose implementation is `service`
    pub fn first_for(&self, service: &ServiceType) -> Option<Arc<Handler>> {
        self.by_service
            .get(service)
            .and_then(|handlers| handlers.first())
            .or_else(|| {
                self.handlers
                    .iter()
                    .find(|h| h.descriptor().implementation() == *service)
            })
            .cloned()
    }

    /// Every handler whose component can stand in for `service`, in registration order
    pub fn assignable(&self, service: &ServiceType) -> Vec<Arc<Handler>> {
        self.handlers
            .iter()
            .filter(|h| h.descriptor().is_assignable_to(service))
            .cloned()
            .collect()
    }

    pub fn handlers(&self) -> &[Arc<Handler>] {
        &self.handlers
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    fn satisfies(&self, dependency: &DependencyModel) -> bool {
        match dependency.target() {
            DependencyTarget::Service(service) => self.first_for(service).is_some(),
            DependencyTarget::Key(key) => self.by_key.contains_key(key),
        }
    }

    /// Recompute every handler's state; returns the handlers that just became valid
    pub fn refresh_states(&self) -> Vec<Arc<Handler>> {
        self.handlers
            .iter()
            .filter(|handler| {
                let missing = handler
                    .descriptor()
                    .dependencies()
                    .iter()
                    .filter(|d| !d.is_optional() && !self.satisfies(d))
                    .cloned()
                    .collect();
                handler.update_state(missing)
            })
            .cloned()
            .collect()
    }
}
