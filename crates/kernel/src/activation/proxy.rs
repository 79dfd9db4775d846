use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::activation::ComponentActivator;
use crate::context::CreationContext;
use crate::errors::KernelResult;
use crate::model::{Instance, InstanceKey, InterceptorReference};

/// Wraps a target instance with its interceptors.
///
/// Interceptors arrive in binding order; the factory applies them in that order.
pub trait ProxyFactory: Send + Sync {
    fn create_proxy(
        &self,
        component: &str,
        target: Instance,
        interceptors: Vec<Instance>,
    ) -> KernelResult<Instance>;
}

/// Activator decorator that resolves a component's interceptors and hands
/// them, with the target, to a [`ProxyFactory`].
///
/// Destroy and recycle hooks run against the target behind each proxy.
pub struct InterceptingActivator {
    component: String,
    target: Arc<dyn ComponentActivator>,
    interceptors: Vec<InterceptorReference>,
    proxy_factory: Arc<dyn ProxyFactory>,
    targets: Mutex<HashMap<InstanceKey, ProxiedTarget>>,
}

struct ProxiedTarget {
    proxy: Weak<dyn Any + Send + Sync>,
    target: Instance,
}

impl InterceptingActivator {
    pub fn new(
        component: impl Into<String>,
        target: Arc<dyn ComponentActivator>,
        interceptors: Vec<InterceptorReference>,
        proxy_factory: Arc<dyn ProxyFactory>,
    ) -> Self {
        Self {
            component: component.into(),
            target,
            interceptors,
            proxy_factory,
            targets: Mutex::new(HashMap::new()),
        }
    }

    /// Target behind `instance`, or `instance` itself when it is not one of our proxies
    fn target_of(&self, instance: &Instance) -> Instance {
        self.targets
            .lock()
            .get(&InstanceKey::of(instance))
            .map(|entry| entry.target.clone())
            .unwrap_or_else(|| instance.clone())
    }
}

impl ComponentActivator for InterceptingActivator {
    fn create(&self, context: &mut CreationContext) -> KernelResult<Instance> {
        let target = self.target.create(context)?;
        if self.interceptors.is_empty() {
            return Ok(target);
        }

        let interceptors = self
            .interceptors
            .iter()
            .map(|reference| context.resolve_named(reference.key(), None))
            .collect::<KernelResult<Vec<_>>>()?;

        tracing::trace!(
            "Proxying '{}' with {} interceptor(s)",
            self.component,
            interceptors.len()
        );

        let proxy = self
            .proxy_factory
            .create_proxy(&self.component, target.clone(), interceptors)?;
        if InstanceKey::of(&proxy) == InstanceKey::of(&target) {
            return Ok(proxy);
        }

        let mut targets = self.targets.lock();
        // Proxies dropped without a release leave stale entries behind
        targets.retain(|_, entry| entry.proxy.strong_count() > 0);
        targets.insert(
            InstanceKey::of(&proxy),
            ProxiedTarget {
                proxy: Arc::downgrade(&proxy),
                target,
            },
        );
        Ok(proxy)
    }

    fn destroy(&self, instance: &Instance) {
        let proxied = self.targets.lock().remove(&InstanceKey::of(instance));
        match proxied {
            Some(entry) => self.target.destroy(&entry.target),
            None => self.target.destroy(instance),
        }
    }

    fn recycle(&self, instance: &Instance) {
        self.target.recycle(&self.target_of(instance));
    }
}

impl std::fmt::Debug for InterceptingActivator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptingActivator")
            .field("component", &self.component)
            .field("interceptors", &self.interceptors)
            .finish()
    }
}
