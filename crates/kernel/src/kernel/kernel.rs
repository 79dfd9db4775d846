use std::any::Any;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::KernelConfig;
use crate::context::CreationContext;
use crate::errors::{KernelError, KernelResult};
use crate::kernel::naming::NamingSubsystem;
use crate::kernel::Handler;
use crate::lifestyle::{create_manager, ComponentReleaser, ScopeId};
use crate::model::{Arguments, ComponentDescriptor, Instance, ServiceType};
use crate::release::{create_policy, ReleasePolicy};

pub(crate) struct KernelInner {
    config: KernelConfig,
    naming: RwLock<NamingSubsystem>,
    policy: Box<dyn ReleasePolicy>,
    scopes: Mutex<HashSet<ScopeId>>,
    disposed: AtomicBool,
}

impl KernelInner {
    fn release(&self, instance: &Instance) {
        if self.policy.release(instance) {
            return;
        }

        let handlers = self.naming.read().handlers().to_vec();
        if let Some(handler) = handlers
            .iter()
            .find(|h| h.lifestyle().recognizes(instance))
        {
            handler.release(instance);
        }
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        tracing::info!("Disposing kernel");
        self.policy.dispose();

        let handlers = self.naming.read().handlers().to_vec();
        let scopes: Vec<ScopeId> = self.scopes.lock().drain().collect();
        for scope in scopes {
            for handler in &handlers {
                handler.lifestyle().end_scope(scope);
            }
        }

        for handler in handlers.iter().rev() {
            handler.dispose();
        }
    }
}

impl ComponentReleaser for KernelInner {
    fn release_component(&self, instance: &Instance) {
        self.release(instance);
    }
}

impl Drop for KernelInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Resolution engine.
///
/// Cheap to clone; clones share the same registrations and tracked instances.
#[derive(Clone)]
pub struct Kernel {
    inner: Arc<KernelInner>,
}

impl Kernel {
    /// Create a kernel with the default configuration
    pub fn new() -> Self {
        Self::build(KernelConfig::default(), None)
    }

    /// Create a kernel with a validated configuration
    pub fn with_config(config: KernelConfig) -> KernelResult<Self> {
        config.validate()?;
        Ok(Self::build(config, None))
    }

    /// Create a kernel configured from `ELIF_KERNEL_*` environment variables
    pub fn from_env() -> KernelResult<Self> {
        Self::with_config(KernelConfig::from_env()?)
    }

    /// Create a kernel using a custom release policy
    pub fn with_release_policy(
        config: KernelConfig,
        policy: Box<dyn ReleasePolicy>,
    ) -> KernelResult<Self> {
        config.validate()?;
        Ok(Self::build(config, Some(policy)))
    }

    fn build(config: KernelConfig, policy: Option<Box<dyn ReleasePolicy>>) -> Self {
        let policy = policy.unwrap_or_else(|| create_policy(config.release_policy));
        Self {
            inner: Arc::new(KernelInner {
                config,
                naming: RwLock::new(NamingSubsystem::default()),
                policy,
                scopes: Mutex::new(HashSet::new()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<KernelInner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.inner.config
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    fn ensure_active(&self) -> KernelResult<()> {
        if self.is_disposed() {
            return Err(KernelError::Disposed);
        }
        Ok(())
    }

    /// Register a component.
    ///
    /// Pooled components whose dependencies are all registered warm their
    /// pool here; a failed warm-up is retried on first resolve.
    pub fn register(&self, descriptor: ComponentDescriptor) -> KernelResult<Arc<Handler>> {
        self.ensure_active()?;

        let manager = create_manager(&descriptor, &self.inner.config, Arc::downgrade(&self.inner))?;
        let handler = Arc::new(Handler::new(descriptor, manager));

        let ready = {
            let mut naming = self.inner.naming.write();
            naming.register(Arc::clone(&handler))?;
            naming.refresh_states()
        };

        tracing::debug!(
            "Registered component '{}' ({})",
            handler.key(),
            handler.descriptor().lifestyle()
        );

        for handler in &ready {
            if let Err(e) = handler.warm_up(self) {
                tracing::warn!("Warm-up of '{}' failed: {}", handler.key(), e);
            }
        }

        Ok(handler)
    }

    pub fn handler(&self, key: &str) -> Option<Arc<Handler>> {
        self.inner.naming.read().handler(key)
    }

    /// Handlers able to supply `service`, in registration order
    pub fn handlers_for(&self, service: &ServiceType) -> Vec<Arc<Handler>> {
        self.inner.naming.read().assignable(service)
    }

    pub fn has_component(&self, key: &str) -> bool {
        self.handler(key).is_some()
    }

    pub fn component_count(&self) -> usize {
        self.inner.naming.read().len()
    }

    /// Number of instances the release policy currently tracks
    pub fn tracked_count(&self) -> usize {
        self.inner.policy.tracked_count()
    }

    pub fn is_tracked(&self, instance: &Instance) -> bool {
        self.inner.policy.has_track(instance)
    }

    /// Resolve the default component for `service`
    pub fn resolve(&self, service: &ServiceType) -> KernelResult<Instance> {
        self.resolve_root(None, None, Some(service), Arguments::new())
    }

    pub fn resolve_with_args(
        &self,
        service: &ServiceType,
        arguments: Arguments,
    ) -> KernelResult<Instance> {
        self.resolve_root(None, None, Some(service), arguments)
    }

    /// Resolve the component registered under `key`, optionally checking it supplies `service`
    pub fn resolve_named(
        &self,
        key: &str,
        service: Option<&ServiceType>,
        arguments: Arguments,
    ) -> KernelResult<Instance> {
        self.resolve_root(None, Some(key), service, arguments)
    }

    /// Resolve a concrete service and downcast it
    pub fn resolve_as<T: Any + Send + Sync>(&self) -> KernelResult<Arc<T>> {
        let instance = self.resolve(&ServiceType::of::<T>())?;
        Self::downcast::<T>(instance, std::any::type_name::<T>())
    }

    pub fn resolve_named_as<T: Any + Send + Sync>(&self, key: &str) -> KernelResult<Arc<T>> {
        let instance = self.resolve_named(key, None, Arguments::new())?;
        Self::downcast::<T>(instance, key)
    }

    /// Resolve a trait service whose factory returns `Arc<S>`
    pub fn resolve_trait<S: ?Sized + Send + Sync + 'static>(&self) -> KernelResult<Arc<S>> {
        let instance = self.resolve(&ServiceType::of::<S>())?;
        Self::unwrap_shared::<S>(&instance, std::any::type_name::<S>())
    }

    /// Resolve every component assignable to `service`.
    ///
    /// Components already being built in this call are skipped, as are
    /// components whose dependencies cannot be satisfied.
    pub fn resolve_all(&self, service: &ServiceType) -> KernelResult<Vec<Instance>> {
        self.resolve_all_with_args(service, Arguments::new())
    }

    pub fn resolve_all_with_args(
        &self,
        service: &ServiceType,
        arguments: Arguments,
    ) -> KernelResult<Vec<Instance>> {
        self.ensure_active()?;

        let mut context = CreationContext::new(self.clone(), None);
        let result = self.resolve_all_in_context(&mut context, service, &arguments);
        let roots = context.take_root_burdens();

        match result {
            Ok(instances) => {
                for burden in roots {
                    self.inner.policy.track(burden);
                }
                Ok(instances)
            }
            Err(e) => {
                for burden in roots.into_iter().rev() {
                    burden.release();
                }
                Err(e)
            }
        }
    }

    /// Open a scope for scoped components
    pub fn begin_scope(&self) -> KernelResult<ScopeId> {
        self.ensure_active()?;
        let scope = ScopeId::new();
        self.inner.scopes.lock().insert(scope);
        tracing::trace!("Began scope {}", scope);
        Ok(scope)
    }

    /// Resolve the default component for `service` within `scope`.
    ///
    /// Fails with [`KernelError::ScopeNotActive`] when `scope` was never
    /// opened or has ended.
    pub fn resolve_in_scope(&self, scope: ScopeId, service: &ServiceType) -> KernelResult<Instance> {
        if !self.inner.scopes.lock().contains(&scope) {
            let handler = self.select_handler(None, Some(service))?;
            return Err(KernelError::ScopeNotActive {
                component: handler.key().to_string(),
            });
        }
        self.resolve_root(Some(scope), None, Some(service), Arguments::new())
    }

    /// Close `scope`, destroying the scoped instances created in it
    pub fn end_scope(&self, scope: ScopeId) -> KernelResult<()> {
        if !self.inner.scopes.lock().remove(&scope) {
            return Err(KernelError::invalid_argument(
                "scope",
                format!("scope {} is not active", scope),
            ));
        }

        let handlers = self.inner.naming.read().handlers().to_vec();
        for handler in &handlers {
            handler.lifestyle().end_scope(scope);
        }
        Ok(())
    }

    /// Release an instance obtained from this kernel.
    ///
    /// Tracked instances are released through the policy, cascading to their
    /// dependencies. Unknown instances are ignored.
    pub fn release(&self, instance: &Instance) {
        self.inner.release(instance);
    }

    pub fn release_as<T: Any + Send + Sync>(&self, instance: &Arc<T>) {
        let instance: Instance = Arc::clone(instance) as Instance;
        self.inner.release(&instance);
    }

    /// Release everything tracked and tear down every lifestyle.
    ///
    /// Idempotent; later resolves fail with [`KernelError::Disposed`].
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    fn resolve_root(
        &self,
        scope: Option<ScopeId>,
        key: Option<&str>,
        service: Option<&ServiceType>,
        arguments: Arguments,
    ) -> KernelResult<Instance> {
        self.ensure_active()?;

        let mut context = CreationContext::new(self.clone(), scope);
        let instance = self.resolve_in_context(&mut context, key, service, arguments)?;
        for burden in context.take_root_burdens() {
            self.inner.policy.track(burden);
        }
        Ok(instance)
    }

    pub(crate) fn resolve_in_context(
        &self,
        context: &mut CreationContext,
        key: Option<&str>,
        service: Option<&ServiceType>,
        arguments: Arguments,
    ) -> KernelResult<Instance> {
        self.ensure_active()?;
        let handler = self.select_handler(key, service)?;
        handler.resolve(context, arguments)
    }

    pub(crate) fn resolve_all_in_context(
        &self,
        context: &mut CreationContext,
        service: &ServiceType,
        arguments: &Arguments,
    ) -> KernelResult<Vec<Instance>> {
        self.ensure_active()?;
        let candidates = self.inner.naming.read().assignable(service);

        let mut instances = Vec::with_capacity(candidates.len());
        for handler in candidates {
            if context.is_resolving(handler.key()) {
                tracing::trace!("Skipping '{}', already being resolved", handler.key());
                continue;
            }

            match handler.resolve(context, arguments.clone()) {
                Ok(instance) => instances.push(instance),
                Err(e) if e.is_resolution_failure() => {
                    tracing::debug!("Skipping '{}' for {}: {}", handler.key(), service, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(instances)
    }

    fn select_handler(
        &self,
        key: Option<&str>,
        service: Option<&ServiceType>,
    ) -> KernelResult<Arc<Handler>> {
        let naming = self.inner.naming.read();

        match (key, service) {
            (Some(key), service) => {
                if key.trim().is_empty() {
                    return Err(KernelError::invalid_argument(
                        "key",
                        "component key must not be empty",
                    ));
                }
                let handler = naming
                    .handler(key)
                    .ok_or_else(|| KernelError::component_not_found(format!("key '{}'", key)))?;
                match service {
                    Some(service) if !handler.descriptor().is_assignable_to(service) => {
                        Err(KernelError::component_not_found(format!(
                            "key '{}' supplying service '{}'",
                            key, service
                        )))
                    }
                    _ => Ok(handler),
                }
            }
            (None, Some(service)) => naming
                .first_for(service)
                .ok_or_else(|| KernelError::component_not_found(format!("service '{}'", service))),
            (None, None) => Err(KernelError::invalid_argument(
                "service",
                "a key or a service type is required",
            )),
        }
    }

    pub(crate) fn downcast<T: Any + Send + Sync>(
        instance: Instance,
        component: impl Into<String>,
    ) -> KernelResult<Arc<T>> {
        instance
            .downcast::<T>()
            .map_err(|_| KernelError::InvalidCast {
                component: component.into(),
                expected: std::any::type_name::<T>(),
            })
    }

    pub(crate) fn unwrap_shared<S: ?Sized + Send + Sync + 'static>(
        instance: &Instance,
        component: impl Into<String>,
    ) -> KernelResult<Arc<S>> {
        instance
            .downcast_ref::<Arc<S>>()
            .cloned()
            .ok_or_else(|| KernelError::InvalidCast {
                component: component.into(),
                expected: std::any::type_name::<Arc<S>>(),
            })
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("components", &self.component_count())
            .field("tracked", &self.tracked_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
