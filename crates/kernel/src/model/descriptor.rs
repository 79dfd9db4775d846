use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::activation::{
    ComponentActivator, Disposable, FactoryActivator, InterceptingActivator, ProxyFactory,
    Recyclable,
};
use crate::context::CreationContext;
use crate::errors::{KernelError, KernelResult};
use crate::lifestyle::Lifestyle;
use crate::model::{
    DependencyModel, DependencyModelCollection, InterceptorReference,
    InterceptorReferenceCollection, ServiceType,
};

/// Everything the kernel knows about one registered component
pub struct ComponentDescriptor {
    key: String,
    services: Vec<ServiceType>,
    implementation: ServiceType,
    lifestyle: Lifestyle,
    parameters: HashMap<String, Value>,
    dependencies: DependencyModelCollection,
    interceptors: Vec<InterceptorReference>,
    activator: Arc<dyn ComponentActivator>,
}

impl ComponentDescriptor {
    /// Start describing a component supplying `S`
    pub fn for_service<S: ?Sized + 'static>() -> ComponentBuilder {
        ComponentBuilder::new(ServiceType::of::<S>())
    }

    /// Describe a concrete type built with `Default`, registered as its own service
    pub fn for_component<T: Default + Any + Send + Sync>() -> ComponentBuilder {
        Self::for_service::<T>().implemented_by::<T>()
    }

    /// Registered key, unique within a kernel
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Services in registration order
    pub fn services(&self) -> &[ServiceType] {
        &self.services
    }

    pub fn implementation(&self) -> ServiceType {
        self.implementation
    }

    pub fn lifestyle(&self) -> Lifestyle {
        self.lifestyle
    }

    pub fn parameters(&self) -> &HashMap<String, Value> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    pub fn dependencies(&self) -> &DependencyModelCollection {
        &self.dependencies
    }

    /// Interceptor bindings in application order
    pub fn interceptors(&self) -> &[InterceptorReference] {
        &self.interceptors
    }

    pub fn has_interceptors(&self) -> bool {
        !self.interceptors.is_empty()
    }

    /// Edit the interceptor bindings before registration
    pub fn interceptors_mut(&mut self) -> InterceptorReferenceCollection<'_> {
        InterceptorReferenceCollection::new(&mut self.interceptors, &mut self.dependencies)
    }

    pub fn activator(&self) -> &Arc<dyn ComponentActivator> {
        &self.activator
    }

    /// Check if the component was registered for `service`
    pub fn supplies(&self, service: &ServiceType) -> bool {
        self.services.contains(service)
    }

    /// Check if an instance of this component can stand in for `service`
    pub fn is_assignable_to(&self, service: &ServiceType) -> bool {
        self.supplies(service) || self.implementation == *service
    }
}

impl std::fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("key", &self.key)
            .field("services", &self.services)
            .field("implementation", &self.implementation)
            .field("lifestyle", &self.lifestyle)
            .field("parameters", &self.parameters)
            .field("dependencies", &self.dependencies)
            .field("interceptors", &self.interceptors)
            .finish()
    }
}

enum ActivatorSpec {
    Factory(FactoryActivator),
    Custom(Arc<dyn ComponentActivator>),
}

type HookFn = fn(FactoryActivator) -> FactoryActivator;

/// Builder for component descriptors
pub struct ComponentBuilder {
    key: Option<String>,
    services: Vec<ServiceType>,
    implementation: Option<ServiceType>,
    lifestyle: Lifestyle,
    parameters: HashMap<String, Value>,
    dependencies: DependencyModelCollection,
    interceptors: Vec<InterceptorReference>,
    activator: Option<ActivatorSpec>,
    hooks: Vec<HookFn>,
    proxy_factory: Option<Arc<dyn ProxyFactory>>,
}

impl ComponentBuilder {
    fn new(service: ServiceType) -> Self {
        Self {
            key: None,
            services: vec![service],
            implementation: None,
            lifestyle: Lifestyle::default(),
            parameters: HashMap::new(),
            dependencies: DependencyModelCollection::new(),
            interceptors: Vec::new(),
            activator: None,
            hooks: Vec::new(),
            proxy_factory: None,
        }
    }

    /// Also register the component for `S`
    pub fn also_for<S: ?Sized + 'static>(mut self) -> Self {
        let service = ServiceType::of::<S>();
        if !self.services.contains(&service) {
            self.services.push(service);
        }
        self
    }

    /// Set the component key; defaults to the implementation type name
    pub fn named(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Build instances with `T::default()`
    pub fn implemented_by<T: Default + Any + Send + Sync>(mut self) -> Self {
        self.implementation = Some(ServiceType::of::<T>());
        self.activator = Some(ActivatorSpec::Factory(FactoryActivator::from_default::<T>()));
        self
    }

    /// Build instances with a factory that may resolve dependencies through the context
    pub fn with_factory<T, F>(mut self, factory: F) -> Self
    where
        F: Fn(&mut CreationContext) -> KernelResult<T> + Send + Sync + 'static,
        T: Any + Send + Sync,
    {
        self.implementation = Some(ServiceType::of::<T>());
        self.activator = Some(ActivatorSpec::Factory(FactoryActivator::new(factory)));
        self
    }

    /// Like [`with_factory`](Self::with_factory), for factories that return the shared instance
    pub fn with_arc_factory<T, F>(mut self, factory: F) -> Self
    where
        F: Fn(&mut CreationContext) -> KernelResult<Arc<T>> + Send + Sync + 'static,
        T: Any + Send + Sync,
    {
        self.implementation = Some(ServiceType::of::<T>());
        self.activator = Some(ActivatorSpec::Factory(FactoryActivator::from_arc(factory)));
        self
    }

    /// Use a custom activator
    pub fn activator(mut self, activator: Arc<dyn ComponentActivator>) -> Self {
        self.activator = Some(ActivatorSpec::Custom(activator));
        self
    }

    pub fn lifestyle(mut self, lifestyle: Lifestyle) -> Self {
        self.lifestyle = lifestyle;
        self
    }

    pub fn singleton(self) -> Self {
        self.lifestyle(Lifestyle::Singleton)
    }

    pub fn transient(self) -> Self {
        self.lifestyle(Lifestyle::Transient)
    }

    pub fn scoped(self) -> Self {
        self.lifestyle(Lifestyle::Scoped)
    }

    /// Pool instances, keeping `initial_size` warm and at most `max_size` idle
    pub fn pooled(self, initial_size: usize, max_size: usize) -> Self {
        self.lifestyle(Lifestyle::pooled_with(initial_size, max_size))
    }

    /// Add a configuration parameter
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Declare a dependency on any component supplying `S`
    pub fn depends_on<S: ?Sized + 'static>(mut self) -> Self {
        self.dependencies.add(DependencyModel::service::<S>());
        self
    }

    /// Declare a dependency on the component registered under `key`
    pub fn depends_on_key(mut self, key: impl Into<String>) -> Self {
        self.dependencies.add(DependencyModel::key(key));
        self
    }

    pub fn dependency(mut self, dependency: DependencyModel) -> Self {
        self.dependencies.add(dependency);
        self
    }

    /// Append an interceptor binding
    pub fn interceptor(mut self, reference: InterceptorReference) -> Self {
        self.interceptors_mut().add_last(reference);
        self
    }

    /// Edit the interceptor bindings in place
    pub fn interceptors<F>(mut self, edit: F) -> KernelResult<Self>
    where
        F: FnOnce(&mut InterceptorReferenceCollection<'_>) -> KernelResult<()>,
    {
        edit(&mut self.interceptors_mut())?;
        Ok(self)
    }

    /// Wrap instances with their interceptors through `factory`
    pub fn proxied_by(mut self, factory: Arc<dyn ProxyFactory>) -> Self {
        self.proxy_factory = Some(factory);
        self
    }

    /// Reset pooled instances of `T` through [`Recyclable`]
    pub fn recyclable<T: Recyclable + Any>(mut self) -> Self {
        self.hooks.push(FactoryActivator::recyclable::<T>);
        self
    }

    /// Dispose destroyed instances of `T` through [`Disposable`]
    pub fn disposable<T: Disposable + Any>(mut self) -> Self {
        self.hooks.push(FactoryActivator::disposable::<T>);
        self
    }

    fn interceptors_mut(&mut self) -> InterceptorReferenceCollection<'_> {
        InterceptorReferenceCollection::new(&mut self.interceptors, &mut self.dependencies)
    }

    /// Build the descriptor
    pub fn build(self) -> KernelResult<ComponentDescriptor> {
        let implementation = self.implementation.unwrap_or(self.services[0]);
        let key = self
            .key
            .unwrap_or_else(|| implementation.type_name().to_string());

        if key.trim().is_empty() {
            return Err(KernelError::registration(
                key,
                "component key must not be empty",
            ));
        }

        let activator: Arc<dyn ComponentActivator> = match self.activator {
            Some(ActivatorSpec::Factory(factory)) => {
                Arc::new(self.hooks.iter().fold(factory, |factory, hook| hook(factory)))
            }
            Some(ActivatorSpec::Custom(activator)) => {
                if !self.hooks.is_empty() {
                    return Err(KernelError::registration(
                        key,
                        "recycle and dispose hooks require a factory activator",
                    ));
                }
                activator
            }
            None => {
                return Err(KernelError::registration(
                    key,
                    "no activator; use implemented_by, with_factory or activator",
                ));
            }
        };

        let activator = match self.proxy_factory {
            Some(proxy_factory) if !self.interceptors.is_empty() => {
                Arc::new(InterceptingActivator::new(
                    key.clone(),
                    activator,
                    self.interceptors.clone(),
                    proxy_factory,
                )) as Arc<dyn ComponentActivator>
            }
            _ => activator,
        };

        Ok(ComponentDescriptor {
            key,
            services: self.services,
            implementation,
            lifestyle: self.lifestyle,
            parameters: self.parameters,
            dependencies: self.dependencies,
            interceptors: self.interceptors,
            activator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Notifier: Send + Sync {}

    #[derive(Debug, Default)]
    struct EmailNotifier;

    impl Notifier for EmailNotifier {}

    #[test]
    fn test_builder_defaults() {
        let descriptor = ComponentDescriptor::for_service::<dyn Notifier>()
            .implemented_by::<EmailNotifier>()
            .build()
            .unwrap();

        assert!(descriptor.key().contains("EmailNotifier"));
        assert_eq!(descriptor.lifestyle(), Lifestyle::Singleton);
        assert!(descriptor.supplies(&ServiceType::of::<dyn Notifier>()));
        assert!(!descriptor.supplies(&ServiceType::of::<EmailNotifier>()));
        assert!(descriptor.is_assignable_to(&ServiceType::of::<EmailNotifier>()));
        assert!(descriptor.dependencies().is_empty());
    }

    #[test]
    fn test_builder_full() {
        let descriptor = ComponentDescriptor::for_service::<dyn Notifier>()
            .also_for::<EmailNotifier>()
            .also_for::<dyn Notifier>()
            .implemented_by::<EmailNotifier>()
            .named("email")
            .pooled(2, 4)
            .parameter("smtp_host", "localhost")
            .parameter("smtp_port", 25)
            .depends_on::<String>()
            .interceptor(InterceptorReference::new("logging"))
            .build()
            .unwrap();

        assert_eq!(descriptor.key(), "email");
        assert_eq!(descriptor.services().len(), 2);
        assert_eq!(descriptor.lifestyle(), Lifestyle::pooled_with(2, 4));
        assert_eq!(descriptor.parameter("smtp_port"), Some(&Value::from(25)));
        assert_eq!(descriptor.dependencies().len(), 2);
        assert!(descriptor
            .dependencies()
            .contains(&DependencyModel::key("logging")));
        assert!(descriptor.has_interceptors());
    }

    #[test]
    fn test_builder_requires_activator() {
        let err = ComponentDescriptor::for_service::<dyn Notifier>()
            .named("orphan")
            .build()
            .unwrap_err();
        assert!(matches!(err, KernelError::ComponentRegistration { .. }));

        let err = ComponentDescriptor::for_component::<EmailNotifier>()
            .named("  ")
            .build()
            .unwrap_err();
        assert!(matches!(err, KernelError::ComponentRegistration { .. }));
    }

    #[test]
    fn test_interceptors_mut_after_build() {
        let mut descriptor = ComponentDescriptor::for_component::<EmailNotifier>()
            .interceptors(|interceptors| {
                interceptors.add(InterceptorReference::new("b"));
                interceptors.insert(0, InterceptorReference::new("a"))
            })
            .unwrap()
            .build()
            .unwrap();

        descriptor
            .interceptors_mut()
            .add_if_not_in_collection(InterceptorReference::new("a"));

        let keys: Vec<_> = descriptor.interceptors().iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
