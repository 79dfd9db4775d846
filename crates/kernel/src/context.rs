use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{KernelError, KernelResult};
use crate::kernel::{Handler, Kernel};
use crate::lifestyle::ScopeId;
use crate::model::{Arguments, ComponentDescriptor, Instance, ServiceType};
use crate::release::Burden;

static NO_ARGUMENTS: Lazy<Arguments> = Lazy::new(Arguments::new);

struct Frame {
    handler: Arc<Handler>,
    arguments: Arguments,
    children: Vec<Burden>,
}

/// Per-call resolution state.
///
/// Holds the stack of components being built, which drives cycle detection,
/// the burdens of dependencies resolved so far and the instances published as
/// in progress.
pub struct CreationContext {
    kernel: Option<Kernel>,
    frames: Vec<Frame>,
    root_children: Vec<Burden>,
    properties: HashMap<String, Instance>,
    scope: Option<ScopeId>,
}

impl CreationContext {
    /// Context not bound to any kernel; nested resolution fails
    pub fn empty() -> Self {
        Self {
            kernel: None,
            frames: Vec::new(),
            root_children: Vec::new(),
            properties: HashMap::new(),
            scope: None,
        }
    }

    pub fn new(kernel: Kernel, scope: Option<ScopeId>) -> Self {
        Self {
            kernel: Some(kernel),
            scope,
            ..Self::empty()
        }
    }

    pub fn kernel(&self) -> Option<&Kernel> {
        self.kernel.as_ref()
    }

    pub(crate) fn bind_kernel(&mut self, kernel: Kernel) {
        self.kernel = Some(kernel);
    }

    pub fn scope(&self) -> Option<ScopeId> {
        self.scope
    }

    /// Check if the component is somewhere on the resolution stack
    pub fn is_resolving(&self, key: &str) -> bool {
        self.frames.iter().any(|frame| frame.handler.key() == key)
    }

    /// Keys on the resolution stack, outermost first
    pub fn resolution_path(&self) -> Vec<&str> {
        self.frames.iter().map(|frame| frame.handler.key()).collect()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Descriptor of the component currently being built
    pub fn component(&self) -> Option<&ComponentDescriptor> {
        self.frames.last().map(|frame| frame.handler.descriptor())
    }

    /// Arguments passed for the component currently being built
    pub fn arguments(&self) -> &Arguments {
        self.frames
            .last()
            .map(|frame| &frame.arguments)
            .unwrap_or_else(|| &*NO_ARGUMENTS)
    }

    /// Look up a named value; a JSON argument wins over a descriptor parameter
    pub fn parameter(&self, name: &str) -> Option<Value> {
        self.arguments()
            .get::<Value>(name)
            .or_else(|| self.component().and_then(|c| c.parameter(name)))
            .cloned()
    }

    /// Deserialize a named value into `T`
    pub fn parameter_as<T: DeserializeOwned>(&self, name: &str) -> KernelResult<Option<T>> {
        match self.parameter(name) {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| KernelError::activation(self.current_key(), e)),
            None => Ok(None),
        }
    }

    /// Publish the instance being built so dependencies can refer back to it
    pub fn set_in_progress(&mut self, instance: Instance) {
        if let Some(frame) = self.frames.last() {
            let key = frame.handler.key().to_string();
            self.properties.insert(key, instance);
        }
    }

    pub fn contextual_property(&self, key: &str) -> Option<&Instance> {
        self.properties.get(key)
    }

    /// Instance published for `key`, unless a singleton is being built
    /// between that component and the top of the stack
    pub fn in_progress(&self, key: &str) -> Option<Instance> {
        let owner = self
            .frames
            .iter()
            .rposition(|frame| frame.handler.key() == key)?;

        let singleton_between = self.frames[owner + 1..]
            .iter()
            .any(|frame| frame.handler.descriptor().lifestyle().is_singleton());
        if singleton_between {
            return None;
        }

        self.properties.get(key).cloned()
    }

    pub fn resolve(&mut self, service: &ServiceType) -> KernelResult<Instance> {
        self.resolve_with_args(service, Arguments::new())
    }

    pub fn resolve_with_args(
        &mut self,
        service: &ServiceType,
        arguments: Arguments,
    ) -> KernelResult<Instance> {
        let kernel = self.require_kernel()?;
        kernel.resolve_in_context(self, None, Some(service), arguments)
    }

    /// Resolve the component registered under `key`, optionally checking it supplies `service`
    pub fn resolve_named(
        &mut self,
        key: &str,
        service: Option<&ServiceType>,
    ) -> KernelResult<Instance> {
        let kernel = self.require_kernel()?;
        kernel.resolve_in_context(self, Some(key), service, Arguments::new())
    }

    pub fn resolve_all(&mut self, service: &ServiceType) -> KernelResult<Vec<Instance>> {
        let kernel = self.require_kernel()?;
        kernel.resolve_all_in_context(self, service, &Arguments::new())
    }

    /// Resolve a concrete service and downcast it
    pub fn resolve_as<T: std::any::Any + Send + Sync>(&mut self) -> KernelResult<Arc<T>> {
        let instance = self.resolve(&ServiceType::of::<T>())?;
        Kernel::downcast::<T>(instance, self.current_key())
    }

    /// Resolve a trait service whose instances are stored as `Arc<S>`
    pub fn resolve_trait<S: ?Sized + Send + Sync + 'static>(&mut self) -> KernelResult<Arc<S>> {
        let instance = self.resolve(&ServiceType::of::<S>())?;
        Kernel::unwrap_shared::<S>(&instance, self.current_key())
    }

    fn require_kernel(&self) -> KernelResult<Kernel> {
        self.kernel.clone().ok_or_else(|| {
            KernelError::dependency_resolution(
                self.current_key(),
                "no kernel is bound to the creation context",
            )
        })
    }

    fn current_key(&self) -> String {
        self.frames
            .last()
            .map(|frame| frame.handler.key().to_string())
            .unwrap_or_default()
    }

    pub(crate) fn enter(&mut self, handler: Arc<Handler>, arguments: Arguments) {
        self.frames.push(Frame {
            handler,
            arguments,
            children: Vec::new(),
        });
    }

    /// Pop the top frame, returning the dependency burdens nobody adopted
    pub(crate) fn exit(&mut self) -> Vec<Burden> {
        let Some(frame) = self.frames.pop() else {
            return Vec::new();
        };

        let key = frame.handler.key();
        if !self.is_resolving(key) {
            self.properties.remove(key);
        }
        frame.children
    }

    /// Take the dependency burdens collected for the component on top of the stack
    pub(crate) fn take_children(&mut self) -> Vec<Burden> {
        match self.frames.last_mut() {
            Some(frame) => std::mem::take(&mut frame.children),
            None => std::mem::take(&mut self.root_children),
        }
    }

    pub(crate) fn attach(&mut self, burden: Burden) {
        match self.frames.last_mut() {
            Some(frame) => frame.children.push(burden),
            None => self.root_children.push(burden),
        }
    }

    pub(crate) fn take_root_burdens(&mut self) -> Vec<Burden> {
        std::mem::take(&mut self.root_children)
    }
}

impl Default for CreationContext {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for CreationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreationContext")
            .field("path", &self.resolution_path())
            .field("scope", &self.scope)
            .field("in_progress", &self.properties.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context() {
        let mut context = CreationContext::empty();

        assert!(context.kernel().is_none());
        assert_eq!(context.depth(), 0);
        assert!(context.arguments().is_empty());
        assert!(context.parameter("anything").is_none());
        assert!(context.in_progress("a").is_none());

        let err = context.resolve(&ServiceType::of::<String>()).unwrap_err();
        assert!(matches!(err, KernelError::DependencyResolutionFailed { .. }));
    }

    #[test]
    fn test_set_in_progress_without_frame_is_ignored() {
        let mut context = CreationContext::empty();
        context.set_in_progress(Arc::new(1u8));
        assert!(context.contextual_property("").is_none());
    }
}
