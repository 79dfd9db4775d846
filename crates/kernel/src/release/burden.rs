use std::sync::Arc;

use crate::activation::ComponentActivator;
use crate::kernel::Handler;
use crate::model::Instance;

/// Ownership record for one resolved instance.
///
/// Children are the burdens of the dependencies resolved while building the
/// instance, in resolution order. They are released in reverse order once the
/// instance itself is destroyed.
pub struct Burden {
    handler: Arc<Handler>,
    instance: Option<Instance>,
    children: Vec<Burden>,
    requires_policy_release: bool,
}

impl Burden {
    pub fn new(handler: Arc<Handler>) -> Self {
        Self {
            handler,
            instance: None,
            children: Vec::new(),
            requires_policy_release: true,
        }
    }

    pub fn handler(&self) -> &Arc<Handler> {
        &self.handler
    }

    pub fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    pub fn children(&self) -> &[Burden] {
        &self.children
    }

    /// Whether the release policy has to keep this burden until it is released
    pub fn requires_policy_release(&self) -> bool {
        self.requires_policy_release
    }

    pub fn set_requires_policy_release(&mut self, value: bool) {
        self.requires_policy_release = value;
    }

    pub(crate) fn set_instance(&mut self, instance: Instance) {
        self.instance = Some(instance);
    }

    pub(crate) fn adopt(&mut self, children: Vec<Burden>) {
        self.children.extend(children);
    }

    /// Move the instance's ownership into a new burden kept by the lifestyle.
    ///
    /// `self` keeps a reference to the instance but no children and no longer
    /// requires release through the policy.
    pub(crate) fn take_ownership(&mut self) -> Burden {
        let owned = Burden {
            handler: Arc::clone(&self.handler),
            instance: self.instance.clone(),
            children: std::mem::take(&mut self.children),
            requires_policy_release: true,
        };
        self.requires_policy_release = false;
        owned
    }

    /// Hand the instance back to its lifestyle.
    ///
    /// Returns `true` when the lifestyle destroyed it, in which case the
    /// children are released too.
    pub fn release(self) -> bool {
        let Some(instance) = self.instance.as_ref() else {
            return false;
        };

        let destroyed = self.handler.release(instance);
        if destroyed {
            for child in self.children.into_iter().rev() {
                child.release();
            }
        }
        destroyed
    }

    /// Destroy the instance directly and release the children
    pub(crate) fn decommission(self, activator: &dyn ComponentActivator) {
        if let Some(instance) = self.instance.as_ref() {
            activator.destroy(instance);
        }
        for child in self.children.into_iter().rev() {
            child.release();
        }
    }
}

impl std::fmt::Debug for Burden {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Burden")
            .field("component", &self.handler.key())
            .field("has_instance", &self.instance.is_some())
            .field("children", &self.children)
            .field("requires_policy_release", &self.requires_policy_release)
            .finish()
    }
}
