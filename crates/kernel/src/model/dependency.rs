use crate::model::ServiceType;

/// What a dependency points at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DependencyTarget {
    /// Any component supplying the service
    Service(ServiceType),
    /// The component registered under this key
    Key(String),
}

/// A dependency declared by a component
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyModel {
    target: DependencyTarget,
    optional: bool,
}

impl DependencyModel {
    pub fn service<T: 'static + ?Sized>() -> Self {
        Self::on_service(ServiceType::of::<T>())
    }

    pub fn on_service(service: ServiceType) -> Self {
        Self {
            target: DependencyTarget::Service(service),
            optional: false,
        }
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self {
            target: DependencyTarget::Key(key.into()),
            optional: false,
        }
    }

    /// Mark the dependency as optional; it never blocks the component
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn target(&self) -> &DependencyTarget {
        &self.target
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

impl std::fmt::Display for DependencyModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.target {
            DependencyTarget::Service(service) => write!(f, "service '{}'", service),
            DependencyTarget::Key(key) => write!(f, "component '{}'", key),
        }
    }
}

/// Ordered set of a component's dependencies
#[derive(Debug, Clone, Default)]
pub struct DependencyModelCollection {
    items: Vec<DependencyModel>,
}

impl DependencyModelCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency unless an equal one is already present
    pub fn add(&mut self, dependency: DependencyModel) {
        if !self.items.contains(&dependency) {
            self.items.push(dependency);
        }
    }

    pub fn contains(&self, dependency: &DependencyModel) -> bool {
        self.items.contains(dependency)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DependencyModel> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a DependencyModelCollection {
    type Item = &'a DependencyModel;
    type IntoIter = std::slice::Iter<'a, DependencyModel>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
