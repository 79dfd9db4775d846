use crate::errors::{KernelError, KernelResult};
use crate::model::{DependencyModel, DependencyModelCollection};

/// Binding to the component, by key, that intercepts calls on a target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterceptorReference {
    key: String,
}

impl InterceptorReference {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Key of the interceptor component
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The dependency this binding adds to its target component
    pub fn dependency(&self) -> DependencyModel {
        DependencyModel::key(self.key.clone())
    }
}

/// Ordered interceptor bindings of one component.
///
/// Borrows the component's binding list together with its dependency list so
/// every insertion also records the interceptor as a dependency. Order is the
/// order the proxy factory applies interceptors in and is never changed here.
#[derive(Debug)]
pub struct InterceptorReferenceCollection<'a> {
    list: &'a mut Vec<InterceptorReference>,
    dependencies: &'a mut DependencyModelCollection,
}

impl<'a> InterceptorReferenceCollection<'a> {
    pub fn new(
        list: &'a mut Vec<InterceptorReference>,
        dependencies: &'a mut DependencyModelCollection,
    ) -> Self {
        Self { list, dependencies }
    }

    pub fn has_interceptors(&self) -> bool {
        !self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Same as [`add_last`](Self::add_last)
    pub fn add(&mut self, item: InterceptorReference) {
        self.add_last(item);
    }

    pub fn add_first(&mut self, item: InterceptorReference) {
        self.attach(&item);
        self.list.insert(0, item);
    }

    pub fn add_last(&mut self, item: InterceptorReference) {
        self.attach(&item);
        self.list.push(item);
    }

    /// Append `item` unless an equal binding is already present
    pub fn add_if_not_in_collection(&mut self, item: InterceptorReference) {
        if !self.list.contains(&item) {
            self.add_last(item);
        }
    }

    /// Insert at `index`, shifting later bindings back
    pub fn insert(&mut self, index: usize, item: InterceptorReference) -> KernelResult<()> {
        if index > self.list.len() {
            return Err(KernelError::invalid_argument(
                "index",
                format!(
                    "interceptor index {} is out of range for {} bindings",
                    index,
                    self.list.len()
                ),
            ));
        }

        self.attach(&item);
        self.list.insert(index, item);
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InterceptorReference> {
        self.list.iter()
    }

    pub fn to_vec(&self) -> Vec<InterceptorReference> {
        self.list.clone()
    }

    fn attach(&mut self, item: &InterceptorReference) {
        self.dependencies.add(item.dependency());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[InterceptorReference]) -> Vec<&str> {
        list.iter().map(InterceptorReference::key).collect()
    }

    #[test]
    fn test_ordering_operations() {
        let mut list = Vec::new();
        let mut deps = DependencyModelCollection::new();
        let mut interceptors = InterceptorReferenceCollection::new(&mut list, &mut deps);

        assert!(!interceptors.has_interceptors());

        interceptors.add_last(InterceptorReference::new("logging"));
        interceptors.add_last(InterceptorReference::new("metrics"));
        interceptors.add_first(InterceptorReference::new("security"));
        interceptors
            .insert(1, InterceptorReference::new("retry"))
            .unwrap();

        assert!(interceptors.has_interceptors());
        assert_eq!(interceptors.len(), 4);
        assert_eq!(keys(&list), vec!["security", "retry", "logging", "metrics"]);
    }

    #[test]
    fn test_insert_at_end_and_out_of_range() {
        let mut list = Vec::new();
        let mut deps = DependencyModelCollection::new();
        let mut interceptors = InterceptorReferenceCollection::new(&mut list, &mut deps);

        interceptors.insert(0, InterceptorReference::new("a")).unwrap();
        interceptors.insert(1, InterceptorReference::new("b")).unwrap();

        let err = interceptors
            .insert(5, InterceptorReference::new("c"))
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(interceptors.len(), 2);
        assert_eq!(keys(&list), vec!["a", "b"]);
        assert!(!deps.contains(&DependencyModel::key("c")));
    }

    #[test]
    fn test_add_if_not_in_collection() {
        let mut list = Vec::new();
        let mut deps = DependencyModelCollection::new();
        let mut interceptors = InterceptorReferenceCollection::new(&mut list, &mut deps);

        interceptors.add(InterceptorReference::new("logging"));
        interceptors.add_if_not_in_collection(InterceptorReference::new("logging"));
        interceptors.add_if_not_in_collection(InterceptorReference::new("audit"));

        assert_eq!(keys(&list), vec!["logging", "audit"]);
    }

    #[test]
    fn test_insertions_attach_dependencies() {
        let mut list = Vec::new();
        let mut deps = DependencyModelCollection::new();
        let mut interceptors = InterceptorReferenceCollection::new(&mut list, &mut deps);

        interceptors.add_first(InterceptorReference::new("logging"));
        interceptors.add_last(InterceptorReference::new("audit"));
        interceptors.add_last(InterceptorReference::new("audit"));

        assert_eq!(list.len(), 3);
        assert_eq!(deps.len(), 2);
        assert!(deps.contains(&DependencyModel::key("logging")));
        assert!(deps.contains(&DependencyModel::key("audit")));
    }
}
