use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Named values supplied with a single resolve call.
///
/// The activator merges these with the component's own parameters; an argument
/// always wins over a parameter of the same name.
#[derive(Clone, Default)]
pub struct Arguments {
    values: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named value, builder style
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.values.insert(name.into(), Arc::new(value));
    }

    /// Get a named value if it exists and has type `T`
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<&T> {
        self.values.get(name)?.downcast_ref::<T>()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("Arguments").field("names", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_lookup() {
        let args = Arguments::new()
            .with("port", 8080u16)
            .with("host", "localhost".to_string());

        assert_eq!(args.get::<u16>("port"), Some(&8080));
        assert_eq!(args.get::<String>("host").map(String::as_str), Some("localhost"));
        assert_eq!(args.get::<u32>("port"), None);
        assert!(args.contains("host"));
        assert!(!args.contains("user"));
        assert_eq!(args.len(), 2);
    }
}
