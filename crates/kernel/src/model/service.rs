use std::any::{Any, TypeId};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A resolved component instance
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Identifies a service contract or implementation type
#[derive(Debug, Clone, Copy)]
pub struct ServiceType {
    type_id: TypeId,
    type_name: &'static str,
}

impl ServiceType {
    /// Create a service type for `T`, which may be a trait object
    pub fn of<T: 'static + ?Sized>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Check if this service type is `T` without allocating
    pub fn is<T: 'static + ?Sized>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for ServiceType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ServiceType {}

impl Hash for ServiceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name)
    }
}

/// Identity of a live instance, derived from its allocation address.
///
/// Two `Arc`s share a key exactly when they point at the same allocation, which
/// also holds across `Arc::downcast`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceKey(usize);

impl InstanceKey {
    pub fn of<T: ?Sized>(instance: &Arc<T>) -> Self {
        Self(Arc::as_ptr(instance) as *const () as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Sender: Send + Sync {}

    #[derive(Debug, Default)]
    struct SmtpSender;

    impl Sender for SmtpSender {}

    #[test]
    fn test_service_type_identity() {
        let a = ServiceType::of::<dyn Sender>();
        let b = ServiceType::of::<dyn Sender>();
        let c = ServiceType::of::<SmtpSender>();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.is::<dyn Sender>());
        assert!(a.type_name().contains("Sender"));
        assert_eq!(ServiceType::of::<String>().to_string(), "alloc::string::String");
    }

    #[test]
    fn test_instance_key_survives_downcast() {
        let instance: Instance = Arc::new(SmtpSender);
        let key = InstanceKey::of(&instance);

        let typed = instance.clone().downcast::<SmtpSender>().unwrap();
        assert_eq!(InstanceKey::of(&typed), key);

        let other: Instance = Arc::new(SmtpSender);
        assert_ne!(InstanceKey::of(&other), key);
    }
}
