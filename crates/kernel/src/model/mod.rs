pub mod arguments;
pub mod dependency;
pub mod descriptor;
pub mod interceptor;
pub mod service;

pub use arguments::Arguments;
pub use dependency::{DependencyModel, DependencyModelCollection, DependencyTarget};
pub use descriptor::{ComponentBuilder, ComponentDescriptor};
pub use interceptor::{InterceptorReference, InterceptorReferenceCollection};
pub use service::{Instance, InstanceKey, ServiceType};
