pub mod activator;
pub mod proxy;

pub use activator::{ComponentActivator, Disposable, FactoryActivator, Recyclable};
pub use proxy::{InterceptingActivator, ProxyFactory};
