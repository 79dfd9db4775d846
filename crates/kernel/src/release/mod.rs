pub mod burden;
pub mod policy;

pub use burden::Burden;
pub use policy::{create_policy, LifecycledReleasePolicy, NoTrackingReleasePolicy, ReleasePolicy};
