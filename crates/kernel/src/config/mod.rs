pub mod kernel_config;
pub mod sources;
pub mod validation;

pub use kernel_config::*;
pub use sources::*;
pub use validation::*;
