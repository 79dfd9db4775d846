pub mod handler;
pub mod kernel;
pub mod naming;


pub use handler::{Handler, HandlerState};
pub use kernel::Kernel;
pub(crate) use kernel::KernelInner;
