pub mod kernel;

pub use kernel::KernelError;

/// Result alias used throughout the kernel
pub type KernelResult<T> = Result<T, KernelError>;
