pub mod ext;
pub mod status_code;
pub mod types;

// Publicly re-export all error types from the submodules to simplify access
// from the main crate.
pub use ext::*;
pub use status_code::*;
pub use types::*;

/// Result of a registry or facade operation.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result of one delivery (attempt sequence).
pub type DeliveryResult<T> = Result<T, DeliveryError>;
