pub mod delivery;
pub mod registry;

pub use delivery::*;
pub use registry::*;
