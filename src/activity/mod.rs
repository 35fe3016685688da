pub mod entry;
pub mod listener;
pub mod log;

pub use entry::*;
pub use listener::*;
pub use log::*;
