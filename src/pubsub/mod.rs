//! Publish side of the emulator.
//!
//! - `message`: the transient message and its notification JSON.
//! - `publisher`: fan-out of one message to every confirmed subscription of
//!   a topic.

pub mod message;
pub mod publisher;

pub use message::*;
pub use publisher::*;
