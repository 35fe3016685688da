pub mod backoff;
pub mod engine;
pub mod http;
pub mod queue;
pub mod simulated;

pub use backoff::{compute_backoff, RetryPolicy, MAX_BACKOFF_MS};
pub use engine::{build_client, Deliverer};
pub use http::HttpSender;
pub use queue::QueueSender;
pub use simulated::SimulatedSender;
