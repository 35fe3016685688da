/// Bounded audit trail of every operation, with live listeners.
pub mod activity;
/// Trait seams between the publisher, the delivery engine and the senders.
pub mod application;
/// Settings loading.
pub mod config;
/// Protocol dispatch, retry/backoff and outcome recording.
pub mod delivery;
/// Crate-level errors and re-exports of the domain errors.
pub mod error;
/// Structured logging (filters, formats, sinks).
pub mod logging;
/// Messages and the publish orchestrator.
pub mod pubsub;
/// Topic and subscription registries.
pub mod registry;
/// Control-plane facade.
pub mod service;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

pub use activity::{
    ActivityEntry, ActivityListener, ActivityLog, ActivityStatus, DeliveryRecord, EventType,
};
pub use application::{DeliveryPort, ProtocolSender};
pub use crate::config::Settings;
pub use delivery::{compute_backoff, Deliverer, HttpSender, QueueSender, SimulatedSender};
pub use error::{DeliveryError, ErrorClass, ErrorExt, RegistryError, StartupError};
pub use logging::{init_logging, LogFormat, LoggingConfig, LoggingHandle};
pub use pubsub::{Message, MessageAttributes, Publisher};
pub use registry::{
    ArnScope, Protocol, Subscription, SubscriptionRegistry, SubscriptionStatus, Topic,
    TopicRegistry,
};
pub use service::SnsService;
