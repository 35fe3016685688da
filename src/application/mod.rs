pub mod delivery_port;
pub mod sender_port;

pub use delivery_port::DeliveryPort;
pub use sender_port::ProtocolSender;
