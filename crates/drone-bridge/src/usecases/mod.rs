pub mod bridge;
pub mod collector;
pub mod link;
pub mod ports;

pub use bridge::SerialBridge;
pub use collector::{DEFAULT_RESPONSE_TIMEOUT, ResponseCollector};
pub use link::{OpenLink, SerialLink};
