//! Capability seams for pvforward
//!
//! The forwarding engine talks to the outside world through two traits:
//!
//! - [`Producer`] - durable publish of a binary payload to a named topic;
//!   one instance is constructed at startup and shared by every update
//!   handler and the status reporter.
//! - [`ChannelMonitor`] - subscription to a live control-system channel,
//!   delivered as an event stream (`FirstConnect` / `Update` /
//!   `LastDisconnect`) instead of re-entrant callbacks.
//!
//! Production implementations live behind the `kafka` feature; the `sim`
//! backend and the `testing` doubles are always available.

mod error;
mod monitor;
mod producer;
pub mod sim;
pub mod testing;

#[cfg(feature = "kafka")]
pub mod kafka;

pub use error::{BusError, Result};
pub use monitor::{
    ChannelMonitor, MonitorEvent, ProviderRegistry, Subscription, SubscriptionHandle,
    EVENT_QUEUE_SIZE,
};
pub use producer::Producer;
