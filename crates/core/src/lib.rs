//! pvforward engine
//!
//! The stream lifecycle and update-forwarding core:
//!
//! - [`UpdateHandler`] - one per configured channel; decides what to publish
//!   on each monitor event and drives the optional heartbeat timer
//! - [`StreamConfigManager`] - keeps the live handler set consistent with
//!   the applied configuration and produces status snapshots
//! - [`StatusReporter`] - periodically publishes snapshots to the status
//!   topic
//!
//! # Architecture
//!
//! ```text
//! [command topic] ──→ ConfigCommand ──→ StreamConfigManager
//!                                          │ spawn/stop
//!                                          ▼
//!                    ChannelMonitor ──→ UpdateHandler ──→ Converter ──→ Producer
//!                      (events)          (one task          (f142)      (topic)
//!                                         per channel)
//! ```
//!
//! Each handler runs on its own task, so decisions for one channel are
//! totally ordered while different channels proceed in parallel.

mod error;
mod handler;
mod manager;
mod reporter;

pub use error::{CoreError, Result};
pub use handler::{HandlerStatus, UpdateHandler, IDLE_GRACE};
pub use manager::{ApplyReport, StreamConfigManager};
pub use reporter::StatusReporter;

#[cfg(test)]
mod handler_test;
