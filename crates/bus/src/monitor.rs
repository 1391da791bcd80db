//! Channel monitor capability
//!
//! The upstream control-system client is callback driven. Re-entrant
//! callbacks are awkward to reason about, so the seam here delivers each
//! subscription as an owned event stream: the monitor backend pushes
//! [`MonitorEvent`]s into a bounded queue and the update handler drains them
//! from its own task, which serializes all decisions for one channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pvf_protocol::ChannelUpdate;
use tokio::sync::mpsc;

use crate::{BusError, Result};

/// Bounded per-subscription event queue depth
///
/// Sized for tens of channels at ~100 Hz with scheduling jitter headroom.
pub const EVENT_QUEUE_SIZE: usize = 1024;

/// One event delivered by a channel subscription
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// First subscriber-side connection established; no value yet
    FirstConnect,
    /// A new value/alarm/timestamp triple
    Update(ChannelUpdate),
    /// Last connection lost; a later `FirstConnect` signals recovery
    ///
    /// A lost transport session is reported the same way - the backend
    /// re-fires `FirstConnect` once it reconnects.
    LastDisconnect,
}

/// A live subscription to one channel
#[derive(Debug)]
pub struct Subscription {
    /// Event stream, drained by the owning update handler
    pub events: mpsc::Receiver<MonitorEvent>,
    /// Shared handle for open/close state
    pub handle: SubscriptionHandle,
}

/// Shared open/close state for one subscription
///
/// The backend marks the handle open once wrapped data has actually been
/// delivered; the update handler closes it when the idle grace window
/// expires or the handler stops. Closing is idempotent.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    inner: Arc<HandleInner>,
}

#[derive(Debug)]
struct HandleInner {
    channel: String,
    open: AtomicBool,
}

impl SubscriptionHandle {
    /// Create a handle in the closed state
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                channel: channel.into(),
                open: AtomicBool::new(false),
            }),
        }
    }

    /// The channel this subscription serves
    pub fn channel(&self) -> &str {
        &self.inner.channel
    }

    /// Whether the subscription currently holds an open, data-bearing feed
    #[inline]
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }

    /// Mark the feed open (backend side, once data has been delivered)
    #[inline]
    pub fn mark_open(&self) {
        self.inner.open.store(true, Ordering::Release);
    }

    /// Close the feed (handler side); idempotent
    #[inline]
    pub fn close(&self) {
        self.inner.open.store(false, Ordering::Release);
    }
}

/// Subscription capability for live control-system channels
pub trait ChannelMonitor: Send + Sync {
    /// Establish a subscription to `channel` via the given provider type
    ///
    /// # Errors
    ///
    /// `SubscribeFailed` if the backend cannot establish the subscription,
    /// `UnknownProvider` if no backend serves `provider_type`.
    fn subscribe(&self, channel: &str, provider_type: &str) -> Result<Subscription>;
}

/// Dispatches subscriptions to per-provider monitor backends
///
/// Stream specs name their provider (`"pva"`, `"ca"`, `"sim"`); the registry
/// routes each subscribe call to the backend registered under that name.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ChannelMonitor>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under a provider type name
    pub fn register(&mut self, provider_type: impl Into<String>, monitor: Arc<dyn ChannelMonitor>) {
        self.providers.insert(provider_type.into(), monitor);
    }

    /// Provider type names currently registered
    pub fn provider_types(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }
}

impl ChannelMonitor for ProviderRegistry {
    fn subscribe(&self, channel: &str, provider_type: &str) -> Result<Subscription> {
        match self.providers.get(provider_type) {
            Some(monitor) => monitor.subscribe(channel, provider_type),
            None => Err(BusError::UnknownProvider(provider_type.to_string())),
        }
    }
}
