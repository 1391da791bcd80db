//! In-process test doubles for the bus capabilities
//!
//! Used by unit tests across the workspace: a producer that records every
//! publish, and a monitor whose subscriptions are driven by the test.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use pvf_protocol::ChannelUpdate;
use tokio::sync::mpsc;

use crate::{
    ChannelMonitor, MonitorEvent, Producer, Result, Subscription, SubscriptionHandle,
    EVENT_QUEUE_SIZE,
};

/// Producer that records every published payload
#[derive(Debug, Default)]
pub struct RecordingProducer {
    published: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of publishes
    pub fn count(&self) -> usize {
        self.published.lock().expect("producer lock").len()
    }

    /// The most recently published payload, if any
    pub fn last_payload(&self) -> Option<Vec<u8>> {
        self.published
            .lock()
            .expect("producer lock")
            .last()
            .map(|(_, payload)| payload.clone())
    }

    /// All payloads published to one topic, oldest first
    pub fn payloads_for(&self, topic: &str) -> Vec<Vec<u8>> {
        self.published
            .lock()
            .expect("producer lock")
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Distinct topics published to, in first-publish order
    pub fn topics(&self) -> Vec<String> {
        let published = self.published.lock().expect("producer lock");
        let mut topics = Vec::new();
        for (topic, _) in published.iter() {
            if !topics.contains(topic) {
                topics.push(topic.clone());
            }
        }
        topics
    }
}

#[async_trait]
impl Producer for RecordingProducer {
    async fn publish(&self, topic: &str, _key: Option<&[u8]>, payload: &[u8]) -> Result<()> {
        self.published
            .lock()
            .expect("producer lock")
            .push((topic.to_string(), payload.to_vec()));
        Ok(())
    }
}

/// Monitor whose subscriptions are driven explicitly by the test
///
/// `subscribe` hands out an event queue per channel; the test then injects
/// connects, updates and disconnects. The subscription handle is marked
/// open once the first update has been injected, mirroring a real client
/// that only opens its feed when wrapped data arrives.
#[derive(Default)]
pub struct ScriptedMonitor {
    channels: Mutex<HashMap<String, ScriptedChannel>>,
    attempts: AtomicUsize,
}

struct ScriptedChannel {
    sender: mpsc::Sender<MonitorEvent>,
    handle: SubscriptionHandle,
}

impl ScriptedMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subscribe calls seen
    pub fn subscribe_attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Inject a first-connect event
    pub fn connect(&self, channel: &str) {
        self.send(channel, MonitorEvent::FirstConnect);
    }

    /// Inject a value update; marks the subscription handle open
    pub fn push_update(&self, channel: &str, update: ChannelUpdate) {
        {
            let channels = self.channels.lock().expect("monitor lock");
            let entry = channels.get(channel).expect("channel not subscribed");
            entry.handle.mark_open();
        }
        self.send(channel, MonitorEvent::Update(update));
    }

    /// Inject a last-disconnect event
    pub fn disconnect(&self, channel: &str) {
        self.send(channel, MonitorEvent::LastDisconnect);
    }

    /// Whether the subscription handle for a channel is open
    pub fn is_open(&self, channel: &str) -> bool {
        self.channels
            .lock()
            .expect("monitor lock")
            .get(channel)
            .map(|entry| entry.handle.is_open())
            .unwrap_or(false)
    }

    fn send(&self, channel: &str, event: MonitorEvent) {
        let sender = {
            let channels = self.channels.lock().expect("monitor lock");
            channels
                .get(channel)
                .expect("channel not subscribed")
                .sender
                .clone()
        };
        // A closed queue means the handler already stopped; late events are
        // dropped, like a real client after unsubscribe.
        if let Err(mpsc::error::TrySendError::Full(_)) = sender.try_send(event) {
            panic!("event queue full");
        }
    }
}

impl ChannelMonitor for ScriptedMonitor {
    fn subscribe(&self, channel: &str, _provider_type: &str) -> Result<Subscription> {
        self.attempts.fetch_add(1, Ordering::Relaxed);

        let (sender, events) = mpsc::channel(EVENT_QUEUE_SIZE);
        let handle = SubscriptionHandle::new(channel);
        self.channels.lock().expect("monitor lock").insert(
            channel.to_string(),
            ScriptedChannel {
                sender,
                handle: handle.clone(),
            },
        );

        Ok(Subscription { events, handle })
    }
}
