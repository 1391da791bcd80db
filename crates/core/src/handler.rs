//! Per-channel update handler
//!
//! One handler owns one stream: the subscription event queue, the schema
//! converter and the optional heartbeat timer. All of it is driven from a
//! single task, so publish decisions for a channel are totally ordered.
//!
//! State machine:
//!
//! ```text
//!              first-connect / update
//!     Idle ───────────────────────────→ Active
//!       ↑                                  │
//!       └───────── last-disconnect ────────┘
//! ```
//!
//! A disconnect arms a grace window instead of tearing the subscription down
//! immediately; if the channel reconnects before the next tick, the feed
//! stays open and forwarding resumes with no teardown/re-subscribe cycle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use pvf_bus::{ChannelMonitor, MonitorEvent, Producer, Subscription, SubscriptionHandle};
use pvf_protocol::{converter_for, Alarm, AlarmEncoding, ChannelUpdate, Converter, StreamSpec};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::Result;

/// Tick period for handlers without a periodic interval
///
/// Such handlers only need the timer for the post-disconnect grace window,
/// so a coarse period is fine.
pub const IDLE_GRACE: Duration = Duration::from_secs(10);

/// Live state of one handler, shared with status reporting
#[derive(Debug, Default)]
pub struct HandlerStatus {
    connected: AtomicBool,
    last_update_ns: AtomicU64,
}

impl HandlerStatus {
    /// Whether the channel is currently connected
    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Wallclock time of the last forwarded update, if any
    pub fn last_update_ns(&self) -> Option<u64> {
        match self.last_update_ns.load(Ordering::Relaxed) {
            0 => None,
            ns => Some(ns),
        }
    }

    fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    fn record_update(&self) {
        let ns = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        self.last_update_ns.store(ns, Ordering::Relaxed);
    }
}

/// Handle to one running per-channel forwarding task
#[derive(Debug)]
pub struct UpdateHandler {
    channel: String,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    status: Arc<HandlerStatus>,
}

impl UpdateHandler {
    /// Resolve the converter, subscribe and start the forwarding task
    ///
    /// The converter is resolved first: an unknown schema fails the spawn
    /// before any subscription is attempted, so a bad stream spec leaves no
    /// trace on the upstream client.
    ///
    /// # Errors
    ///
    /// `Protocol` for an unknown schema, `Bus` if the subscription cannot
    /// be established.
    pub fn spawn(
        spec: StreamSpec,
        producer: Arc<dyn Producer>,
        monitor: &dyn ChannelMonitor,
    ) -> Result<Self> {
        let converter = converter_for(&spec.schema)?;
        let subscription = monitor.subscribe(&spec.channel, &spec.provider_type)?;

        let channel = spec.channel.clone();
        let cancel = CancellationToken::new();
        let status = Arc::new(HandlerStatus::default());

        let runner = HandlerLoop::new(spec, converter, producer, subscription, Arc::clone(&status));
        let task = tokio::spawn(runner.run(cancel.clone()));

        Ok(Self {
            channel,
            cancel,
            task: Some(task),
            status,
        })
    }

    /// The channel this handler forwards
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Shared live state for status reporting
    pub fn status(&self) -> Arc<HandlerStatus> {
        Arc::clone(&self.status)
    }

    /// Stop the forwarding task and close the subscription
    ///
    /// Waits for the task to finish; once this returns, no further publish
    /// for this channel will occur. Idempotent.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(channel = %self.channel, error = %e, "handler task panicked");
            }
        }
    }
}

impl Drop for UpdateHandler {
    fn drop(&mut self) {
        // Safety net for handles dropped without stop(); the task notices
        // the cancellation and closes the subscription itself.
        self.cancel.cancel();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Active,
}

/// Owned state of the per-channel task
struct HandlerLoop {
    spec: StreamSpec,
    converter: Box<dyn Converter>,
    producer: Arc<dyn Producer>,
    events: mpsc::Receiver<MonitorEvent>,
    handle: SubscriptionHandle,
    status: Arc<HandlerStatus>,
    state: State,
    /// Disconnect seen; close the subscription at the next tick unless the
    /// channel reconnects first.
    pending_close: bool,
    /// Re-publish the cached update on every tick while Active
    heartbeat: bool,
    ticker: Interval,
    last_published_alarm: Option<Alarm>,
    cached: Option<ChannelUpdate>,
}

impl HandlerLoop {
    fn new(
        spec: StreamSpec,
        converter: Box<dyn Converter>,
        producer: Arc<dyn Producer>,
        subscription: Subscription,
        status: Arc<HandlerStatus>,
    ) -> Self {
        let heartbeat = spec.periodic_ms.is_some();
        let period = spec
            .periodic_ms
            .map(Duration::from_millis)
            .unwrap_or(IDLE_GRACE);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self {
            spec,
            converter,
            producer,
            events: subscription.events,
            handle: subscription.handle,
            status,
            state: State::Idle,
            pending_close: false,
            heartbeat,
            ticker,
            last_published_alarm: None,
            cached: None,
        }
    }

    async fn run(mut self, cancel: CancellationToken) {
        tracing::debug!(
            channel = %self.spec.channel,
            topic = %self.spec.topic,
            schema = %self.spec.schema,
            "update handler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = self.events.recv() => match event {
                    Some(event) => self.on_event(event).await,
                    // Backend dropped the feed; nothing more can arrive.
                    None => {
                        self.on_disconnect();
                        break;
                    }
                },
                _ = self.ticker.tick() => self.on_tick().await,
            }
        }

        self.handle.close();
        self.status.set_connected(false);
        tracing::debug!(channel = %self.spec.channel, "update handler stopped");
    }

    async fn on_event(&mut self, event: MonitorEvent) {
        match event {
            MonitorEvent::FirstConnect => self.activate(),
            MonitorEvent::Update(update) => {
                // Some clients deliver the initial value without a separate
                // connect callback; data is proof of connection.
                if self.state == State::Idle {
                    self.activate();
                }
                self.forward(update).await;
            }
            MonitorEvent::LastDisconnect => self.on_disconnect(),
        }
    }

    fn activate(&mut self) {
        if self.state == State::Active {
            return;
        }
        self.state = State::Active;
        self.pending_close = false;
        self.status.set_connected(true);
        // Restart the heartbeat cadence from the moment of connection.
        self.ticker.reset();
        tracing::info!(channel = %self.spec.channel, "channel connected");
    }

    fn on_disconnect(&mut self) {
        if self.state != State::Active {
            return;
        }
        self.state = State::Idle;
        self.pending_close = true;
        self.status.set_connected(false);
        tracing::info!(channel = %self.spec.channel, "channel disconnected");
    }

    /// Publish one fresh update, eliding the alarm if it has not changed
    async fn forward(&mut self, update: ChannelUpdate) {
        let alarm_changed = self.last_published_alarm.as_ref() != Some(&update.alarm);
        let alarm = if alarm_changed {
            AlarmEncoding::Changed(&update.alarm)
        } else {
            AlarmEncoding::NoChange
        };

        let payload = match self.converter.encode(&self.spec.channel, &update, alarm) {
            Ok(payload) => payload,
            Err(e) if e.is_recoverable() => {
                // Only this update is affected; the stream stays live.
                tracing::warn!(channel = %self.spec.channel, error = %e, "update dropped");
                return;
            }
            Err(e) => {
                tracing::error!(channel = %self.spec.channel, error = %e, "encode failed");
                return;
            }
        };

        if alarm_changed {
            self.last_published_alarm = Some(update.alarm.clone());
        }
        self.publish(&payload).await;
        self.status.record_update();
        self.cached = Some(update);
    }

    async fn on_tick(&mut self) {
        match self.state {
            State::Active => {
                if !self.heartbeat {
                    return;
                }
                // Re-publish the last value so downstream consumers see a
                // fresh timestamped sample even on a quiet channel. The
                // value was already published, so the alarm never changes.
                let Some(update) = self.cached.clone() else {
                    return;
                };
                match self
                    .converter
                    .encode(&self.spec.channel, &update, AlarmEncoding::NoChange)
                {
                    Ok(payload) => self.publish(&payload).await,
                    Err(e) => {
                        tracing::warn!(channel = %self.spec.channel, error = %e, "heartbeat dropped")
                    }
                }
            }
            State::Idle => {
                if self.pending_close {
                    self.pending_close = false;
                    self.handle.close();
                    tracing::debug!(
                        channel = %self.spec.channel,
                        "grace window expired, feed closed"
                    );
                }
            }
        }
    }

    /// Publish failures are logged and swallowed; the stream stays alive
    /// and the next update gets a fresh attempt.
    async fn publish(&self, payload: &[u8]) {
        if let Err(e) = self
            .producer
            .publish(&self.spec.topic, Some(self.spec.channel.as_bytes()), payload)
            .await
        {
            tracing::warn!(
                channel = %self.spec.channel,
                topic = %self.spec.topic,
                error = %e,
                "publish failed"
            );
        }
    }
}
