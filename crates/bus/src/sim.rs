//! Simulated channel backend
//!
//! Development stand-in for a real control-system client: every
//! subscription connects immediately and then delivers a float64 ramp at a
//! fixed rate. Register it under provider type `"sim"` to exercise the full
//! forwarding path without upstream infrastructure.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use pvf_protocol::{ChannelUpdate, Value};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

use crate::{ChannelMonitor, MonitorEvent, Result, Subscription, SubscriptionHandle,
    EVENT_QUEUE_SIZE};

/// Default update rate for simulated channels
const DEFAULT_RATE_HZ: u64 = 10;

/// Monitor backend producing a deterministic ramp per channel
pub struct SimMonitor {
    period: Duration,
}

impl Default for SimMonitor {
    fn default() -> Self {
        Self::with_rate_hz(DEFAULT_RATE_HZ)
    }
}

impl SimMonitor {
    /// Create a backend emitting updates at the given rate
    pub fn with_rate_hz(rate_hz: u64) -> Self {
        Self {
            period: Duration::from_micros(1_000_000 / rate_hz.max(1)),
        }
    }
}

impl ChannelMonitor for SimMonitor {
    fn subscribe(&self, channel: &str, _provider_type: &str) -> Result<Subscription> {
        let (sender, events) = mpsc::channel(EVENT_QUEUE_SIZE);
        let handle = SubscriptionHandle::new(channel);
        let feeder = handle.clone();
        let period = self.period;
        let channel = channel.to_string();

        tokio::spawn(async move {
            if sender.send(MonitorEvent::FirstConnect).await.is_err() {
                return;
            }

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut ramp = 0u64;

            loop {
                ticker.tick().await;
                let update = ChannelUpdate::new(Value::Float64(ramp as f64), now_ns());
                ramp = ramp.wrapping_add(1);

                // Receiver dropped means the update handler is gone.
                if sender.send(MonitorEvent::Update(update)).await.is_err() {
                    break;
                }
                feeder.mark_open();
            }

            tracing::debug!(channel, "simulated channel stopped");
        });

        Ok(Subscription { events, handle })
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
