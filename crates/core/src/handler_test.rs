use std::sync::Arc;
use std::time::Duration;

use pvf_bus::testing::{RecordingProducer, ScriptedMonitor};
use pvf_protocol::{
    Alarm, AlarmSeverity, AlarmStatus, ChannelUpdate, LogFrame, StreamSpec, Value, NO_CHANGE_CODE,
};
use tokio::time::{sleep, timeout};

use crate::{CoreError, UpdateHandler};

const CHANNEL: &str = "source_name";
const TOPIC: &str = "output_topic";

fn spec() -> StreamSpec {
    StreamSpec {
        channel: CHANNEL.to_string(),
        provider_type: "pva".to_string(),
        schema: "f142".to_string(),
        topic: TOPIC.to_string(),
        periodic_ms: None,
    }
}

fn periodic_spec(periodic_ms: u64) -> StreamSpec {
    StreamSpec {
        periodic_ms: Some(periodic_ms),
        ..spec()
    }
}

struct Fixture {
    producer: Arc<RecordingProducer>,
    monitor: Arc<ScriptedMonitor>,
    handler: UpdateHandler,
}

fn start(spec: StreamSpec) -> Fixture {
    let producer = Arc::new(RecordingProducer::new());
    let monitor = Arc::new(ScriptedMonitor::new());
    let handler =
        UpdateHandler::spawn(spec, producer.clone(), monitor.as_ref()).expect("spawn failed");
    Fixture {
        producer,
        monitor,
        handler,
    }
}

async fn wait_for_count(producer: &RecordingProducer, count: usize) {
    timeout(Duration::from_secs(2), async {
        while producer.count() < count {
            sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("expected publish count not reached");
}

#[tokio::test]
async fn test_unknown_schema_fails_before_subscribing() {
    let producer = Arc::new(RecordingProducer::new());
    let monitor = Arc::new(ScriptedMonitor::new());
    let bad = StreamSpec {
        schema: "DOESNTEXIST".to_string(),
        ..spec()
    };

    let err = UpdateHandler::spawn(bad, producer, monitor.as_ref()).unwrap_err();
    assert!(matches!(err, CoreError::Protocol(_)));
    assert_eq!(monitor.subscribe_attempts(), 0);
}

#[tokio::test]
async fn test_float_update_is_forwarded() {
    let mut fx = start(spec());
    fx.monitor.connect(CHANNEL);
    fx.monitor.push_update(
        CHANNEL,
        ChannelUpdate::new(Value::Float64(4.2222), 1_100_000_000),
    );
    wait_for_count(&fx.producer, 1).await;

    assert_eq!(fx.producer.topics(), vec![TOPIC.to_string()]);
    let payload = fx.producer.last_payload().unwrap();
    let frame = LogFrame::parse(&payload).unwrap();
    assert_eq!(frame.source_name().unwrap(), CHANNEL);
    assert_eq!(frame.timestamp_ns().unwrap(), 1_100_000_000);
    match frame.value().unwrap() {
        Value::Float64(v) => assert!((v - 4.2222).abs() < 1e-4),
        other => panic!("expected float64, got {other:?}"),
    }

    // No periodic interval, so one update means exactly one payload.
    sleep(Duration::from_millis(20)).await;
    assert_eq!(fx.producer.count(), 1);

    fx.handler.stop().await;
}

#[tokio::test]
async fn test_scalar_and_array_updates_are_forwarded() {
    let values = [
        Value::Int32(-375),
        Value::UInt64(9_000_000_000),
        Value::Float32(1.5),
        Value::ArrayInt16(vec![1, -2, 3]),
        Value::ArrayFloat64(vec![0.25, -0.5]),
    ];

    for value in values {
        let mut fx = start(spec());
        fx.monitor.connect(CHANNEL);
        fx.monitor
            .push_update(CHANNEL, ChannelUpdate::new(value.clone(), 42));
        wait_for_count(&fx.producer, 1).await;

        let payload = fx.producer.last_payload().unwrap();
        let frame = LogFrame::parse(&payload).unwrap();
        assert_eq!(frame.value().unwrap(), value);

        fx.handler.stop().await;
    }
}

#[tokio::test]
async fn test_alarm_fields_are_forwarded() {
    let mut fx = start(spec());
    let alarm = Alarm {
        status_code: 4,
        severity: AlarmSeverity::Minor,
        message: "HIGH_ALARM".to_string(),
    };

    fx.monitor.connect(CHANNEL);
    fx.monitor.push_update(
        CHANNEL,
        ChannelUpdate::with_alarm(Value::Float64(1.0), 1, alarm),
    );
    wait_for_count(&fx.producer, 1).await;

    let payload = fx.producer.last_payload().unwrap();
    let frame = LogFrame::parse(&payload).unwrap();
    assert_eq!(frame.alarm_status().unwrap(), AlarmStatus::High);
    assert_eq!(frame.alarm_severity().unwrap(), AlarmSeverity::Minor);

    fx.handler.stop().await;
}

#[tokio::test]
async fn test_repeated_alarm_is_elided() {
    let mut fx = start(spec());
    let alarm = Alarm {
        status_code: 4,
        severity: AlarmSeverity::Minor,
        message: "HIGH_ALARM".to_string(),
    };

    fx.monitor.connect(CHANNEL);
    fx.monitor.push_update(
        CHANNEL,
        ChannelUpdate::with_alarm(Value::Float64(1.0), 1, alarm.clone()),
    );
    fx.monitor.push_update(
        CHANNEL,
        ChannelUpdate::with_alarm(Value::Float64(2.0), 2, alarm),
    );
    wait_for_count(&fx.producer, 2).await;

    let payloads = fx.producer.payloads_for(TOPIC);
    let first = LogFrame::parse(&payloads[0]).unwrap();
    assert_eq!(first.alarm_status().unwrap(), AlarmStatus::High);
    assert_eq!(first.alarm_severity().unwrap(), AlarmSeverity::Minor);

    let second = LogFrame::parse(&payloads[1]).unwrap();
    assert_eq!(second.alarm_status().unwrap().as_u8(), NO_CHANGE_CODE);
    assert_eq!(second.alarm_severity().unwrap().as_u8(), NO_CHANGE_CODE);

    fx.handler.stop().await;
}

#[tokio::test]
async fn test_changed_alarm_is_published_again() {
    let mut fx = start(spec());

    fx.monitor.connect(CHANNEL);
    fx.monitor
        .push_update(CHANNEL, ChannelUpdate::new(Value::Float64(1.0), 1));
    fx.monitor.push_update(
        CHANNEL,
        ChannelUpdate::with_alarm(
            Value::Float64(2.0),
            2,
            Alarm {
                status_code: 3,
                severity: AlarmSeverity::Major,
                message: "HIHI_ALARM".to_string(),
            },
        ),
    );
    wait_for_count(&fx.producer, 2).await;

    let payloads = fx.producer.payloads_for(TOPIC);
    let first = LogFrame::parse(&payloads[0]).unwrap();
    assert_eq!(first.alarm_status().unwrap(), AlarmStatus::NoAlarm);
    assert_eq!(first.alarm_severity().unwrap(), AlarmSeverity::NoAlarm);

    let second = LogFrame::parse(&payloads[1]).unwrap();
    assert_eq!(second.alarm_status().unwrap(), AlarmStatus::HiHi);
    assert_eq!(second.alarm_severity().unwrap(), AlarmSeverity::Major);

    fx.handler.stop().await;
}

#[tokio::test]
async fn test_update_before_connect_still_publishes() {
    // Some clients deliver the initial value without a connect callback.
    let mut fx = start(spec());
    fx.monitor
        .push_update(CHANNEL, ChannelUpdate::new(Value::Float64(7.0), 1));
    wait_for_count(&fx.producer, 1).await;

    assert!(fx.handler.status().connected());
    fx.handler.stop().await;
}

#[tokio::test]
async fn test_periodic_republishes_cached_update() {
    let mut fx = start(periodic_spec(10));

    fx.monitor.connect(CHANNEL);
    fx.monitor
        .push_update(CHANNEL, ChannelUpdate::new(Value::Float64(4.2222), 1));
    wait_for_count(&fx.producer, 1).await;

    sleep(Duration::from_millis(50)).await;
    let count = fx.producer.count();
    assert!(count > 1, "expected heartbeats, got {count} publishes");

    // Heartbeats repeat the cached value with no-change alarm fields.
    let payload = fx.producer.last_payload().unwrap();
    let frame = LogFrame::parse(&payload).unwrap();
    match frame.value().unwrap() {
        Value::Float64(v) => assert!((v - 4.2222).abs() < 1e-4),
        other => panic!("expected float64, got {other:?}"),
    }
    assert_eq!(frame.alarm_status().unwrap().as_u8(), NO_CHANGE_CODE);
    assert_eq!(frame.alarm_severity().unwrap().as_u8(), NO_CHANGE_CODE);

    fx.handler.stop().await;
}

#[tokio::test]
async fn test_periodic_stops_while_disconnected() {
    let mut fx = start(periodic_spec(10));

    fx.monitor.connect(CHANNEL);
    fx.monitor
        .push_update(CHANNEL, ChannelUpdate::new(Value::Float64(1.0), 1));
    wait_for_count(&fx.producer, 1).await;
    fx.monitor.disconnect(CHANNEL);

    sleep(Duration::from_millis(30)).await;
    let settled = fx.producer.count();
    sleep(Duration::from_millis(30)).await;
    assert_eq!(fx.producer.count(), settled);

    fx.handler.stop().await;
}

#[tokio::test]
async fn test_feed_closes_after_grace_window() {
    let mut fx = start(periodic_spec(10));

    fx.monitor.connect(CHANNEL);
    fx.monitor
        .push_update(CHANNEL, ChannelUpdate::new(Value::Float64(1.0), 1));
    wait_for_count(&fx.producer, 1).await;
    assert!(fx.monitor.is_open(CHANNEL));

    fx.monitor.disconnect(CHANNEL);
    timeout(Duration::from_secs(2), async {
        while fx.monitor.is_open(CHANNEL) {
            sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("feed not closed after grace window");
    assert!(!fx.handler.status().connected());

    fx.handler.stop().await;
}

#[tokio::test]
async fn test_reconnect_within_grace_keeps_forwarding() {
    let mut fx = start(spec());

    fx.monitor.connect(CHANNEL);
    fx.monitor
        .push_update(CHANNEL, ChannelUpdate::new(Value::Float64(1.0), 1));
    wait_for_count(&fx.producer, 1).await;

    // Disconnect and reconnect before the grace tick (10s for streams
    // without a periodic interval) can close the feed.
    fx.monitor.disconnect(CHANNEL);
    fx.monitor.connect(CHANNEL);
    fx.monitor
        .push_update(CHANNEL, ChannelUpdate::new(Value::Float64(2.0), 2));
    wait_for_count(&fx.producer, 2).await;

    assert!(fx.monitor.is_open(CHANNEL));
    assert!(fx.handler.status().connected());

    fx.handler.stop().await;
}

#[tokio::test]
async fn test_stop_is_final_and_idempotent() {
    let mut fx = start(spec());

    fx.monitor.connect(CHANNEL);
    fx.monitor
        .push_update(CHANNEL, ChannelUpdate::new(Value::Float64(1.0), 1));
    wait_for_count(&fx.producer, 1).await;

    fx.handler.stop().await;
    assert!(!fx.monitor.is_open(CHANNEL));
    assert!(!fx.handler.status().connected());

    // Late events are dropped, not forwarded.
    fx.monitor
        .push_update(CHANNEL, ChannelUpdate::new(Value::Float64(2.0), 2));
    sleep(Duration::from_millis(20)).await;
    assert_eq!(fx.producer.count(), 1);

    fx.handler.stop().await;
}

#[tokio::test]
async fn test_status_tracks_last_update() {
    let mut fx = start(spec());
    let status = fx.handler.status();
    assert!(status.last_update_ns().is_none());

    fx.monitor.connect(CHANNEL);
    fx.monitor
        .push_update(CHANNEL, ChannelUpdate::new(Value::Float64(1.0), 1));
    wait_for_count(&fx.producer, 1).await;

    assert!(status.last_update_ns().is_some());
    fx.handler.stop().await;
}
