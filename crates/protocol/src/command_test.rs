//! Command codec tests

use crate::{parse_command, serialize_command, ConfigCommand, ProtocolError, StreamSpec};

fn sample_spec() -> StreamSpec {
    StreamSpec {
        channel: "SIM:Spd1".to_string(),
        provider_type: "pva".to_string(),
        schema: "f142".to_string(),
        topic: "motion".to_string(),
        periodic_ms: None,
    }
}

#[test]
fn test_parse_add_command() {
    let payload = br#"{
        "cmd": "add",
        "streams": [
            { "channel": "SIM:Spd1",
              "channel_provider_type": "pva",
              "converter": { "schema": "f142", "topic": "motion" } }
        ]
    }"#;

    let command = parse_command(payload).unwrap();
    assert_eq!(command, ConfigCommand::Add(vec![sample_spec()]));
}

#[test]
fn test_parse_add_with_periodic_interval() {
    let payload = br#"{
        "cmd": "add",
        "streams": [
            { "channel": "SIM:Spd1",
              "converter": { "schema": "f142", "topic": "motion", "periodic_update_ms": 500 } }
        ]
    }"#;

    match parse_command(payload).unwrap() {
        ConfigCommand::Add(specs) => {
            assert_eq!(specs.len(), 1);
            assert_eq!(specs[0].periodic_ms, Some(500));
            // Provider type defaults when omitted
            assert_eq!(specs[0].provider_type, "pva");
        }
        other => panic!("expected Add, got {other:?}"),
    }
}

#[test]
fn test_parse_remove_command() {
    let payload = br#"{
        "cmd": "remove",
        "streams": [ { "channel": "SIM:Spd1" }, { "channel": "SIM:Spd2" } ]
    }"#;

    let command = parse_command(payload).unwrap();
    assert_eq!(
        command,
        ConfigCommand::Remove(vec!["SIM:Spd1".to_string(), "SIM:Spd2".to_string()])
    );
}

#[test]
fn test_parse_remove_all_command() {
    let command = parse_command(br#"{ "cmd": "remove_all" }"#).unwrap();
    assert_eq!(command, ConfigCommand::RemoveAll);
}

#[test]
fn test_malformed_json_rejected() {
    let err = parse_command(b"{ not json").unwrap_err();
    assert!(matches!(err, ProtocolError::ConfigParse(_)));
}

#[test]
fn test_unknown_verb_rejected() {
    let err = parse_command(br#"{ "cmd": "explode" }"#).unwrap_err();
    assert!(err.to_string().contains("explode"));
}

#[test]
fn test_add_without_converter_block_rejected() {
    let payload = br#"{ "cmd": "add", "streams": [ { "channel": "SIM:Spd1" } ] }"#;
    let err = parse_command(payload).unwrap_err();
    assert!(matches!(err, ProtocolError::ConfigParse(_)));
    assert!(err.to_string().contains("converter"));
}

#[test]
fn test_empty_add_rejected() {
    let err = parse_command(br#"{ "cmd": "add", "streams": [] }"#).unwrap_err();
    assert!(matches!(err, ProtocolError::ConfigParse(_)));
}

#[test]
fn test_serialize_parse_round_trip() {
    let commands = vec![
        ConfigCommand::Add(vec![
            sample_spec(),
            StreamSpec {
                channel: "SIM:Spd2".to_string(),
                provider_type: "ca".to_string(),
                schema: "f142".to_string(),
                topic: "motion".to_string(),
                periodic_ms: Some(100),
            },
        ]),
        ConfigCommand::Remove(vec!["SIM:Spd1".to_string()]),
        ConfigCommand::RemoveAll,
    ];

    for command in commands {
        let wire = serialize_command(&command);
        let parsed = parse_command(&wire).unwrap();
        assert_eq!(parsed, command, "round trip for {command:?}");
    }
}
