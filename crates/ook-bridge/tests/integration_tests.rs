//! Integration tests for the fan bridge
//!
//! These tests drive the bridge through its public API with recording
//! collaborators:
//! - Routing of every command topic to the right frame and state payload
//! - Discovery announcements on connect and offline availability on shutdown
//! - The actor's event loop over a channel
//! - Configuration loading and validation

use std::sync::Arc;

use ook_bridge::{
    run_bridge_actor, Bridge, BridgeConfig, BridgeError, BusEvent, BusRequest, DeviceClass,
    OutboundMessage, ProtocolRouter, RecordingPublisher, RecordingTransmitter, TopicScheme,
};
use ook_protocol::{encode, FanCommand, FanId, RawRfFrame, SpeedLevel};
use serde_json::{json, Value};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    pub const CONFIG: &str = r#"
mqtt:
  broker: broker.local
  username: user
  password: secret
discovery_prefix: homeassistant
fans:
  living_room: "10110101"
  bedroom: "10110110"
"#;

    pub type TestBridge = Bridge<RecordingTransmitter, RecordingPublisher>;

    pub fn config() -> BridgeConfig {
        BridgeConfig::from_yaml(CONFIG).unwrap()
    }

    pub fn bridge() -> TestBridge {
        Bridge::new(
            &config(),
            RecordingTransmitter::new(),
            RecordingPublisher::new(),
        )
    }

    pub fn router() -> ProtocolRouter {
        ProtocolRouter::new(Arc::new(config().rooms), TopicScheme::default())
    }

    /// Frame the bridge should send for a command to a configured room
    pub fn frame(room_bits: &str, command: FanCommand) -> RawRfFrame {
        encode(&FanId::parse(room_bits).unwrap(), command.code())
    }

    /// Send one message through the bridge, returning the frames and JSON
    /// payloads it produced
    pub async fn exchange(topic: &str, payload: &str) -> (Vec<RawRfFrame>, Vec<(String, Value)>) {
        let bridge = bridge();
        bridge.on_message(topic, payload.as_bytes()).await;
        let published = bridge
            .publisher()
            .published()
            .into_iter()
            .map(|m| {
                let value = m.json().unwrap();
                (m.topic, value)
            })
            .collect();
        (bridge.transmitter().frames(), published)
    }
}

// ============================================================================
// Command Routing Tests
// ============================================================================

mod command_tests {
    use super::*;

    #[tokio::test]
    async fn test_percentage_full_sends_speed1() {
        let (frames, published) = helpers::exchange(
            "homeassistant/fan/living_room_fan/speed/percentage/set",
            "100",
        )
        .await;

        assert_eq!(frames, vec![helpers::frame("10110101", FanCommand::Speed1)]);
        assert_eq!(
            published,
            vec![(
                "homeassistant/fan/living_room_fan/state".to_string(),
                json!({"state": "ON", "percentage": 100})
            )]
        );
    }

    #[tokio::test]
    async fn test_percentage_zero_sends_stop() {
        let (frames, published) = helpers::exchange(
            "homeassistant/fan/bedroom_fan/speed/percentage/set",
            "0",
        )
        .await;

        assert_eq!(frames, vec![helpers::frame("10110110", FanCommand::Stop)]);
        assert_eq!(published[0].1, json!({"state": "OFF", "percentage": 0}));
    }

    #[tokio::test]
    async fn test_percentage_is_snapped_to_level() {
        let cases = [
            ("50", FanCommand::Speed4, 50),
            ("75", FanCommand::Speed3, 67),
            ("17", FanCommand::Speed6, 17),
            ("9", FanCommand::Speed6, 17),
            ("91", FanCommand::Speed2, 83),
        ];

        for (payload, command, reported) in cases {
            let (frames, published) = helpers::exchange(
                "homeassistant/fan/bedroom_fan/speed/percentage/set",
                payload,
            )
            .await;
            assert_eq!(frames, vec![helpers::frame("10110110", command)], "{payload}");
            assert_eq!(
                published[0].1,
                json!({"state": "ON", "percentage": reported}),
                "{payload}"
            );
        }
    }

    #[tokio::test]
    async fn test_out_of_range_percentage_is_clamped() {
        let (frames, _) = helpers::exchange(
            "homeassistant/fan/bedroom_fan/speed/percentage/set",
            "250",
        )
        .await;
        assert_eq!(frames, vec![helpers::frame("10110110", FanCommand::Speed1)]);

        let (frames, _) = helpers::exchange(
            "homeassistant/fan/bedroom_fan/speed/percentage/set",
            "-5",
        )
        .await;
        assert_eq!(frames, vec![helpers::frame("10110110", FanCommand::Stop)]);
    }

    #[tokio::test]
    async fn test_direction_reverses() {
        let (frames, published) = helpers::exchange(
            "homeassistant/fan/living_room_fan/direction/set",
            "reverse",
        )
        .await;
        assert_eq!(frames, vec![helpers::frame("10110101", FanCommand::Reverse)]);
        assert_eq!(published[0].1, json!({"direction": "reverse"}));
    }

    #[tokio::test]
    async fn test_power_commands() {
        let (frames, published) =
            helpers::exchange("homeassistant/fan/living_room_fan/on/set", "ON").await;
        assert_eq!(frames, vec![helpers::frame("10110101", FanCommand::Speed4)]);
        assert_eq!(published[0].1, json!({"state": "ON", "percentage": 33}));

        let (frames, published) =
            helpers::exchange("homeassistant/fan/living_room_fan/on/set", "OFF").await;
        assert_eq!(frames, vec![helpers::frame("10110101", FanCommand::Stop)]);
        assert_eq!(published[0].1, json!({"state": "OFF", "percentage": 33}));
    }

    #[tokio::test]
    async fn test_light_toggle_json_and_raw() {
        for payload in [r#"{"state": "ON"}"#, "ON", r#"{"state": "OFF"}"#, "OFF"] {
            let (frames, published) = helpers::exchange(
                "homeassistant/light/living_room_fan_light/set",
                payload,
            )
            .await;
            assert_eq!(
                frames,
                vec![helpers::frame("10110101", FanCommand::Light)],
                "{payload}"
            );
            assert_eq!(
                published[0].0,
                "homeassistant/light/living_room_fan_light/state"
            );
        }
    }

    #[tokio::test]
    async fn test_light_quoted_state_publishes_bare_state() {
        let (frames, published) = helpers::exchange(
            "homeassistant/light/living_room_fan_light/set",
            r#""ON""#,
        )
        .await;
        assert_eq!(frames, vec![helpers::frame("10110101", FanCommand::Light)]);
        assert_eq!(published[0].1, json!({"state": "ON"}));
    }

    #[tokio::test]
    async fn test_repeated_messages_are_not_deduplicated() {
        let bridge = helpers::bridge();
        for _ in 0..3 {
            bridge
                .on_message("homeassistant/light/bedroom_fan_light/set", b"ON")
                .await;
        }
        assert_eq!(bridge.transmitter().frames().len(), 3);
        assert_eq!(bridge.publisher().published().len(), 3);
    }
}

// ============================================================================
// Edge Case Tests
// ============================================================================

mod edge_case_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_room_does_nothing() {
        let (frames, published) =
            helpers::exchange("homeassistant/fan/garage_fan/on/set", "ON").await;
        assert!(frames.is_empty());
        assert!(published.is_empty());
    }

    #[tokio::test]
    async fn test_unmatched_fan_topic_does_nothing() {
        let (frames, published) = helpers::exchange(
            "homeassistant/fan/living_room_fan/oscillation/set",
            "on",
        )
        .await;
        assert!(frames.is_empty());
        assert!(published.is_empty());
    }

    #[tokio::test]
    async fn test_bad_percentage_does_nothing() {
        let (frames, published) = helpers::exchange(
            "homeassistant/fan/living_room_fan/speed/percentage/set",
            "12.5",
        )
        .await;
        assert!(frames.is_empty());
        assert!(published.is_empty());
    }

    #[tokio::test]
    async fn test_light_unknown_state_publishes_only() {
        let (frames, published) = helpers::exchange(
            "homeassistant/light/bedroom_fan_light/set",
            r#"{"state": "TOGGLE"}"#,
        )
        .await;
        assert!(frames.is_empty());
        assert_eq!(published[0].1, json!({"state": "TOGGLE"}));
    }

    #[test]
    fn test_route_errors_are_typed() {
        let router = helpers::router();
        assert!(matches!(
            router.route("homeassistant/fan/garage_fan/on/set", b"ON"),
            Err(BridgeError::UnknownRoom(_))
        ));
        assert!(matches!(
            router.route("homeassistant", b"ON"),
            Err(BridgeError::MalformedTopic(_))
        ));
        assert!(matches!(
            router.route("homeassistant/fan/bedroom_fan/speed/percentage/set", b"x"),
            Err(BridgeError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_device_class_follows_object_id() {
        let router = helpers::router();
        let routed = router
            .route("homeassistant/light/bedroom_fan_light/set", b"ON")
            .unwrap()
            .unwrap();
        assert_eq!(routed.device, DeviceClass::Light);
        assert_eq!(routed.fan.as_str(), "10110110");
    }
}

// ============================================================================
// Discovery Tests
// ============================================================================

mod discovery_tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_announces_every_room() {
        let bridge = helpers::bridge();
        bridge.on_connected().await.unwrap();
        let published = bridge.publisher().published();

        assert_eq!(
            published[0],
            OutboundMessage::retained("homeassistant/status", "online")
        );
        assert!(published.iter().all(|m| m.retain));

        let config = published
            .iter()
            .find(|m| m.topic == "homeassistant/fan/living_room_fan/config")
            .unwrap()
            .json()
            .unwrap();
        assert_eq!(config["name"], "Living Room Fan");
        assert_eq!(config["unique_id"], "fan_living_room");

        let config = published
            .iter()
            .find(|m| m.topic == "homeassistant/light/bedroom_fan_light/config")
            .unwrap()
            .json()
            .unwrap();
        assert_eq!(config["name"], "Bedroom Fan Light");
        assert_eq!(config["unique_id"], "light_bedroom_fan");
    }

    #[tokio::test]
    async fn test_connect_publishes_initial_state_and_availability() {
        let bridge = helpers::bridge();
        bridge.on_connected().await.unwrap();
        let published = bridge.publisher().published();

        let find = |topic: &str| {
            published
                .iter()
                .find(|m| m.topic == topic)
                .map(|m| m.payload.clone())
        };

        assert_eq!(
            find("homeassistant/fan/bedroom_fan/state").map(|p| serde_json::from_str::<Value>(&p).unwrap()),
            Some(json!({"state": "OFF", "percentage": 0, "direction": "forward"}))
        );
        assert_eq!(
            find("homeassistant/light/bedroom_fan_light/state").as_deref(),
            Some(r#"{"state":"OFF"}"#)
        );
        assert_eq!(
            find("homeassistant/fan/bedroom_fan/availability").as_deref(),
            Some("online")
        );
        assert_eq!(
            find("homeassistant/fan/bedroom_fan/on/set").as_deref(),
            Some("")
        );
    }

    #[tokio::test]
    async fn test_connect_subscribes_to_command_topics() {
        let bridge = helpers::bridge();
        bridge.on_connected().await.unwrap();

        let mut subs = bridge.publisher().subscriptions();
        subs.sort();
        assert_eq!(
            subs,
            vec![
                "homeassistant/fan/bedroom_fan/direction/set",
                "homeassistant/fan/bedroom_fan/on/set",
                "homeassistant/fan/bedroom_fan/speed/percentage/set",
                "homeassistant/fan/living_room_fan/direction/set",
                "homeassistant/fan/living_room_fan/on/set",
                "homeassistant/fan/living_room_fan/speed/percentage/set",
                "homeassistant/light/bedroom_fan_light/set",
                "homeassistant/light/living_room_fan_light/set",
            ]
        );
    }

    #[tokio::test]
    async fn test_room_is_cleared_before_subscribing() {
        let bridge = helpers::bridge();
        bridge.on_connected().await.unwrap();
        let requests = bridge.publisher().requests();

        let cleared = requests.iter().position(|r| {
            matches!(r, BusRequest::Publish(m)
                if m.topic == "homeassistant/fan/bedroom_fan/on/set" && m.payload.is_empty())
        });
        let subscribed = requests.iter().position(|r| {
            matches!(r, BusRequest::Subscribe(t) if t == "homeassistant/fan/bedroom_fan/on/set")
        });
        assert!(cleared.unwrap() < subscribed.unwrap());
    }

    #[tokio::test]
    async fn test_reconnect_announces_again() {
        let bridge = helpers::bridge();
        bridge.on_connected().await.unwrap();
        let first = bridge.publisher().requests().len();
        bridge.on_connected().await.unwrap();
        assert_eq!(bridge.publisher().requests().len(), 2 * first);
    }

    #[tokio::test]
    async fn test_shutdown_marks_offline() {
        let bridge = helpers::bridge();
        bridge.on_shutdown().await.unwrap();
        let topics: Vec<String> = bridge
            .publisher()
            .published()
            .into_iter()
            .filter(|m| m.payload == "offline")
            .map(|m| m.topic)
            .collect();
        assert_eq!(
            topics,
            vec![
                "homeassistant/fan/bedroom_fan/availability",
                "homeassistant/light/bedroom_fan_light/availability",
                "homeassistant/fan/living_room_fan/availability",
                "homeassistant/light/living_room_fan_light/availability",
            ]
        );
    }
}

// ============================================================================
// Actor Tests
// ============================================================================

mod actor_tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_actor_announces_then_handles_commands() {
        let bridge = helpers::bridge();
        let (event_tx, event_rx) = mpsc::channel(16);

        let events = [
            BusEvent::Connected,
            BusEvent::Message {
                topic: "homeassistant/fan/living_room_fan/direction/set".into(),
                payload: b"reverse".to_vec(),
            },
            BusEvent::Message {
                topic: "homeassistant/light/bedroom_fan_light/set".into(),
                payload: br#"{"state":"OFF"}"#.to_vec(),
            },
        ];
        for event in events {
            event_tx.send(event).await.unwrap();
        }
        drop(event_tx);

        run_bridge_actor(&bridge, event_rx).await;

        assert_eq!(
            bridge.transmitter().frames(),
            vec![
                helpers::frame("10110101", FanCommand::Reverse),
                helpers::frame("10110110", FanCommand::Light),
            ]
        );

        let published = bridge.publisher().published();
        let tail: Vec<&str> = published
            .iter()
            .rev()
            .take(2)
            .map(|m| m.topic.as_str())
            .collect();
        assert_eq!(
            tail,
            [
                "homeassistant/light/bedroom_fan_light/state",
                "homeassistant/fan/living_room_fan/state",
            ]
        );
    }

    #[tokio::test]
    async fn test_actor_survives_connection_loss() {
        let bridge = helpers::bridge();
        let (event_tx, event_rx) = mpsc::channel(16);

        event_tx.send(BusEvent::Connected).await.unwrap();
        event_tx
            .send(BusEvent::ConnectionLost {
                reason: "broker went away".into(),
            })
            .await
            .unwrap();
        event_tx.send(BusEvent::Connected).await.unwrap();
        drop(event_tx);

        run_bridge_actor(&bridge, event_rx).await;

        let status_count = bridge
            .publisher()
            .published()
            .iter()
            .filter(|m| m.topic == "homeassistant/status")
            .count();
        assert_eq!(status_count, 2);
    }

    #[tokio::test]
    async fn test_actor_publishes_state_when_transmit_fails() {
        let bridge = Bridge::new(
            &helpers::config(),
            RecordingTransmitter::failing(),
            RecordingPublisher::new(),
        );
        let (event_tx, event_rx) = mpsc::channel(4);
        event_tx
            .send(BusEvent::Message {
                topic: "homeassistant/fan/bedroom_fan/on/set".into(),
                payload: b"ON".to_vec(),
            })
            .await
            .unwrap();
        drop(event_tx);

        run_bridge_actor(&bridge, event_rx).await;

        let published = bridge.publisher().published();
        assert_eq!(published.len(), 1);
        assert_eq!(
            published[0].json().unwrap(),
            json!({"state": "ON", "percentage": 33})
        );
    }
}

// ============================================================================
// Configuration Tests
// ============================================================================

mod config_tests {
    use super::*;

    #[test]
    fn test_config_loads_rooms_and_credentials() {
        let config = helpers::config();
        assert_eq!(config.rooms.len(), 2);
        assert_eq!(config.rooms.get("bedroom").unwrap().as_str(), "10110110");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.transmitter.program, "sendook");
    }

    #[test]
    fn test_config_rejects_unquoted_identifiers() {
        let err = BridgeConfig::from_yaml("mqtt: { broker: b }\nfans: { den: 1011 }").unwrap_err();
        assert!(err.to_string().contains("quoted"));
    }

    #[test]
    fn test_config_rejects_mixed_widths() {
        assert!(
            BridgeConfig::from_yaml("mqtt: { broker: b }\nfans: { den: \"1011\", hall: \"10\" }")
                .is_err()
        );
    }

    #[test]
    fn test_custom_prefix_flows_through_bridge() {
        let config = BridgeConfig::from_yaml(
            "mqtt: { broker: b }\ndiscovery_prefix: ha\nfans: { den: \"1011\" }",
        )
        .unwrap();
        let router = ProtocolRouter::new(
            Arc::new(config.rooms.clone()),
            TopicScheme::new(config.discovery_prefix.clone()),
        );
        let routed = router.route("ha/fan/den_fan/on/set", b"ON").unwrap().unwrap();
        assert_eq!(routed.state.topic, "ha/fan/den_fan/state");
    }

    #[tokio::test]
    async fn test_multi_level_prefix_drives_bridge() {
        let config = BridgeConfig::from_yaml(
            "mqtt: { broker: b }\ndiscovery_prefix: home/ha\nfans: { den: \"1011\" }",
        )
        .unwrap();
        let bridge = Bridge::new(&config, RecordingTransmitter::new(), RecordingPublisher::new());
        bridge.on_connected().await.unwrap();

        let subscriptions = bridge.publisher().subscriptions();
        assert_eq!(subscriptions[0], "home/ha/fan/den_fan/on/set");

        let routed = bridge.on_message(&subscriptions[0], b"ON").await;
        assert!(routed.is_some());
        assert_eq!(
            bridge.transmitter().frames(),
            vec![helpers::frame("1011", FanCommand::Speed4)]
        );

        let last = bridge.publisher().published().pop().unwrap();
        assert_eq!(last.topic, "home/ha/fan/den_fan/state");
        assert_eq!(last.json().unwrap(), json!({"state": "ON", "percentage": 33}));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    fn command_topic() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("homeassistant/fan/living_room_fan/on/set".to_string()),
            Just("homeassistant/fan/living_room_fan/speed/percentage/set".to_string()),
            Just("homeassistant/fan/bedroom_fan/direction/set".to_string()),
            Just("homeassistant/light/bedroom_fan_light/set".to_string()),
            Just("homeassistant/fan/attic_fan/on/set".to_string()),
            "[a-z/_]{0,40}",
        ]
    }

    proptest! {
        #[test]
        fn router_never_panics(topic in command_topic(), payload in prop::collection::vec(any::<u8>(), 0..32)) {
            let _ = helpers::router().handle(&topic, &payload);
        }

        #[test]
        fn percentage_state_matches_command(p in 0i64..=100) {
            let routed = helpers::router()
                .route(
                    "homeassistant/fan/living_room_fan/speed/percentage/set",
                    p.to_string().as_bytes(),
                )
                .unwrap()
                .unwrap();
            let message = routed.state.to_message().unwrap();
            let state = message.json().unwrap();
            let reported = state["percentage"].as_u64().unwrap();

            prop_assert!(reported <= 100);
            if routed.command == Some(FanCommand::Stop) {
                prop_assert_eq!(&state["state"], "OFF");
                prop_assert_eq!(reported, 0);
            } else {
                prop_assert_eq!(&state["state"], "ON");
                prop_assert_eq!(routed.command, Some(SpeedLevel::from_percentage(p as u8).command()));
            }
        }

        #[test]
        fn routed_frames_have_fixed_length(topic in command_topic(), payload in "ON|OFF|[0-9]{1,3}") {
            if let Ok(Some(routed)) = helpers::router().route(&topic, payload.as_bytes()) {
                if let Some(command) = routed.command {
                    let frame = encode(&routed.fan, command.code());
                    prop_assert_eq!(frame.len(), RawRfFrame::expected_len(routed.fan.width()));
                }
            }
        }
    }
}
