use std::sync::Arc;

use serde_json::json;

use crate::broker::Registry;
use crate::client::Client;
use crate::config::{BrokerSettings, ServerSettings, Settings};
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::transport::websocket::{handle_client_message, handle_text};

fn setup(session_timeout_ms: u64) -> (Client, ServerSettings) {
    let settings = Settings::default();
    let broker: BrokerSettings = settings.broker.clone();
    let client = Client::new(Arc::new(Registry::new(&broker)), &broker);
    let server = ServerSettings {
        session_timeout_ms,
        ..settings.server
    };
    (client, server)
}

#[test]
fn test_client_message_optional_ttl() {
    let msg: ClientMessage = serde_json::from_value(json!({
        "type": "subscribe",
        "topic": "chat",
        "id": "alice"
    }))
    .unwrap();
    match msg {
        ClientMessage::Subscribe { topic, id, ttl_ms } => {
            assert_eq!(topic, "chat");
            assert_eq!(id, "alice");
            assert_eq!(ttl_ms, None);
        }
        other => panic!("Expected Subscribe, got {other:?}"),
    }
}

#[tokio::test]
async fn test_handle_subscribe_times_out_empty() {
    let (client, settings) = setup(20);
    let msg = ClientMessage::Subscribe {
        topic: "quiet".to_string(),
        id: "session".to_string(),
        ttl_ms: None,
    };

    match handle_client_message(&client, &settings, msg).await {
        ServerMessage::Empty { topic } => assert_eq!(topic, "quiet"),
        other => panic!("Expected Empty, got {other:?}"),
    }
}

#[tokio::test]
async fn test_handle_publish_then_subscribe() {
    let (client, settings) = setup(1_000);

    let publish = json!({
        "type": "publish",
        "topic": "test_topic",
        "name": "greeting",
        "payload": "hello"
    })
    .to_string();
    match handle_text(&client, &settings, &publish).await {
        ServerMessage::Published {
            topic,
            name,
            enqueued,
            ..
        } => {
            assert_eq!(topic, "test_topic");
            assert_eq!(name, "greeting");
            assert_eq!(enqueued, 0);
        }
        other => panic!("Expected Published, got {other:?}"),
    }

    let subscribe = json!({
        "type": "subscribe",
        "topic": "test_topic",
        "id": "client-1",
        "ttl_ms": 60_000
    })
    .to_string();
    match handle_text(&client, &settings, &subscribe).await {
        ServerMessage::Message {
            topic,
            name,
            payload,
            ..
        } => {
            assert_eq!(topic, "test_topic");
            assert_eq!(name, "greeting");
            assert_eq!(payload, "hello");
        }
        other => panic!("Expected Message, got {other:?}"),
    }
}

#[tokio::test]
async fn test_handle_invalid_message() {
    let (client, settings) = setup(20);
    let response = handle_text(&client, &settings, "{\"type\":\"unsubscribe\"}").await;
    assert!(matches!(response, ServerMessage::Error { .. }));

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["type"], "error");
}
