use std::sync::Arc;
use std::time::Duration;

use super::pubsub_client::Client;
use crate::broker::Registry;
use crate::config::BrokerSettings;

fn client() -> Client {
    let settings = BrokerSettings::default();
    Client::new(Arc::new(Registry::new(&settings)), &settings)
}

#[test]
fn test_subscribe_uses_default_ttl() {
    let client = client();
    let sub = client.subscribe("topic", "session", None).unwrap();
    assert!(sub.is_active());
    assert_eq!(sub.topic_name(), "topic");
    assert!(client.registry().contains_topic("topic"));
}

#[tokio::test]
async fn test_poll_times_out_with_nothing() {
    let client = client();
    let got = client
        .poll("quiet", "session", None, Duration::from_millis(20))
        .await
        .unwrap();
    assert!(got.is_none());
}

#[tokio::test]
async fn test_poll_receives_cached_state_then_live() {
    let client = client();
    client.publish("chat", "greeting", "hello", None).unwrap();

    let first = client
        .poll("chat", "alice", None, Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.payload, "hello");

    let report = client.publish("chat", "reply", "hi there", None).unwrap();
    assert_eq!(report.enqueued, 1);

    let second = client
        .poll("chat", "alice", None, Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.name, "reply");
}

#[tokio::test]
async fn test_poll_replaces_expired_session() {
    let client = client();
    let old = client
        .subscribe("topic", "session", Some(Duration::from_millis(10)))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    client.publish("topic", "state", "v1", None).unwrap();
    let got = client
        .poll("topic", "session", None, Duration::from_secs(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got.payload, "v1");
    assert!(!old.is_active());
    assert!(old.try_recv().is_none());
}
