//! Unit tests for the tenant-scoped `BroadcastBus`.
//!
//! These tests exercise the connection registry directly, without any HTTP
//! upgrades. They verify add/remove semantics, tenant-scoped delivery,
//! envelope shape, and graceful shutdown behaviour.

use axum::extract::ws::Message;
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use vigia_api::ws::BroadcastBus;

/// Pull the next Text frame off a receiver and parse it as JSON.
async fn next_json(rx: &mut UnboundedReceiver<Message>) -> serde_json::Value {
    match rx.recv().await.expect("a frame should arrive") {
        Message::Text(text) => serde_json::from_str(&text).expect("frame should be JSON"),
        other => panic!("Expected Text frame, got: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Test: registry bookkeeping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_and_remove_track_connection_counts() {
    let bus = BroadcastBus::new();
    assert_eq!(bus.connection_count().await, 0);

    let _rx1 = bus.add("conn-1".to_string(), 1).await;
    let _rx2 = bus.add("conn-2".to_string(), 2).await;

    assert_eq!(bus.connection_count().await, 2);
    assert_eq!(bus.connection_count_for(1).await, 1);
    assert_eq!(bus.connection_count_for(2).await, 1);

    bus.remove("conn-1").await;
    assert_eq!(bus.connection_count().await, 1);
    assert_eq!(bus.connection_count_for(1).await, 0);
}

#[tokio::test]
async fn remove_is_idempotent() {
    let bus = BroadcastBus::new();

    let _rx = bus.add("conn-1".to_string(), 1).await;
    bus.remove("conn-1").await;
    bus.remove("conn-1").await;
    bus.remove("never-existed").await;

    assert_eq!(bus.connection_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: tenant-scoped delivery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn publish_to_ingenio_never_crosses_tenants() {
    let bus = BroadcastBus::new();

    let mut a1 = bus.add("a1".to_string(), 1).await;
    let mut a2 = bus.add("a2".to_string(), 1).await;
    let mut b1 = bus.add("b1".to_string(), 2).await;
    let mut b2 = bus.add("b2".to_string(), 2).await;

    let sent = bus
        .publish_to_ingenio("reading", &json!({ "sensorId": "s-1" }), 1)
        .await;
    assert_eq!(sent, 2);

    // Both tenant-1 connections receive the frame.
    let frame1 = next_json(&mut a1).await;
    let frame2 = next_json(&mut a2).await;
    assert_eq!(frame1["sensorId"], "s-1");
    assert_eq!(frame2["sensorId"], "s-1");

    // Tenant-2 connections receive nothing.
    assert!(b1.try_recv().is_err(), "tenant 2 must not see tenant 1 data");
    assert!(b2.try_recv().is_err(), "tenant 2 must not see tenant 1 data");
}

#[tokio::test]
async fn publish_reaches_all_tenants() {
    let bus = BroadcastBus::new();

    let mut a = bus.add("a".to_string(), 1).await;
    let mut b = bus.add("b".to_string(), 2).await;

    let sent = bus.publish("maintenance", &json!({ "window": "2h" })).await;
    assert_eq!(sent, 2);

    assert_eq!(next_json(&mut a).await["type"], "maintenance");
    assert_eq!(next_json(&mut b).await["type"], "maintenance");
}

#[tokio::test]
async fn publish_to_unknown_tenant_reaches_nobody() {
    let bus = BroadcastBus::new();

    let mut a = bus.add("a".to_string(), 1).await;

    let sent = bus.publish_to_ingenio("reading", &json!({}), 99).await;

    assert_eq!(sent, 0);
    assert!(a.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Test: envelope shape
// ---------------------------------------------------------------------------

#[tokio::test]
async fn object_payloads_are_flattened_into_envelope() {
    let bus = BroadcastBus::new();
    let mut rx = bus.add("a".to_string(), 1).await;

    bus.publish_to_ingenio("reading", &json!({ "sensorId": "s-1", "severityLevel": 2 }), 1)
        .await;

    let frame = next_json(&mut rx).await;
    assert_eq!(frame["type"], "reading");
    assert_eq!(frame["sensorId"], "s-1");
    assert_eq!(frame["severityLevel"], 2);
}

#[tokio::test]
async fn scalar_payloads_are_wrapped_under_payload_key() {
    let bus = BroadcastBus::new();
    let mut rx = bus.add("a".to_string(), 1).await;

    bus.publish("ping", &42).await;

    let frame = next_json(&mut rx).await;
    assert_eq!(frame["type"], "ping");
    assert_eq!(frame["payload"], 42);
}

// ---------------------------------------------------------------------------
// Test: dead connections are skipped
// ---------------------------------------------------------------------------

#[tokio::test]
async fn closed_channel_is_skipped_silently() {
    let bus = BroadcastBus::new();

    let rx_dead = bus.add("dead".to_string(), 1).await;
    let mut rx_live = bus.add("live".to_string(), 1).await;
    drop(rx_dead);

    let sent = bus.publish_to_ingenio("reading", &json!({ "n": 1 }), 1).await;

    // Only the live connection counts; no error surfaces for the dead one.
    assert_eq!(sent, 1);
    assert_eq!(next_json(&mut rx_live).await["n"], 1);
}

// ---------------------------------------------------------------------------
// Test: shutdown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_all_sends_close_and_clears() {
    let bus = BroadcastBus::new();

    let mut rx1 = bus.add("conn-1".to_string(), 1).await;
    let mut rx2 = bus.add("conn-2".to_string(), 2).await;

    bus.shutdown_all().await;

    assert_eq!(bus.connection_count().await, 0);

    let msg1 = rx1.recv().await.expect("rx1 should receive Close");
    assert!(matches!(msg1, Message::Close(None)));
    let msg2 = rx2.recv().await.expect("rx2 should receive Close");
    assert!(matches!(msg2, Message::Close(None)));

    // After Close, the channels are closed for good.
    assert!(rx1.recv().await.is_none());
}
