//! Unit tests for `WsManager`.

use axum::extract::ws::Message;
use ensemble_api::ws::WsManager;

#[tokio::test]
async fn add_and_remove_track_connection_count() {
    let manager = WsManager::new();
    assert_eq!(manager.connection_count().await, 0);

    let _rx = manager.add("conn-1".to_string()).await;
    assert_eq!(manager.connection_count().await, 1);

    manager.remove("nonexistent").await;
    assert_eq!(manager.connection_count().await, 1);

    manager.remove("conn-1").await;
    assert_eq!(manager.connection_count().await, 0);
}

#[tokio::test]
async fn published_snapshot_reaches_every_connection() {
    let manager = WsManager::new();
    let mut rx1 = manager.add("conn-1".to_string()).await;
    let mut rx2 = manager.add("conn-2".to_string()).await;

    manager.publish_snapshot(Message::Text("v1".into())).await;

    assert_eq!(text(rx1.recv().await), "v1");
    assert_eq!(text(rx2.recv().await), "v1");
    assert!(manager.has_snapshot().await);
}

#[tokio::test]
async fn shutdown_sends_close_and_clears() {
    let manager = WsManager::new();
    let mut rx = manager.add("conn-1".to_string()).await;

    manager.shutdown_all().await;

    assert_eq!(manager.connection_count().await, 0);
    assert!(matches!(rx.recv().await, Some(Message::Close(None))));
}

fn text(message: Option<Message>) -> String {
    match message {
        Some(Message::Text(t)) => t.as_str().to_string(),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

#[tokio::test]
async fn late_connection_starts_from_published_snapshot() {
    let manager = WsManager::new();
    manager.publish_snapshot(Message::Text("v1".into())).await;

    let mut rx = manager.add("conn-1".to_string()).await;
    assert_eq!(text(rx.try_recv().ok()), "v1");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn seed_never_overwrites_a_newer_snapshot() {
    let manager = WsManager::new();
    let mut rx = manager.add("conn-1".to_string()).await;
    assert!(!manager.has_snapshot().await);

    // The feed publishes while the connection's own load is in flight.
    manager.publish_snapshot(Message::Text("v2".into())).await;
    assert!(!manager.seed_snapshot(Message::Text("v1".into())).await);

    assert_eq!(text(rx.try_recv().ok()), "v2");
    assert!(rx.try_recv().is_err());

    let mut late = manager.add("conn-2".to_string()).await;
    assert_eq!(text(late.try_recv().ok()), "v2");
}

#[tokio::test]
async fn seed_reaches_waiting_connections_once() {
    let manager = WsManager::new();
    let mut rx1 = manager.add("conn-1".to_string()).await;
    let mut rx2 = manager.add("conn-2".to_string()).await;

    assert!(manager.seed_snapshot(Message::Text("v1".into())).await);
    assert!(!manager.seed_snapshot(Message::Text("v1".into())).await);

    assert_eq!(text(rx1.try_recv().ok()), "v1");
    assert_eq!(text(rx2.try_recv().ok()), "v1");
    assert!(rx1.try_recv().is_err());
    assert!(rx2.try_recv().is_err());
}
