//! Integration tests for connection registration, room authorization,
//! broadcast fan-out, and the heartbeat sweep.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use tokio::sync::mpsc;

use staffhub_auth::access::cache::AccessCache;
use staffhub_auth::jwt::claims::Claims;
use staffhub_auth::jwt::verifier::TokenVerifier;
use staffhub_core::config::access::AccessConfig;
use staffhub_core::config::auth::AuthConfig;
use staffhub_core::config::realtime::RealtimeConfig;
use staffhub_core::error::ErrorKind;
use staffhub_core::types::id::{PropertyId, UserId};
use staffhub_database::memory::MemoryDirectory;
use staffhub_entity::user::UserRole;
use staffhub_realtime::connection::manager::ConnectionManager;
use staffhub_realtime::connection::sweeper::sweep_once;
use staffhub_realtime::message::types::OutboundMessage;
use staffhub_realtime::metrics::EngineMetrics;
use staffhub_realtime::room::key::RoomKey;

const SECRET: &str = "engine-test-secret";

struct Harness {
    manager: Arc<ConnectionManager>,
    directory: Arc<MemoryDirectory>,
    access: Arc<AccessCache>,
    metrics: Arc<EngineMetrics>,
}

fn harness() -> Harness {
    let auth_config = AuthConfig {
        jwt_secret: SECRET.to_string(),
        issuer: "staffhub".to_string(),
        leeway_seconds: 0,
    };
    let directory = Arc::new(MemoryDirectory::new());
    let access = Arc::new(AccessCache::new(
        directory.clone(),
        &AccessConfig {
            ttl_seconds: 300,
            refresh_timeout_seconds: 5,
        },
    ));
    let metrics = Arc::new(EngineMetrics::new());
    let manager = Arc::new(ConnectionManager::new(
        RealtimeConfig::default(),
        Arc::new(TokenVerifier::new(&auth_config)),
        access.clone(),
        metrics.clone(),
    ));
    Harness {
        manager,
        directory,
        access,
        metrics,
    }
}

fn token(user_id: UserId, role: UserRole) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.into_uuid(),
        role,
        name: "Test User".to_string(),
        iss: "staffhub".to_string(),
        iat: now,
        exp: now + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("encode token")
}

/// Drain everything currently buffered on a connection's receiver.
fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<OutboundMessage> {
    let mut frames = Vec::new();
    while let Ok(raw) = rx.try_recv() {
        frames.push(serde_json::from_str(&raw).expect("valid frame"));
    }
    frames
}

#[tokio::test]
async fn test_register_rejects_bad_credential() {
    let h = harness();
    let err = h.manager.register("not-a-jwt").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authentication);
    assert_eq!(h.manager.connection_count(), 0);
}

#[tokio::test]
async fn test_register_queues_accepted_frame_and_personal_room() {
    let h = harness();
    let user = UserId::new();
    let (handle, mut rx) = h
        .manager
        .register(&token(user, UserRole::Employee))
        .expect("register");

    let frames = drain(&mut rx);
    assert!(matches!(frames[0], OutboundMessage::Accepted { connection_id } if connection_id == handle.id));
    assert!(h.manager.rooms().is_member(&RoomKey::User(user), handle.id));
}

#[tokio::test]
async fn test_manager_property_subscription_requires_assignment() {
    let h = harness();
    let manager_id = UserId::new();
    let assigned = PropertyId::new();
    let other = PropertyId::new();
    h.directory.assign_manager(manager_id, assigned);

    let (handle, _rx) = h
        .manager
        .register(&token(manager_id, UserRole::Manager))
        .expect("register");

    h.manager
        .subscribe(&handle.id, RoomKey::Property(assigned))
        .await
        .expect("assigned property allowed");

    let err = h
        .manager
        .subscribe(&handle.id, RoomKey::Property(other))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authorization);
    assert!(!h.manager.rooms().is_member(&RoomKey::Property(other), handle.id));
}

#[tokio::test]
async fn test_global_room_is_admin_only() {
    let h = harness();

    let (manager_conn, _rx1) = h
        .manager
        .register(&token(UserId::new(), UserRole::Manager))
        .expect("register manager");
    let err = h
        .manager
        .subscribe(&manager_conn.id, RoomKey::Global)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authorization);

    let (admin_conn, _rx2) = h
        .manager
        .register(&token(UserId::new(), UserRole::Admin))
        .expect("register admin");
    h.manager
        .subscribe(&admin_conn.id, RoomKey::Global)
        .await
        .expect("admin may join the global room");
}

#[tokio::test]
async fn test_admin_bypasses_property_assignment() {
    let h = harness();
    let (admin_conn, _rx) = h
        .manager
        .register(&token(UserId::new(), UserRole::Admin))
        .expect("register admin");

    h.manager
        .subscribe(&admin_conn.id, RoomKey::Property(PropertyId::new()))
        .await
        .expect("admin may join any property room");
}

#[tokio::test]
async fn test_unsubscribe_is_idempotent() {
    let h = harness();
    let (handle, _rx) = h
        .manager
        .register(&token(UserId::new(), UserRole::Employee))
        .expect("register");

    // Never joined; must be a silent no-op.
    h.manager
        .unsubscribe(&handle.id, RoomKey::Property(PropertyId::new()));
    h.manager
        .unsubscribe(&handle.id, RoomKey::Property(PropertyId::new()));
    assert!(h.manager.pool().get(&handle.id).is_some());
}

#[tokio::test]
async fn test_broadcast_preserves_per_connection_order() {
    let h = harness();
    let manager_id = UserId::new();
    let property = PropertyId::new();
    h.directory.assign_manager(manager_id, property);

    let (handle, mut rx) = h
        .manager
        .register(&token(manager_id, UserRole::Manager))
        .expect("register");
    h.manager
        .subscribe(&handle.id, RoomKey::Property(property))
        .await
        .expect("subscribe");
    drain(&mut rx);

    let room = RoomKey::Property(property);
    let first = OutboundMessage::event(&room, "application_submitted", serde_json::json!({"n": 1}));
    let second = OutboundMessage::event(&room, "application_submitted", serde_json::json!({"n": 2}));
    assert_eq!(h.manager.broadcast(&room, &first), 1);
    assert_eq!(h.manager.broadcast(&room, &second), 1);

    let frames = drain(&mut rx);
    let ns: Vec<i64> = frames
        .iter()
        .filter_map(|f| match f {
            OutboundMessage::Event { payload, .. } => payload.get("n").and_then(|v| v.as_i64()),
            _ => None,
        })
        .collect();
    assert_eq!(ns, vec![1, 2], "events observed in broadcast order");
}

#[tokio::test]
async fn test_broadcast_to_empty_room_returns_zero() {
    let h = harness();
    let room = RoomKey::Property(PropertyId::new());
    let event = OutboundMessage::event(&room, "system_alert", serde_json::json!({}));
    assert_eq!(h.manager.broadcast(&room, &event), 0);
}

#[tokio::test]
async fn test_broadcast_unregisters_closed_connections() {
    let h = harness();
    let user = UserId::new();
    let (handle, rx) = h
        .manager
        .register(&token(user, UserRole::Employee))
        .expect("register");
    drop(rx);

    let room = RoomKey::User(user);
    let event = OutboundMessage::event(&room, "system_alert", serde_json::json!({}));
    assert_eq!(h.manager.broadcast(&room, &event), 0);
    assert!(h.manager.pool().get(&handle.id).is_none(), "closed connection evicted");
    assert_eq!(h.manager.rooms().member_count(&room), 0);
}

#[tokio::test]
async fn test_revoked_assignment_keeps_subscription_but_blocks_new_ones() {
    let h = harness();
    let manager_id = UserId::new();
    let property = PropertyId::new();
    h.directory.assign_manager(manager_id, property);

    let (handle, _rx) = h
        .manager
        .register(&token(manager_id, UserRole::Manager))
        .expect("register");
    let room = RoomKey::Property(property);
    h.manager
        .subscribe(&handle.id, room)
        .await
        .expect("subscribe while assigned");

    // HR revokes the assignment and invalidates the cache.
    h.directory.revoke_manager(manager_id, property);
    h.access.invalidate(manager_id);

    // The live subscription survives (documented fail-open)...
    assert!(h.manager.rooms().is_member(&room, handle.id));

    // ...but a fresh attempt is rejected.
    let (second, _rx2) = h
        .manager
        .register(&token(manager_id, UserRole::Manager))
        .expect("register second connection");
    let err = h.manager.subscribe(&second.id, room).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authorization);
}

#[tokio::test]
async fn test_heartbeat_sweep_evicts_stale_connections() {
    let h = harness();
    let manager_id = UserId::new();
    let property = PropertyId::new();
    h.directory.assign_manager(manager_id, property);

    let (stale, mut stale_rx) = h
        .manager
        .register(&token(manager_id, UserRole::Manager))
        .expect("register stale");
    let (fresh, mut fresh_rx) = h
        .manager
        .register(&token(manager_id, UserRole::Manager))
        .expect("register fresh");

    let room = RoomKey::Property(property);
    h.manager.subscribe(&stale.id, room).await.expect("subscribe");
    h.manager.subscribe(&fresh.id, room).await.expect("subscribe");

    // Let wall-clock time pass, then refresh only one connection.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    h.manager.heartbeat(&fresh.id).await;

    let swept = sweep_once(&h.manager, &h.metrics, chrono::Duration::milliseconds(25)).await;
    assert_eq!(swept, 1);
    assert!(h.manager.pool().get(&stale.id).is_none());
    assert!(h.manager.pool().get(&fresh.id).is_some());

    // Subsequent broadcasts exclude the swept connection.
    drain(&mut stale_rx);
    drain(&mut fresh_rx);
    let event = OutboundMessage::event(&room, "system_alert", serde_json::json!({}));
    assert_eq!(h.manager.broadcast(&room, &event), 1);
    assert!(drain(&mut stale_rx).is_empty());
    assert_eq!(drain(&mut fresh_rx).len(), 1);
}

#[tokio::test]
async fn test_inbound_subscribe_frame_round_trip() {
    let h = harness();
    let manager_id = UserId::new();
    let property = PropertyId::new();
    h.directory.assign_manager(manager_id, property);

    let (handle, mut rx) = h
        .manager
        .register(&token(manager_id, UserRole::Manager))
        .expect("register");
    drain(&mut rx);

    let frame = format!(r#"{{"type":"subscribe","room":"property:{property}"}}"#);
    h.manager.handle_inbound(&handle.id, &frame).await;

    let frames = drain(&mut rx);
    assert!(matches!(&frames[0], OutboundMessage::Subscribed { room } if room == &format!("property:{property}")));

    // An unauthorized room comes back as an error frame on this
    // connection only; the connection itself stays open.
    let other = PropertyId::new();
    let frame = format!(r#"{{"type":"subscribe","room":"property:{other}"}}"#);
    h.manager.handle_inbound(&handle.id, &frame).await;
    let frames = drain(&mut rx);
    assert!(matches!(&frames[0], OutboundMessage::Error { code, .. } if code == "AUTHORIZATION"));
    assert!(h.manager.pool().get(&handle.id).is_some());
}

#[tokio::test]
async fn test_inbound_heartbeat_frame_acks() {
    let h = harness();
    let (handle, mut rx) = h
        .manager
        .register(&token(UserId::new(), UserRole::Employee))
        .expect("register");
    drain(&mut rx);

    h.manager
        .handle_inbound(&handle.id, r#"{"type":"heartbeat"}"#)
        .await;
    let frames = drain(&mut rx);
    assert!(matches!(frames[0], OutboundMessage::HeartbeatAck));
}
