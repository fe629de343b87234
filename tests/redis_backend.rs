//! Tests against a live Redis server. Run with `cargo test -- --ignored`.

use std::sync::Arc;

use payload::backend::redis::RedisConfig;
use payload::backend::{Namespace, QueueBackend, RedisBackend};
use payload::{
    CallerStatus, CallerUpdate, MemberStatus, MemberUpdate, NewQueueCaller, NewQueueMember,
    QueueCache,
};
use redis::AsyncCommands;
use uuid::Uuid;

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string())
}

async fn backend() -> RedisBackend {
    RedisBackend::connect_url(&redis_url(), RedisConfig::default())
        .await
        .unwrap()
}

fn queue_id() -> String {
    format!("test-{}", Uuid::new_v4())
}

#[tokio::test]
#[ignore] // Requires Redis
async fn key_layout_matches_records() {
    let backend = backend().await;
    let cache = QueueCache::builder()
        .backend(Arc::new(backend.clone()))
        .build()
        .await
        .unwrap();
    let queue_id = queue_id();

    let caller = cache
        .create_queue_caller(&queue_id, NewQueueCaller::with_number("555-1234"))
        .await
        .unwrap();

    let mut conn = backend.pool().get().await.unwrap();
    let main: Vec<String> = conn
        .zrange(format!("queue:{}:callers", queue_id), 0, -1)
        .await
        .unwrap();
    assert_eq!(main, vec![caller.uuid.clone()]);

    let waiting: Vec<String> = conn
        .zrange(format!("queue:{}:callers:status:1", queue_id), 0, -1)
        .await
        .unwrap();
    assert_eq!(waiting, vec![caller.uuid.clone()]);

    let number: String = conn
        .hget(format!("queue:{}:callers:{}", queue_id, caller.uuid), "number")
        .await
        .unwrap();
    assert_eq!(number, "555-1234");
    drop(conn);

    cache.delete_queue_caller(&queue_id, &caller.uuid).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Redis
async fn status_move_and_delete_are_consistent() {
    let backend = backend().await;
    let cache = QueueCache::new(
        Arc::new(backend.clone()),
        Arc::new(payload::notify::NoopNotifier),
    );
    let queue_id = queue_id();

    let first = cache
        .create_queue_caller(&queue_id, NewQueueCaller::default())
        .await
        .unwrap();
    let second = cache
        .create_queue_caller(&queue_id, NewQueueCaller::default())
        .await
        .unwrap();
    assert_eq!(second.position, Some(1));

    cache
        .update_queue_caller(&queue_id, &first.uuid, CallerUpdate::status(CallerStatus::Ringing))
        .await
        .unwrap();

    let ns = Namespace::callers(queue_id.as_str());
    assert_eq!(
        backend.range(&ns, Some("1"), 0, -1).await.unwrap(),
        vec![second.uuid.clone()]
    );
    assert_eq!(
        backend.range(&ns, Some("2"), 0, -1).await.unwrap(),
        vec![first.uuid.clone()]
    );

    let deleted = cache.delete_queue_caller(&queue_id, &first.uuid).await.unwrap();
    assert_eq!(deleted.status, CallerStatus::Ringing);
    assert_eq!(deleted.position, Some(0));
    assert!(backend.range(&ns, Some("2"), 0, -1).await.unwrap().is_empty());
    assert_eq!(
        cache.get_queue_caller(&queue_id, &second.uuid).await.unwrap().position,
        Some(0)
    );

    assert!(!backend
        .update(&ns, "missing", Default::default())
        .await
        .unwrap());
    assert!(backend.load(&ns, "missing").await.unwrap().is_none());

    cache.delete_queue_caller(&queue_id, &second.uuid).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Redis
async fn member_pause_round_trip() {
    let backend = backend().await;
    backend.ping().await.unwrap();
    let cache = QueueCache::new(Arc::new(backend), Arc::new(payload::notify::NoopNotifier));
    let queue_id = queue_id();

    let member = cache
        .create_queue_member(&queue_id, NewQueueMember::with_number("1001"))
        .await
        .unwrap();
    let updated = cache
        .update_queue_member(
            &queue_id,
            &member.uuid,
            MemberUpdate {
                paused: Some(true),
                status: Some(MemberStatus::Connected),
                ..MemberUpdate::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.paused);
    assert!(updated.paused_at > member.paused_at);
    assert_eq!(updated.status, MemberStatus::Connected);

    cache.delete_queue_member(&queue_id, &member.uuid).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Redis
async fn recreate_moves_the_status_entry() {
    let backend = backend().await;
    let cache = QueueCache::new(
        Arc::new(backend.clone()),
        Arc::new(payload::notify::NoopNotifier),
    );
    let queue_id = queue_id();
    let dup = |status| NewQueueCaller {
        uuid: Some("dup".into()),
        status: Some(status),
        ..NewQueueCaller::default()
    };

    cache.create_queue_caller(&queue_id, dup(CallerStatus::Waiting)).await.unwrap();
    cache.create_queue_caller(&queue_id, dup(CallerStatus::Ringing)).await.unwrap();

    let ns = Namespace::callers(queue_id.as_str());
    assert!(backend.range(&ns, Some("1"), 0, -1).await.unwrap().is_empty());
    assert_eq!(backend.range(&ns, Some("2"), 0, -1).await.unwrap(), vec!["dup"]);
    assert_eq!(backend.range(&ns, None, 0, -1).await.unwrap(), vec!["dup"]);

    cache.delete_queue_caller(&queue_id, "dup").await.unwrap();
    assert!(backend.range(&ns, Some("2"), 0, -1).await.unwrap().is_empty());
}
