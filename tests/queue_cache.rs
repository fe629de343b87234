use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use payload::backend::MemoryBackend;
use payload::notify::{BroadcastNotifier, EventAction, Notifier, NotifyError, QueueEvent};
use payload::{
    CallerStatus, CallerUpdate, MemberStatus, MemberUpdate, NewQueueCaller, NewQueueMember,
    QueueCache, QueueError,
};
use tokio::sync::broadcast;
use uuid::Uuid;

fn cache() -> (QueueCache, broadcast::Receiver<QueueEvent>) {
    let events = BroadcastNotifier::new(64);
    let rx = events.subscribe();
    let cache = QueueCache::new(Arc::new(MemoryBackend::new()), Arc::new(events));
    (cache, rx)
}

fn drain(rx: &mut broadcast::Receiver<QueueEvent>) -> Vec<String> {
    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(event.event);
    }
    names
}

#[tokio::test]
async fn generated_uuids_are_unique_and_supplied_ones_kept() {
    let (cache, _rx) = cache();

    let mut seen = HashSet::new();
    for _ in 0..5 {
        let caller = cache
            .create_queue_caller("q1", NewQueueCaller::default())
            .await
            .unwrap();
        assert!(Uuid::parse_str(&caller.uuid).is_ok());
        assert!(seen.insert(caller.uuid));
    }

    let caller = cache
        .create_queue_caller(
            "q1",
            NewQueueCaller {
                uuid: Some("caller-abc".into()),
                ..NewQueueCaller::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(caller.uuid, "caller-abc");
}

#[tokio::test]
async fn callers_list_in_creation_order_with_matching_positions() {
    let (cache, _rx) = cache();

    let mut created = Vec::new();
    for n in 0..4 {
        let caller = cache
            .create_queue_caller("q1", NewQueueCaller::with_number(format!("555-000{}", n)))
            .await
            .unwrap();
        assert_eq!(caller.position, Some(n));
        created.push(caller.uuid);
    }

    let listed = cache.list_queue_callers("q1", None).await.unwrap();
    let uuids: Vec<_> = listed.iter().map(|c| c.uuid.clone()).collect();
    assert_eq!(uuids, created);
    for (rank, caller) in listed.iter().enumerate() {
        assert_eq!(caller.position, Some(rank as u64));
    }

    // Removing the head moves everybody up.
    cache.delete_queue_caller("q1", &created[0]).await.unwrap();
    let second = cache.get_queue_caller("q1", &created[1]).await.unwrap();
    assert_eq!(second.position, Some(0));
}

#[tokio::test]
async fn status_change_moves_between_status_listings() {
    let (cache, _rx) = cache();

    let caller = cache
        .create_queue_caller("q1", NewQueueCaller::with_number("555-1234"))
        .await
        .unwrap();
    assert_eq!(caller.status, CallerStatus::Waiting);

    let waiting = cache
        .list_queue_callers("q1", Some(CallerStatus::Waiting))
        .await
        .unwrap();
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].uuid, caller.uuid);

    let updated = cache
        .update_queue_caller("q1", &caller.uuid, CallerUpdate::status(CallerStatus::Connected))
        .await
        .unwrap();
    assert_eq!(updated.status, CallerStatus::Connected);
    assert!(updated.status_at > caller.status_at);
    assert_eq!(updated.created_at, caller.created_at);

    assert!(cache
        .list_queue_callers("q1", Some(CallerStatus::Waiting))
        .await
        .unwrap()
        .is_empty());
    let connected = cache
        .list_queue_callers("q1", Some(CallerStatus::Connected))
        .await
        .unwrap();
    assert_eq!(connected.len(), 1);

    let fetched = cache.get_queue_caller("q1", &caller.uuid).await.unwrap();
    assert_eq!(fetched.status, CallerStatus::Connected);
    assert_eq!(fetched.status_at, updated.status_at);
}

#[tokio::test]
async fn status_change_rescores_only_the_status_listing() {
    let (cache, _rx) = cache();
    let a = cache
        .create_queue_caller("q1", NewQueueCaller::default())
        .await
        .unwrap();
    let b = cache
        .create_queue_caller("q1", NewQueueCaller::default())
        .await
        .unwrap();

    for uuid in [&b.uuid, &a.uuid] {
        cache
            .update_queue_caller("q1", uuid, CallerUpdate::status(CallerStatus::Ringing))
            .await
            .unwrap();
    }

    let ringing: Vec<String> = cache
        .list_queue_callers("q1", Some(CallerStatus::Ringing))
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.uuid)
        .collect();
    assert_eq!(ringing, vec![b.uuid.clone(), a.uuid.clone()]);

    let all = cache.list_queue_callers("q1", None).await.unwrap();
    let order: Vec<(&str, Option<u64>)> =
        all.iter().map(|c| (c.uuid.as_str(), c.position)).collect();
    assert_eq!(order, vec![(a.uuid.as_str(), Some(0)), (b.uuid.as_str(), Some(1))]);
}

#[tokio::test]
async fn partial_update_leaves_other_fields() {
    let (cache, _rx) = cache();

    let caller = cache
        .create_queue_caller(
            "q1",
            NewQueueCaller {
                name: Some("Alice".into()),
                number: Some("555-1234".into()),
                ..NewQueueCaller::default()
            },
        )
        .await
        .unwrap();

    let updated = cache
        .update_queue_caller(
            "q1",
            &caller.uuid,
            CallerUpdate {
                member_uuid: Some("m1".into()),
                ..CallerUpdate::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.member_uuid.as_deref(), Some("m1"));
    assert_eq!(updated.name.as_deref(), Some("Alice"));
    assert_eq!(updated.number.as_deref(), Some("555-1234"));
    assert_eq!(updated.status, caller.status);
    assert_eq!(updated.status_at, caller.status_at);
}

#[tokio::test]
async fn status_listing_is_capped_by_default() {
    let (cache, _rx) = cache();
    for _ in 0..3 {
        cache
            .create_queue_caller("q1", NewQueueCaller::default())
            .await
            .unwrap();
    }

    let waiting = cache
        .list_queue_callers("q1", Some(CallerStatus::Waiting))
        .await
        .unwrap();
    assert_eq!(waiting.len(), 2);
    assert_eq!(waiting[0].position, Some(0));

    let uncapped = cache.clone().with_status_list_limit(None);
    assert_eq!(
        uncapped
            .list_queue_callers("q1", Some(CallerStatus::Waiting))
            .await
            .unwrap()
            .len(),
        3
    );
    assert_eq!(cache.list_queue_callers("q1", None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn huge_status_limit_returns_everything() {
    let (cache, _rx) = cache();
    let cache = cache.with_status_list_limit(Some(usize::MAX));
    for _ in 0..3 {
        cache
            .create_queue_caller("q1", NewQueueCaller::default())
            .await
            .unwrap();
    }

    let waiting = cache
        .list_queue_callers("q1", Some(CallerStatus::Waiting))
        .await
        .unwrap();
    assert_eq!(waiting.len(), 3);
}

#[tokio::test]
async fn delete_removes_from_every_listing() {
    let (cache, _rx) = cache();

    let caller = cache
        .create_queue_caller("q1", NewQueueCaller::with_number("555-1234"))
        .await
        .unwrap();
    let deleted = cache.delete_queue_caller("q1", &caller.uuid).await.unwrap();
    assert_eq!(deleted.uuid, caller.uuid);

    assert!(cache.list_queue_callers("q1", None).await.unwrap().is_empty());
    assert!(cache
        .list_queue_callers("q1", Some(CallerStatus::Waiting))
        .await
        .unwrap()
        .is_empty());

    let err = cache.get_queue_caller("q1", &caller.uuid).await.unwrap_err();
    assert!(matches!(err, QueueError::CallerNotFound { .. }));
}

#[tokio::test]
async fn recreating_with_another_status_leaves_the_old_listing() {
    let (cache, _rx) = cache();
    let dup = |status| NewQueueCaller {
        uuid: Some("dup".into()),
        status: Some(status),
        ..NewQueueCaller::default()
    };

    cache
        .create_queue_caller("q1", dup(CallerStatus::Waiting))
        .await
        .unwrap();
    let recreated = cache
        .create_queue_caller("q1", dup(CallerStatus::Ringing))
        .await
        .unwrap();
    assert_eq!(recreated.status, CallerStatus::Ringing);

    assert!(cache
        .list_queue_callers("q1", Some(CallerStatus::Waiting))
        .await
        .unwrap()
        .is_empty());
    let ringing = cache
        .list_queue_callers("q1", Some(CallerStatus::Ringing))
        .await
        .unwrap();
    assert_eq!(ringing.len(), 1);
    assert_eq!(ringing[0].uuid, "dup");

    // No stale entry may hold one of the two capped WAITING slots.
    cache.delete_queue_caller("q1", "dup").await.unwrap();
    for _ in 0..2 {
        cache
            .create_queue_caller("q1", NewQueueCaller::default())
            .await
            .unwrap();
    }
    let waiting = cache
        .list_queue_callers("q1", Some(CallerStatus::Waiting))
        .await
        .unwrap();
    assert_eq!(waiting.len(), 2);
    assert!(waiting.iter().all(|c| c.status == CallerStatus::Waiting));
}

#[tokio::test]
async fn missing_entities_are_not_found() {
    let (cache, mut rx) = cache();

    let err = cache.get_queue_caller("q1", "nope").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(
        cache.delete_queue_caller("q1", "nope").await,
        Err(QueueError::CallerNotFound { .. })
    ));
    assert!(matches!(
        cache
            .update_queue_caller("q1", "nope", CallerUpdate::status(CallerStatus::Ringing))
            .await,
        Err(QueueError::CallerNotFound { .. })
    ));
    assert!(matches!(
        cache.get_queue_member("q1", "nope").await,
        Err(QueueError::MemberNotFound { .. })
    ));
    assert!(matches!(
        cache.delete_queue_member("q1", "nope").await,
        Err(QueueError::MemberNotFound { .. })
    ));

    // An update on a missing caller must not resurrect it.
    assert!(cache.list_queue_callers("q1", None).await.unwrap().is_empty());
    assert!(cache
        .list_queue_callers("q1", Some(CallerStatus::Ringing))
        .await
        .unwrap()
        .is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn queues_are_isolated() {
    let (cache, _rx) = cache();

    let caller = cache
        .create_queue_caller("q1", NewQueueCaller::default())
        .await
        .unwrap();
    assert!(cache.list_queue_callers("q2", None).await.unwrap().is_empty());
    assert!(cache.get_queue_caller("q2", &caller.uuid).await.is_err());
}

#[tokio::test]
async fn members_track_pause_and_status() {
    let (cache, _rx) = cache();

    let member = cache
        .create_queue_member("q1", NewQueueMember::with_number("1001"))
        .await
        .unwrap();
    assert!(!member.paused);
    assert_eq!(member.paused_at, member.created_at);
    assert_eq!(member.status, MemberStatus::Waiting);

    let paused = cache
        .update_queue_member(
            "q1",
            &member.uuid,
            MemberUpdate {
                paused: Some(true),
                ..MemberUpdate::default()
            },
        )
        .await
        .unwrap();
    assert!(paused.paused);
    assert!(paused.paused_at > member.paused_at);
    assert_eq!(paused.number, "1001");

    let ringing = cache
        .update_queue_member("q1", &member.uuid, MemberUpdate::status(MemberStatus::Ringing))
        .await
        .unwrap();
    assert_eq!(ringing.status, MemberStatus::Ringing);
    assert_eq!(ringing.paused_at, paused.paused_at);

    let listed = cache
        .list_queue_members("q1", Some(MemberStatus::Ringing))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert!(cache
        .list_queue_members("q1", Some(MemberStatus::Waiting))
        .await
        .unwrap()
        .is_empty());

    cache.delete_queue_member("q1", &member.uuid).await.unwrap();
    assert!(cache.list_queue_members("q1", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn callers_and_members_do_not_share_keys() {
    let (cache, _rx) = cache();

    let caller = cache
        .create_queue_caller(
            "q1",
            NewQueueCaller {
                uuid: Some("same".into()),
                ..NewQueueCaller::default()
            },
        )
        .await
        .unwrap();
    let member = cache
        .create_queue_member(
            "q1",
            NewQueueMember {
                uuid: Some("same".into()),
                ..NewQueueMember::with_number("1001")
            },
        )
        .await
        .unwrap();

    cache.delete_queue_member("q1", &member.uuid).await.unwrap();
    assert_eq!(
        cache.get_queue_caller("q1", "same").await.unwrap().uuid,
        caller.uuid
    );
}

#[tokio::test]
async fn mutations_emit_events_after_storage() {
    let (cache, mut rx) = cache();

    let caller = cache
        .create_queue_caller("q1", NewQueueCaller::with_number("555-1234"))
        .await
        .unwrap();
    cache
        .update_queue_caller("q1", &caller.uuid, CallerUpdate::status(CallerStatus::Ringing))
        .await
        .unwrap();
    cache.delete_queue_caller("q1", &caller.uuid).await.unwrap();
    let member = cache
        .create_queue_member("q1", NewQueueMember::with_number("1001"))
        .await
        .unwrap();
    cache.delete_queue_member("q1", &member.uuid).await.unwrap();

    assert_eq!(
        drain(&mut rx),
        vec![
            "queue.caller.create",
            "queue.caller.update",
            "queue.caller.delete",
            "queue.member.create",
            "queue.member.delete",
        ]
    );
}

#[tokio::test]
async fn delete_event_carries_pre_delete_snapshot() {
    let (cache, mut rx) = cache();

    let caller = cache
        .create_queue_caller("q1", NewQueueCaller::with_number("555-1234"))
        .await
        .unwrap();
    let _ = rx.recv().await.unwrap();

    cache.delete_queue_caller("q1", &caller.uuid).await.unwrap();
    let event = rx.recv().await.unwrap();
    assert_eq!(event.action, EventAction::Delete);
    assert_eq!(event.queue_id, "q1");
    assert_eq!(event.uuid, caller.uuid);
    assert_eq!(event.payload["number"], "555-1234");
    assert_eq!(event.payload["status"], 1);
}

struct Unreachable;

#[async_trait]
impl Notifier for Unreachable {
    async fn notify(&self, _event: QueueEvent) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("connection refused".into()))
    }
}

#[tokio::test]
async fn notify_failure_is_reported_after_the_write() {
    let cache = QueueCache::new(Arc::new(MemoryBackend::new()), Arc::new(Unreachable));

    let err = cache
        .create_queue_caller(
            "q1",
            NewQueueCaller {
                uuid: Some("c1".into()),
                ..NewQueueCaller::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::Notify(_)));

    // The caller was stored before the event failed.
    assert!(cache.get_queue_caller("q1", "c1").await.is_ok());
}

#[tokio::test]
async fn builder_accepts_an_explicit_backend() {
    let cache = QueueCache::builder()
        .backend(Arc::new(MemoryBackend::new()))
        .status_list_limit(Some(1))
        .build()
        .await
        .unwrap();

    assert_eq!(cache.status_list_limit(), Some(1));
    cache.ping().await.unwrap();
}
