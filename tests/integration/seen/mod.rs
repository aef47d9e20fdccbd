//! Seen-state reconciliation scenarios

use duet_messaging::{ConnectOptions, ServerEvent};

use crate::common::TestApp;

fn seen_updates(events: &[ServerEvent]) -> Vec<i64> {
    events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::SeenUpdate { sequence, seen, .. } => {
                assert!(*seen);
                Some(*sequence)
            }
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_three_offline_messages_then_mark_seen_twice() {
    let app = TestApp::new();
    let mut alex = app.connect(app.alex()).await;

    for text in ["one", "two", "three"] {
        alex.send_text(text).await;
    }
    alex.drain();

    let mut jordan = app.connect(app.jordan()).await;
    jordan.mark_seen().await;
    assert_eq!(seen_updates(&alex.events()), vec![1, 2, 3]);

    jordan.mark_seen().await;
    assert!(seen_updates(&alex.events()).is_empty());
}

#[tokio::test]
async fn test_mark_seen_is_idempotent() {
    let app = TestApp::new();
    let mut alex = app.connect(app.alex()).await;
    alex.send_text("hi").await;

    let first = app
        .messaging
        .seen
        .handle_mark_seen(&app.pair.id, app.jordan().user_id)
        .await
        .unwrap();
    let second = app
        .messaging
        .seen
        .handle_mark_seen(&app.pair.id, app.jordan().user_id)
        .await
        .unwrap();

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
}

#[tokio::test]
async fn test_seen_never_reverts() {
    let app = TestApp::new();
    let mut alex = app.connect(app.alex()).await;
    let mut jordan = app.connect(app.jordan()).await;

    alex.send_text("first").await;
    jordan.mark_seen().await;

    let before = app.stored();
    assert!(before[0].seen);
    let first_seen_at = before[0].seen_at;

    // More traffic in both directions and repeated reconciliation
    jordan.send_text("reply").await;
    alex.mark_seen().await;
    alex.send_text("second").await;
    jordan.mark_seen().await;
    jordan.mark_seen().await;
    alex.mark_seen().await;

    let after = app.stored();
    assert_eq!(after.len(), 3);
    assert!(after.iter().all(|m| m.seen));
    assert_eq!(after[0].seen_at, first_seen_at);
}

#[tokio::test]
async fn test_mark_seen_ignores_own_messages() {
    let app = TestApp::new();
    let mut alex = app.connect(app.alex()).await;
    let mut jordan = app.connect(app.jordan()).await;

    alex.send_text("mine").await;
    alex.mark_seen().await;

    assert!(!app.stored()[0].seen);
    assert!(seen_updates(&alex.events()).is_empty());
    assert!(seen_updates(&jordan.events()).is_empty());
}

#[tokio::test]
async fn test_offline_sender_reads_seen_state_through_backfill() {
    let app = TestApp::new();
    let mut alex = app.connect(app.alex()).await;
    alex.send_text("while you were out").await;
    drop(alex);

    let mut jordan = app.connect(app.jordan()).await;
    jordan.mark_seen().await;

    // Alex comes back; no queued seen_update, the replayed message is seen
    let mut alex = app.connect(app.alex()).await;
    let events = alex.events();
    assert!(seen_updates(&events).is_empty());
    assert!(matches!(
        events.as_slice(),
        [ServerEvent::Message(m)] if m.is_historical && m.seen && m.seen_at.is_some()
    ));
}

#[tokio::test]
async fn test_foreground_connect_marks_pending_messages_seen() {
    let app = TestApp::new();
    let mut alex = app.connect(app.alex()).await;
    alex.send_text("one").await;
    alex.send_text("two").await;
    alex.drain();

    let _jordan = app
        .connect_with(
            app.jordan(),
            ConnectOptions {
                since: None,
                foreground: true,
            },
        )
        .await;

    assert_eq!(seen_updates(&alex.events()), vec![1, 2]);
}
