//! Postgres storage integration tests
//!
//! Run against `TEST_DATABASE_URL`; each test returns early when it is not
//! set so the suite stays green without a database.

#![allow(dead_code)]

mod common;

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use duet_messaging::{
    ContentKind, ConversationStore, NewMessage, Pair, PairCode, PairDirectory, Participant,
    PgConversationStore, PgPairDirectory,
};
use duet_reminders::{PgReminderSource, PgWatermarkStore, ReminderSource, WatermarkStore};
use sqlx::PgPool;
use uuid::Uuid;

use common::TestConfig;

async fn pool() -> Result<Option<PgPool>> {
    let Some(url) = TestConfig::from_env().database_url else {
        eprintln!("TEST_DATABASE_URL not set; skipping Postgres test");
        return Ok(None);
    };

    let pool = PgPool::connect(&url).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;
    Ok(Some(pool))
}

/// Insert a fresh pair with a unique code
async fn seed_pair(pool: &PgPool) -> Result<Pair> {
    let pair = Pair::new(
        PairCode::parse(format!("T{}", Uuid::new_v4().simple()))?,
        Participant::new(Uuid::new_v4(), "Alex", "alex@duet.test"),
        Participant::new(Uuid::new_v4(), "Jordan", "jordan@duet.test"),
    )?;

    sqlx::query(
        r#"
        INSERT INTO pairs (
            id,
            participant_a_id, participant_a_name, participant_a_email,
            participant_b_id, participant_b_name, participant_b_email
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(pair.id.as_str())
    .bind(pair.participant_a.user_id)
    .bind(&pair.participant_a.display_name)
    .bind(&pair.participant_a.email)
    .bind(pair.participant_b.user_id)
    .bind(&pair.participant_b.display_name)
    .bind(&pair.participant_b.email)
    .execute(pool)
    .await?;

    Ok(pair)
}

async fn cleanup(pool: &PgPool, pair: &Pair) -> Result<()> {
    sqlx::query("DELETE FROM pairs WHERE id = $1")
        .bind(pair.id.as_str())
        .execute(pool)
        .await?;
    Ok(())
}

fn draft(pair: &Pair, sender: &Participant, text: &str) -> NewMessage {
    NewMessage::new(pair.id.clone(), sender, ContentKind::Text, text.to_string()).unwrap()
}

#[tokio::test]
async fn test_pair_directory_reads_seeded_pair() -> Result<()> {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let pair = seed_pair(&pool).await?;
    let directory = PgPairDirectory::new(pool.clone());

    let found = directory.find(&pair.id).await?.unwrap();
    assert_eq!(found.participant_a, pair.participant_a);
    assert_eq!(found.participant_b, pair.participant_b);
    assert!(directory
        .find(&PairCode::parse("NO_SUCH_PAIR")?)
        .await?
        .is_none());

    cleanup(&pool, &pair).await
}

#[tokio::test]
async fn test_concurrent_appends_serialize_sequences() -> Result<()> {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let pair = seed_pair(&pool).await?;
    let store = Arc::new(PgConversationStore::new(pool.clone()));

    let mut tasks = Vec::new();
    for sender in [pair.participant_a.clone(), pair.participant_b.clone()] {
        let store = store.clone();
        let pair = pair.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..10 {
                store
                    .append(draft(&pair, &sender, &format!("{} {}", sender.display_name, i)))
                    .await
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await?;
    }

    let page = store.list_page(&pair.id, 0, 100).await?;
    let sequences: Vec<i64> = page.iter().map(|m| m.sequence).collect();
    assert_eq!(sequences, (1..=20).collect::<Vec<_>>());

    cleanup(&pool, &pair).await
}

#[tokio::test]
async fn test_mark_seen_changes_only_unseen_peer_messages() -> Result<()> {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let pair = seed_pair(&pool).await?;
    let store = PgConversationStore::new(pool.clone());
    let alex = &pair.participant_a;
    let jordan = &pair.participant_b;

    store.append(draft(&pair, alex, "one")).await?;
    store.append(draft(&pair, jordan, "reply")).await?;
    store.append(draft(&pair, alex, "two")).await?;

    let up_to = store
        .latest_peer_sequence(&pair.id, jordan.user_id)
        .await?
        .unwrap();
    assert_eq!(up_to, 3);

    let changed = store.mark_seen(&pair.id, up_to, jordan.user_id).await?;
    let sequences: Vec<i64> = changed.iter().map(|m| m.sequence).collect();
    assert_eq!(sequences, vec![1, 3]);
    assert!(changed.iter().all(|m| m.seen && m.seen_at.is_some()));

    // Second call is a no-op
    assert!(store
        .mark_seen(&pair.id, up_to, jordan.user_id)
        .await?
        .is_empty());

    let page = store.list_page(&pair.id, 0, 10).await?;
    assert!(!page[1].seen);

    cleanup(&pool, &pair).await
}

#[tokio::test]
async fn test_reminder_source_and_watermark() -> Result<()> {
    let Some(pool) = pool().await? else {
        return Ok(());
    };
    let pair = seed_pair(&pool).await?;
    let now = Utc::now();
    let reminder_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO reminders (id, pair_id, title, description, due_at, priority, completed)
        VALUES ($1, $2, 'Call mom', '', $3, 'high', FALSE)
        "#,
    )
    .bind(reminder_id)
    .bind(pair.id.as_str())
    .bind(now - Duration::seconds(30))
    .execute(&pool)
    .await?;

    let source = PgReminderSource::new(pool.clone());
    let due = source.due_between(now - Duration::minutes(1), now).await?;
    assert!(due.iter().any(|r| r.id == reminder_id && r.pair_id == pair.id));

    let watermarks = PgWatermarkStore::new(pool.clone());
    let sweep = format!("test_{}", Uuid::new_v4().simple());
    assert!(watermarks.load(&sweep).await?.is_none());
    watermarks.save(&sweep, now).await?;
    watermarks.save(&sweep, now + Duration::seconds(60)).await?;
    let stored = watermarks.load(&sweep).await?.unwrap();
    assert_eq!(
        stored.timestamp_micros(),
        (now + Duration::seconds(60)).timestamp_micros()
    );

    sqlx::query("DELETE FROM sweep_watermarks WHERE sweep = $1")
        .bind(&sweep)
        .execute(&pool)
        .await?;
    cleanup(&pool, &pair).await
}
