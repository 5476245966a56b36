//! PostgreSQL store tests.
//!
//! These run against the database in `TEST_DATABASE_URL` and are skipped when
//! it is not set.

use std::sync::Arc;

use chrono::Utc;
use domain::errors::DomainError;
use domain::models::{CreatePollRequest, NewPoll, NewVote, OptionInput};
use domain::services::{IdentityProvider, OptionStore, PollStore, VoteLedger};
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use persistence::db::{create_pool, run_migrations, DatabaseConfig};
use persistence::PgStore;
use uuid::Uuid;

async fn test_store() -> Option<Arc<PgStore>> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = create_pool(&DatabaseConfig {
        url,
        max_connections: 10,
        min_connections: 1,
        connect_timeout_secs: 10,
        idle_timeout_secs: 60,
    })
    .await
    .expect("Failed to connect to test database");
    run_migrations(&pool).await.expect("Failed to run migrations");
    Some(Arc::new(PgStore::new(pool)))
}

async fn new_poll(store: &PgStore, options: &[&str]) -> NewPoll {
    let creator = store.get_or_create_identity(None).await.unwrap();
    let title: String = Sentence(2..5).fake();
    NewPoll::from_request(
        CreatePollRequest {
            title,
            description: Some("integration".to_string()),
            options: options.iter().map(|o| OptionInput::Text(o.to_string())).collect(),
            anonymous: true,
            ttl_hours: 24,
        },
        creator.identity.id,
        Utc::now(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_create_poll_persists_options_in_order() {
    let Some(store) = test_store().await else {
        return;
    };
    let new_poll = new_poll(&store, &["red", "green", "blue"]).await;
    let (poll, _) = store.create_poll(&new_poll).await.unwrap();

    let fetched = store.get_poll(poll.id).await.unwrap().unwrap();
    assert_eq!(fetched.title, new_poll.title);
    assert_eq!(fetched.total_votes, 0);

    let options = store.list_options(poll.id).await.unwrap();
    let texts: Vec<_> = options.iter().map(|o| o.text.as_str()).collect();
    assert_eq!(texts, vec!["red", "green", "blue"]);
}

#[tokio::test]
async fn test_conditional_insert_rejects_second_vote() {
    let Some(store) = test_store().await else {
        return;
    };
    let (poll, options) = store
        .create_poll(&new_poll(&store, &["a", "b"]).await)
        .await
        .unwrap();
    let voter = store.get_or_create_identity(None).await.unwrap().identity.id;

    let first = store
        .cast_vote(NewVote {
            poll_id: poll.id,
            option_id: options[0].id,
            voter_id: voter,
        })
        .await
        .unwrap();
    let err = store
        .cast_vote(NewVote {
            poll_id: poll.id,
            option_id: options[1].id,
            voter_id: voter,
        })
        .await
        .unwrap_err();

    match err {
        DomainError::AlreadyVoted { existing, .. } => {
            assert_eq!(existing.map(|v| v.id), Some(first.id))
        }
        other => panic!("Expected AlreadyVoted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrent_votes_same_voter() {
    let Some(store) = test_store().await else {
        return;
    };
    let (poll, options) = store
        .create_poll(&new_poll(&store, &["a", "b"]).await)
        .await
        .unwrap();
    let voter = store.get_or_create_identity(None).await.unwrap().identity.id;

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        let option_id = options[i % 2].id;
        handles.push(tokio::spawn(async move {
            store
                .cast_vote(NewVote {
                    poll_id: poll.id,
                    option_id,
                    voter_id: voter,
                })
                .await
        }));
    }

    let mut committed = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            committed += 1;
        }
    }
    assert_eq!(committed, 1);
}

#[tokio::test]
async fn test_option_from_other_poll_violates_composite_key() {
    let Some(store) = test_store().await else {
        return;
    };
    let (poll, _) = store
        .create_poll(&new_poll(&store, &["a", "b"]).await)
        .await
        .unwrap();
    let (_, foreign) = store
        .create_poll(&new_poll(&store, &["x", "y"]).await)
        .await
        .unwrap();
    let voter = store.get_or_create_identity(None).await.unwrap().identity.id;

    let err = store
        .cast_vote(NewVote {
            poll_id: poll.id,
            option_id: foreign[0].id,
            voter_id: voter,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::OptionNotFound { .. }));
}

#[tokio::test]
async fn test_counters_and_drift() {
    let Some(store) = test_store().await else {
        return;
    };
    let (poll, options) = store
        .create_poll(&new_poll(&store, &["a", "b"]).await)
        .await
        .unwrap();
    let voter = store.get_or_create_identity(None).await.unwrap().identity.id;
    store
        .cast_vote(NewVote {
            poll_id: poll.id,
            option_id: options[1].id,
            voter_id: voter,
        })
        .await
        .unwrap();

    let drifted = store.drifted_poll_ids(10_000).await.unwrap();
    assert!(drifted.contains(&poll.id));

    let counts = store.count_by_option(poll.id).await.unwrap();
    assert_eq!(counts, vec![(options[1].id, 1)]);

    let option = store.increment_vote_count(options[1].id).await.unwrap();
    assert_eq!(option.vote_count, 1);
    let updated = store.increment_total_votes(poll.id).await.unwrap();
    assert_eq!(updated.total_votes, 1);

    let drifted = store.drifted_poll_ids(10_000).await.unwrap();
    assert!(!drifted.contains(&poll.id));
}

#[tokio::test]
async fn test_recount_reads_ledger_in_place() {
    let Some(store) = test_store().await else {
        return;
    };
    let (poll, options) = store
        .create_poll(&new_poll(&store, &["a", "b"]).await)
        .await
        .unwrap();
    for _ in 0..2 {
        let voter = store.get_or_create_identity(None).await.unwrap().identity.id;
        store
            .cast_vote(NewVote {
                poll_id: poll.id,
                option_id: options[0].id,
                voter_id: voter,
            })
            .await
            .unwrap();
    }

    let option = store.recount_vote_count(options[0].id).await.unwrap();
    assert_eq!(option.vote_count, 2);
    let untouched = store.recount_vote_count(options[1].id).await.unwrap();
    assert_eq!(untouched.vote_count, 0);
    let updated = store.recount_total_votes(poll.id).await.unwrap();
    assert_eq!(updated.total_votes, 2);

    let drifted = store.drifted_poll_ids(10_000).await.unwrap();
    assert!(!drifted.contains(&poll.id));
}

#[tokio::test]
async fn test_identity_round_trip_and_close() {
    let Some(store) = test_store().await else {
        return;
    };
    let issued = store.get_or_create_identity(None).await.unwrap();
    let again = store
        .get_or_create_identity(Some(&issued.session_token))
        .await
        .unwrap();
    assert!(!again.created);
    assert_eq!(again.identity.id, issued.identity.id);
    assert!(again.identity.last_seen_at >= issued.identity.last_seen_at);

    let (poll, _) = store
        .create_poll(&new_poll(&store, &["a", "b"]).await)
        .await
        .unwrap();
    let closed = store.close_poll(poll.id).await.unwrap();
    assert_eq!(closed.status, domain::models::PollStatus::Closed);
    assert!(matches!(
        store.close_poll(Uuid::new_v4()).await,
        Err(DomainError::PollNotFound(_))
    ));
}
