// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Completion ledger integration tests (Firestore emulator).
//!
//! The central contract: at most one completion record exists per
//! `(habit, day)`, even under concurrent duplicate requests, and the
//! losing writer observes success.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::Duration;
use tower::ServiceExt;

use habitflow::db::firestore::generate_id;
use habitflow::db::FirestoreDb;
use habitflow::models::{Completion, Habit, User};
use habitflow::time_utils::{day_key, now_rfc3339, today_utc};

mod common;

async fn seed_user(db: &FirestoreDb) -> String {
    let id = generate_id().unwrap();
    let user = User {
        id: id.clone(),
        name: "Ledger Tester".to_string(),
        email: format!("{}@example.com", id),
        password_salt: "00".to_string(),
        password_hash: "00".to_string(),
        avatar_url: None,
        bio: None,
        theme_preference: "light".to_string(),
        created_at: now_rfc3339(),
    };
    db.create_user(&user).await.expect("Failed to seed user");
    id
}

async fn seed_habit(db: &FirestoreDb, user_id: &str, title: &str) -> Habit {
    let habit = Habit {
        id: generate_id().unwrap(),
        user_id: user_id.to_string(),
        title: title.to_string(),
        description: String::new(),
        frequency: "daily".to_string(),
        color: "#6366f1".to_string(),
        schedule_days: vec![],
        reminder_time: None,
        order: 0,
        created_at: now_rfc3339(),
    };
    db.create_habit(&habit).await.expect("Failed to seed habit");
    habit
}

fn completion_for(habit_id: &str, user_id: &str, day: chrono::NaiveDate) -> Completion {
    let key = day_key(day);
    Completion {
        id: Completion::doc_id(habit_id, &key),
        habit_id: habit_id.to_string(),
        user_id: user_id.to_string(),
        completed_on: key,
        created_at: now_rfc3339(),
    }
}

#[tokio::test]
async fn test_duplicate_record_is_idempotent() {
    require_emulator!();

    let db = common::test_db().await;
    let user_id = seed_user(&db).await;
    let habit = seed_habit(&db, &user_id, "Read").await;

    let completion = completion_for(&habit.id, &user_id, today_utc());

    let first = db.insert_completion(&completion).await.unwrap();
    let second = db.insert_completion(&completion).await.unwrap();

    assert!(first, "First write should create the record");
    assert!(!second, "Second write should be an idempotent no-op");

    let all = db.completions_for_user(&user_id).await.unwrap();
    assert_eq!(all.len(), 1, "Exactly one record must persist");
}

#[tokio::test]
async fn test_concurrent_duplicates_leave_one_record() {
    require_emulator!();

    const NUM_CONCURRENT_WRITERS: usize = 10;

    let db = common::test_db().await;
    let user_id = seed_user(&db).await;
    let habit = seed_habit(&db, &user_id, "Meditate").await;

    let completion = completion_for(&habit.id, &user_id, today_utc());

    let mut handles = vec![];
    for _ in 0..NUM_CONCURRENT_WRITERS {
        let db_clone = db.clone();
        let completion = completion.clone();
        handles.push(tokio::spawn(async move {
            db_clone.insert_completion(&completion).await
        }));
    }

    let mut created_count = 0;
    for handle in handles {
        let created = handle
            .await
            .expect("Task join failed")
            .expect("Ledger write failed");
        if created {
            created_count += 1;
        }
    }

    assert_eq!(created_count, 1, "Exactly one writer must win");

    let all = db.completions_for_user(&user_id).await.unwrap();
    assert_eq!(all.len(), 1, "Concurrent duplicates must leave one record");
}

#[tokio::test]
async fn test_distinct_days_create_distinct_records() {
    require_emulator!();

    let db = common::test_db().await;
    let user_id = seed_user(&db).await;
    let habit = seed_habit(&db, &user_id, "Run").await;

    let today = today_utc();
    for offset in 0..3 {
        let completion = completion_for(&habit.id, &user_id, today - Duration::days(offset));
        let created = db.insert_completion(&completion).await.unwrap();
        assert!(created);
    }

    let all = db.completions_for_user(&user_id).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_cascade_delete_removes_ledger_records() {
    require_emulator!();

    let db = common::test_db().await;
    let user_id = seed_user(&db).await;
    let keep = seed_habit(&db, &user_id, "Keep").await;
    let doomed = seed_habit(&db, &user_id, "Doomed").await;

    let today = today_utc();
    for offset in 0..3 {
        let completion = completion_for(&doomed.id, &user_id, today - Duration::days(offset));
        db.insert_completion(&completion).await.unwrap();
    }
    db.insert_completion(&completion_for(&keep.id, &user_id, today))
        .await
        .unwrap();

    let removed = db.delete_habit_cascade(&doomed.id).await.unwrap();
    assert_eq!(removed, 3);

    let remaining = db.completions_for_user(&user_id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].habit_id, keep.id);
}

// ─── Endpoint-level checks ───────────────────────────────────

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_complete_endpoint_reports_created_flag() {
    require_emulator!();

    let (app, state) = common::create_emulator_app().await;
    let user_id = seed_user(&state.db).await;
    let habit = seed_habit(&state.db, &user_id, "Journal").await;
    let token = common::auth_token(&user_id);

    for (attempt, expected_created) in [(1, true), (2, false)] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/habits/{}/complete", habit.id))
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            StatusCode::OK,
            "Attempt {} must report success",
            attempt
        );
        let body = json_body(response).await;
        assert_eq!(body["created"], expected_created, "Attempt {}", attempt);
    }
}

#[tokio::test]
async fn test_complete_endpoint_unknown_habit() {
    require_emulator!();

    let (app, state) = common::create_emulator_app().await;
    let user_id = seed_user(&state.db).await;
    let token = common::auth_token(&user_id);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/habits/{}/complete", generate_id().unwrap()))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_complete_endpoint_rejects_foreign_habit() {
    require_emulator!();

    let (app, state) = common::create_emulator_app().await;
    let owner_id = seed_user(&state.db).await;
    let intruder_id = seed_user(&state.db).await;
    let habit = seed_habit(&state.db, &owner_id, "Private").await;
    let token = common::auth_token(&intruder_id);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/habits/{}/complete", habit.id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Not owned by the caller: indistinguishable from absent
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let facts = state.db.completions_for_user(&intruder_id).await.unwrap();
    assert!(facts.is_empty());
}
