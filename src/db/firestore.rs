// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile + credential storage)
//! - Habits (definitions, ordering)
//! - Completions (the append-only completion ledger)
//!
//! The completion ledger enforces at-most-one record per `(habit, day)`
//! by deriving the document ID from the pair and writing with
//! insert-only semantics. A conflict means the day was already recorded
//! and is reported as such, never surfaced as an error.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Completion, Habit, User};
use futures_util::{stream, StreamExt};

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing async-trait
        // or a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Look up a user by email (lowercased before storage).
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let mut users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("email").eq(email.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.pop())
    }

    /// Create a new user document.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Overwrite a user document (profile updates).
    pub async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Habit Operations ────────────────────────────────────────

    /// Get a habit by ID (no ownership check; callers scope by user).
    pub async fn get_habit(&self, habit_id: &str) -> Result<Option<Habit>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::HABITS)
            .obj()
            .one(habit_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a habit only if it exists and belongs to `user_id`.
    pub async fn get_habit_for_user(
        &self,
        user_id: &str,
        habit_id: &str,
    ) -> Result<Option<Habit>, AppError> {
        Ok(self
            .get_habit(habit_id)
            .await?
            .filter(|h| h.user_id == user_id))
    }

    /// List all habits for a user, in display order.
    pub async fn habits_for_user(&self, user_id: &str) -> Result<Vec<Habit>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::HABITS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .order_by([
                ("order", firestore::FirestoreQueryDirection::Ascending),
                ("created_at", firestore::FirestoreQueryDirection::Descending),
            ])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Next display order for a new habit (one past the current highest).
    pub async fn next_habit_order(&self, user_id: &str) -> Result<u32, AppError> {
        let user_id = user_id.to_string();
        let highest: Vec<Habit> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::HABITS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .order_by([("order", firestore::FirestoreQueryDirection::Descending)])
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(highest.first().map(|h| h.order + 1).unwrap_or(0))
    }

    /// Create a new habit document.
    pub async fn create_habit(&self, habit: &Habit) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::HABITS)
            .document_id(&habit.id)
            .object(habit)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Overwrite a habit document.
    pub async fn update_habit(&self, habit: &Habit) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::HABITS)
            .document_id(&habit.id)
            .object(habit)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Persist a new display order for a set of habits.
    ///
    /// Uses concurrent writes with a limit to avoid overloading Firestore.
    pub async fn reorder_habits(&self, habits: &[Habit]) -> Result<(), AppError> {
        let client = self.get_client()?;

        stream::iter(habits.to_vec())
            .map(|habit| async move {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::HABITS)
                    .document_id(&habit.id)
                    .object(&habit)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                Ok::<_, AppError>(())
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(())
    }

    /// Delete a habit and cascade to all of its completions.
    ///
    /// Returns the number of completion records removed.
    pub async fn delete_habit_cascade(&self, habit_id: &str) -> Result<usize, AppError> {
        // Delete the habit document first so the habit disappears from
        // list/analytics responses even if the cascade is interrupted.
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::HABITS)
            .document_id(habit_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let owned_id = habit_id.to_string();
        let completions: Vec<Completion> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::COMPLETIONS)
            .filter(move |q| q.for_all([q.field("habit_id").eq(owned_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let count = completions.len();
        self.batch_delete(&completions, collections::COMPLETIONS, |c: &Completion| {
            c.id.clone()
        })
        .await?;

        tracing::info!(habit_id, completions = count, "Habit deleted with cascade");

        Ok(count)
    }

    // ─── Completion Ledger ───────────────────────────────────────

    /// Record a completion for `(habit, day)` if none exists.
    ///
    /// The write is an insert-only create against the document ID
    /// `{habit_id}_{day}`, so under concurrent duplicate requests
    /// exactly one record persists. Losing writers observe the
    /// already-exists conflict, which is reported as `Ok(false)`,
    /// not an error.
    ///
    /// Returns `true` if a new record was created, `false` if the day
    /// was already recorded.
    pub async fn insert_completion(&self, completion: &Completion) -> Result<bool, AppError> {
        let result: Result<(), firestore::errors::FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::COMPLETIONS)
            .document_id(&completion.id)
            .object(completion)
            .execute()
            .await;

        match result {
            Ok(()) => Ok(true),
            Err(firestore::errors::FirestoreError::DataConflictError(_)) => {
                tracing::debug!(
                    habit_id = %completion.habit_id,
                    day = %completion.completed_on,
                    "Completion already recorded (idempotent skip)"
                );
                Ok(false)
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// All completions for a user (used for all-time rankings).
    pub async fn completions_for_user(&self, user_id: &str) -> Result<Vec<Completion>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::COMPLETIONS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Completions for a user on or after a day key.
    ///
    /// Day keys are ISO `YYYY-MM-DD` strings, so the range filter is a
    /// lexicographic comparison on `completed_on`.
    pub async fn completions_since(
        &self,
        user_id: &str,
        since_day: &str,
    ) -> Result<Vec<Completion>, AppError> {
        let user_id = user_id.to_string();
        let since_day = since_day.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::COMPLETIONS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("completed_on")
                        .greater_than_or_equal(since_day.clone()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Most recent completions for a user, newest first.
    pub async fn recent_completions(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<Completion>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::COMPLETIONS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .order_by([(
                "completed_on",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}

/// Generate a random 16-byte hex document ID.
pub fn generate_id() -> Result<String, AppError> {
    use ring::rand::SecureRandom;

    let rng = ring::rand::SystemRandom::new();
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes)
        .map_err(|_| AppError::Database("Failed to generate document ID".to_string()))?;

    Ok(hex::encode(bytes))
}
