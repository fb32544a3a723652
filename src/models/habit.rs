// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Habit and completion models for storage and API.

use serde::{Deserialize, Serialize};

/// Habit definition stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    /// Random hex ID (also used as document ID)
    pub id: String,
    /// Owning user ID
    pub user_id: String,
    /// Display title
    pub title: String,
    /// Longer description
    #[serde(default)]
    pub description: String,
    /// Intended cadence: "daily", "weekly", or "custom"
    #[serde(default = "default_frequency")]
    pub frequency: String,
    /// Display color (hex)
    #[serde(default = "default_color")]
    pub color: String,
    /// Scheduled days for custom frequency, e.g. ["mon", "wed"]
    #[serde(default)]
    pub schedule_days: Vec<String>,
    /// Reminder time of day, e.g. "07:00"
    pub reminder_time: Option<String>,
    /// Position in the user's habit list
    #[serde(default)]
    pub order: u32,
    /// When the habit was created (RFC3339)
    pub created_at: String,
}

pub fn default_frequency() -> String {
    "daily".to_string()
}

pub fn default_color() -> String {
    "#6366f1".to_string()
}

/// One completion fact: a habit was completed on a calendar day.
///
/// The document ID is `{habit_id}_{completed_on}`, which makes the
/// `(habit, day)` pair unique at the storage layer. Records are
/// immutable once written and are deleted only when their habit is
/// deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Document ID: `{habit_id}_{completed_on}`
    pub id: String,
    /// Completed habit
    pub habit_id: String,
    /// Owning user (denormalized for analytics queries)
    pub user_id: String,
    /// Calendar day key, `YYYY-MM-DD` (no time component)
    pub completed_on: String,
    /// When the record was written (RFC3339)
    pub created_at: String,
}

impl Completion {
    /// Derive the document ID enforcing at-most-one-per-day.
    pub fn doc_id(habit_id: &str, day_key: &str) -> String {
        format!("{}_{}", habit_id, day_key)
    }
}
