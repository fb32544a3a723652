// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Habit CRUD, the completion ledger endpoint, and analytics.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{Datelike, Duration};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::firestore::generate_id;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::habit::{default_color, default_frequency};
use crate::models::{Completion, Habit};
use crate::services::analytics::{
    self, SeriesPoint, TopHabit, SERIES_DAYS, STREAK_LOOKBACK_DAYS, TOP_HABITS_LIMIT,
};
use crate::time_utils::{day_key, month_start, parse_day_key, now_rfc3339, today_utc};
use crate::AppState;

/// Timeline length (most recent completions).
const TIMELINE_LIMIT: u32 = 15;

/// Habit routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/habits", get(list_habits).post(create_habit))
        .route("/api/habits/reorder", post(reorder_habits))
        .route("/api/habits/{id}", put(update_habit).delete(delete_habit))
        .route("/api/habits/{id}/complete", post(record_completion))
        .route("/api/habits/analytics/overview", get(analytics_overview))
        .route("/api/habits/analytics/timeline", get(timeline))
}

// ─── Habit CRUD ──────────────────────────────────────────────

/// Create/update payload shared by POST and PUT.
#[derive(Deserialize)]
pub struct HabitPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub frequency: Option<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub schedule_days: Vec<String>,
    pub reminder_time: Option<String>,
}

impl HabitPayload {
    fn validated_title(&self) -> Result<String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AppError::BadRequest("Title is required".to_string()));
        }
        Ok(title.to_string())
    }
}

/// List the user's habits in display order.
async fn list_habits(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Habit>>> {
    let habits = state.db.habits_for_user(&user.user_id).await?;
    Ok(Json(habits))
}

/// Create a habit at the end of the user's list.
async fn create_habit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<HabitPayload>,
) -> Result<(StatusCode, Json<Habit>)> {
    let title = payload.validated_title()?;
    let order = state.db.next_habit_order(&user.user_id).await?;

    let habit = Habit {
        id: generate_id()?,
        user_id: user.user_id.clone(),
        title,
        description: payload.description,
        frequency: payload.frequency.unwrap_or_else(default_frequency),
        color: payload.color.unwrap_or_else(default_color),
        schedule_days: payload.schedule_days,
        reminder_time: payload.reminder_time,
        order,
        created_at: now_rfc3339(),
    };

    state.db.create_habit(&habit).await?;

    tracing::info!(user_id = %user.user_id, habit_id = %habit.id, "Habit created");

    Ok((StatusCode::CREATED, Json(habit)))
}

/// Update a habit's definition (not its order or completions).
async fn update_habit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(habit_id): Path<String>,
    Json(payload): Json<HabitPayload>,
) -> Result<Json<Habit>> {
    let title = payload.validated_title()?;

    let mut habit = state
        .db
        .get_habit_for_user(&user.user_id, &habit_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Habit not found".to_string()))?;

    habit.title = title;
    habit.description = payload.description;
    habit.frequency = payload.frequency.unwrap_or_else(default_frequency);
    habit.color = payload.color.unwrap_or_else(default_color);
    habit.schedule_days = payload.schedule_days;
    habit.reminder_time = payload.reminder_time;

    state.db.update_habit(&habit).await?;

    Ok(Json(habit))
}

#[derive(Serialize)]
struct OkResponse {
    ok: bool,
}

/// Delete a habit and all of its completions.
async fn delete_habit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(habit_id): Path<String>,
) -> Result<Json<OkResponse>> {
    state
        .db
        .get_habit_for_user(&user.user_id, &habit_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Habit not found".to_string()))?;

    let removed = state.db.delete_habit_cascade(&habit_id).await?;

    tracing::info!(
        user_id = %user.user_id,
        habit_id = %habit_id,
        completions_removed = removed,
        "Habit deleted"
    );

    Ok(Json(OkResponse { ok: true }))
}

/// Reorder payload: habit IDs in their new display order.
#[derive(Deserialize)]
pub struct ReorderPayload {
    pub order: Vec<String>,
}

/// Reassign display order from the given ID sequence.
///
/// IDs not owned by the caller are skipped silently.
async fn reorder_habits(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ReorderPayload>,
) -> Result<Json<OkResponse>> {
    let habits = state.db.habits_for_user(&user.user_id).await?;

    let mut reordered = Vec::new();
    for (index, habit_id) in payload.order.iter().enumerate() {
        if let Some(habit) = habits.iter().find(|h| &h.id == habit_id) {
            let mut habit = habit.clone();
            habit.order = index as u32;
            reordered.push(habit);
        }
    }

    state.db.reorder_habits(&reordered).await?;

    Ok(Json(OkResponse { ok: true }))
}

// ─── Completion Ledger ───────────────────────────────────────

/// Optional body for the complete endpoint.
#[derive(Deserialize, Default)]
pub struct CompletePayload {
    /// Calendar day (`YYYY-MM-DD`); defaults to today (UTC).
    pub date: Option<String>,
}

#[derive(Serialize)]
pub struct CompleteResponse {
    /// `true` if a new record was written, `false` if the day was
    /// already recorded. Both are success.
    pub created: bool,
}

/// Record a completion for a habit on a calendar day.
async fn record_completion(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(habit_id): Path<String>,
    payload: Option<Json<CompletePayload>>,
) -> Result<Json<CompleteResponse>> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();

    let day = match payload.date.as_deref() {
        Some(raw) => parse_day_key(raw).ok_or_else(|| {
            AppError::BadRequest("Invalid 'date': must be YYYY-MM-DD".to_string())
        })?,
        None => today_utc(),
    };

    state
        .db
        .get_habit_for_user(&user.user_id, &habit_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Habit not found".to_string()))?;

    let key = day_key(day);
    let completion = Completion {
        id: Completion::doc_id(&habit_id, &key),
        habit_id: habit_id.clone(),
        user_id: user.user_id.clone(),
        completed_on: key,
        created_at: now_rfc3339(),
    };

    let created = state.db.insert_completion(&completion).await?;

    tracing::debug!(
        user_id = %user.user_id,
        habit_id = %habit_id,
        day = %completion.completed_on,
        created,
        "Completion recorded"
    );

    Ok(Json(CompleteResponse { created }))
}

// ─── Analytics ───────────────────────────────────────────────

/// Dashboard analytics response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    pub total_habits: u32,
    pub streak: u32,
    pub completion_rate: u32,
    pub completions_this_month: u32,
    pub last7_series: Vec<SeriesPoint>,
    pub top_habits: Vec<TopHabit>,
}

/// Analytics overview for the current user.
///
/// The five ledger reads are independent and issued concurrently; if
/// any one fails the whole response fails rather than returning a
/// partial dashboard. A completion recorded mid-computation may or may
/// not be reflected, which is acceptable since records are immutable.
async fn analytics_overview(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<OverviewResponse>> {
    let today = today_utc();
    let series_start = day_key(today - Duration::days(SERIES_DAYS - 1));
    let month_start_key = day_key(month_start(today));
    let streak_start = day_key(today - Duration::days(STREAK_LOOKBACK_DAYS - 1));

    let (habits, series_window, month_window, all_completions, streak_window) = tokio::try_join!(
        state.db.habits_for_user(&user.user_id),
        state.db.completions_since(&user.user_id, &series_start),
        state.db.completions_since(&user.user_id, &month_start_key),
        state.db.completions_for_user(&user.user_id),
        state.db.completions_since(&user.user_id, &streak_start),
    )?;

    let total_habits = habits.len() as u32;
    let completions_this_month = month_window.len() as u32;

    Ok(Json(OverviewResponse {
        total_habits,
        streak: analytics::current_streak(&streak_window, today),
        completion_rate: analytics::monthly_completion_rate(
            total_habits,
            completions_this_month,
            today.day(),
        ),
        completions_this_month,
        last7_series: analytics::last7_series(&series_window, today),
        top_habits: analytics::top_habits(&all_completions, &habits, TOP_HABITS_LIMIT),
    }))
}

/// One timeline event: a completion joined with its habit's metadata.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: String,
    pub habit_id: String,
    pub habit_title: String,
    pub color: String,
    pub completed_on: String,
}

/// Most recent completions, newest first.
///
/// Events whose habit no longer exists are dropped (cascade delete
/// makes this transient at worst).
async fn timeline(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<TimelineEvent>>> {
    let (completions, habits) = tokio::try_join!(
        state.db.recent_completions(&user.user_id, TIMELINE_LIMIT),
        state.db.habits_for_user(&user.user_id),
    )?;

    let events = completions
        .into_iter()
        .filter_map(|completion| {
            habits
                .iter()
                .find(|h| h.id == completion.habit_id)
                .map(|habit| TimelineEvent {
                    id: completion.id,
                    habit_id: completion.habit_id,
                    habit_title: habit.title.clone(),
                    color: habit.color.clone(),
                    completed_on: completion.completed_on,
                })
        })
        .collect();

    Ok(Json(events))
}
