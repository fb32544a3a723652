// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes for authenticated users.

use axum::{
    extract::State,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::AppState;

const ALLOWED_THEMES: [&str; 2] = ["light", "dark"];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/me", get(get_me).put(update_me))
}

/// Current user response (credentials never leave the db layer).
#[derive(Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub theme_preference: String,
    pub created_at: String,
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let profile = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        id: profile.id,
        name: profile.name,
        email: profile.email,
        avatar_url: profile.avatar_url,
        bio: profile.bio,
        theme_preference: profile.theme_preference,
        created_at: profile.created_at,
    }))
}

/// Partial profile update.
#[derive(Deserialize)]
pub struct UpdateProfilePayload {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub theme_preference: Option<String>,
}

/// Update the current user's profile fields.
///
/// Only provided fields change; an unknown theme value is ignored.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<Json<ProfileResponse>> {
    let mut profile = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if let Some(name) = payload.name {
        profile.name = name;
    }
    if let Some(avatar_url) = payload.avatar_url {
        profile.avatar_url = Some(avatar_url);
    }
    if let Some(bio) = payload.bio {
        profile.bio = Some(bio);
    }
    if let Some(theme) = payload.theme_preference {
        if ALLOWED_THEMES.contains(&theme.as_str()) {
            profile.theme_preference = theme;
        }
    }

    state.db.update_user(&profile).await?;

    Ok(Json(ProfileResponse {
        id: profile.id,
        name: profile.name,
        email: profile.email,
        avatar_url: profile.avatar_url,
        bio: profile.bio,
        theme_preference: profile.theme_preference,
        created_at: profile.created_at,
    }))
}
