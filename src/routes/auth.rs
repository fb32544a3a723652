// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password authentication routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::db::firestore::generate_id;
use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE};
use crate::models::User;
use crate::services::password;
use crate::time_utils::now_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", get(logout))
}

/// Registration payload.
#[derive(Deserialize, Validate)]
pub struct RegisterPayload {
    #[serde(default)]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
}

/// Login payload.
#[derive(Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

/// Public view of a user, returned alongside the session token.
#[derive(Serialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Session response for register and login.
#[derive(Serialize)]
pub struct AuthResponse {
    pub user: UserSummary,
    pub token: String,
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Register a new account and start a session.
async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let email = payload.email.trim().to_lowercase();

    if state.db.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::BadRequest("Email already exists".to_string()));
    }

    let hashed = password::hash_password(&payload.password)?;

    let user = User {
        id: generate_id()?,
        name: payload.name,
        email,
        password_salt: hashed.salt,
        password_hash: hashed.hash,
        avatar_url: None,
        bio: None,
        theme_preference: "light".to_string(),
        created_at: now_rfc3339(),
    };
    state.db.create_user(&user).await?;

    tracing::info!(user_id = %user.id, "New account registered");

    let token = create_jwt(&user.id, &state.config.jwt_signing_key)?;
    let jar = jar.add(session_cookie(token.clone()));

    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            user: UserSummary {
                id: user.id,
                name: user.name,
                email: user.email,
            },
            token,
        }),
    ))
}

/// Log in with email and password.
///
/// Failures are uniform (no distinction between unknown email and
/// wrong password).
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginPayload>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    let email = payload.email.trim().to_lowercase();

    let user = state
        .db
        .get_user_by_email(&email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !password::verify_password(&payload.password, &user.password_salt, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }

    tracing::debug!(user_id = %user.id, "Login successful");

    let token = create_jwt(&user.id, &state.config.jwt_signing_key)?;
    let jar = jar.add(session_cookie(token.clone()));

    Ok((
        jar,
        Json(AuthResponse {
            user: UserSummary {
                id: user.id,
                name: user.name,
                email: user.email,
            },
            token,
        }),
    ))
}

#[derive(Serialize)]
struct LogoutResponse {
    ok: bool,
}

/// Clear the session cookie.
async fn logout(jar: CookieJar) -> (CookieJar, Json<LogoutResponse>) {
    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    (jar, Json(LogoutResponse { ok: true }))
}
