// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Habitflow: recurring-habit tracking with a completion ledger.
//!
//! This crate provides the backend API for defining habits, recording
//! daily completions, and serving derived analytics (streaks, series,
//! completion rates, rankings).

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
}
