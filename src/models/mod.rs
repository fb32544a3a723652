// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod habit;
pub mod user;

pub use habit::{Completion, Habit};
pub use user::User;
