//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Random hex ID (also used as document ID)
    pub id: String,
    /// Display name
    pub name: String,
    /// Email address (lowercased, unique)
    pub email: String,
    /// PBKDF2 salt (hex)
    pub password_salt: String,
    /// PBKDF2-HMAC-SHA256 digest (hex)
    pub password_hash: String,
    /// Avatar image URL
    pub avatar_url: Option<String>,
    /// Short bio
    pub bio: Option<String>,
    /// UI theme: "light" or "dark"
    #[serde(default = "default_theme")]
    pub theme_preference: String,
    /// When the account was created (RFC3339)
    pub created_at: String,
}

fn default_theme() -> String {
    "light".to_string()
}
