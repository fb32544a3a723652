//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const HABITS: &str = "habits";
    /// Completion ledger (keyed by `{habit_id}_{day}`)
    pub const COMPLETIONS: &str = "completions";
}
