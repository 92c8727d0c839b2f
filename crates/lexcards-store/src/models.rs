//! Row types returned by the store besides [`Flashcard`](lexcards_shared::Flashcard).
//!
//! Every struct derives `Serialize` so it can be handed straight to the
//! HTTP layer.

use chrono::{DateTime, Utc};
use lexcards_shared::{FlashcardId, ProgressStatus, UserId};
use serde::{Deserialize, Serialize};

/// A user row.  The store never authenticates; it only needs a parent for
/// progress records so that deleting a user cascades.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Mastery state for one (user, flashcard) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressRecord {
    pub user_id: UserId,
    pub flashcard_id: FlashcardId,
    pub correct_count: u32,
    pub status: ProgressStatus,
    pub last_reviewed_at: DateTime<Utc>,
}

/// Per-status counts of a user's progress records.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlashcardStats {
    pub total: u64,
    pub mastered: u64,
    pub in_progress: u64,
    pub not_started: u64,
}

/// A category label with the number of cards carrying it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryCount {
    pub name: String,
    pub count: u64,
}

/// Distinct values available for narrowing a listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterOptions {
    pub sections: Vec<String>,
    pub section_types: Vec<String>,
    pub source_files: Vec<String>,
}
