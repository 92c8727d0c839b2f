//! v001 -- Initial schema creation.
//!
//! Creates `users`, `flashcards` and the per-user progress table
//! `user_flashcards`.  The expression indexes need `unicode_lower`, which
//! [`Database::open`](crate::Database::open) registers before migrating.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL,
    created_at TEXT NOT NULL                -- RFC-3339
);

-- ----------------------------------------------------------------
-- Flashcards
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS flashcards (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    section           TEXT,                 -- "Chapter 3", "HC Order 2023/114"
    section_type      TEXT,                 -- "chapter", "court_order"
    source_file       TEXT,                 -- "Foundation Manual"
    text              TEXT NOT NULL,
    question          TEXT NOT NULL,
    flashcard_type    TEXT NOT NULL CHECK (flashcard_type IN ('qa', 'mcq', 'yes_no')),
    flashcard_content TEXT NOT NULL,        -- JSON object, shape per flashcard_type
    categories        TEXT NOT NULL DEFAULT '[]', -- JSON array of labels
    version           INTEGER NOT NULL DEFAULT 1,
    created_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_flashcards_section_type ON flashcards(unicode_lower(section_type));
CREATE INDEX IF NOT EXISTS idx_flashcards_source_file ON flashcards(unicode_lower(source_file));

-- ----------------------------------------------------------------
-- Per-user progress
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS user_flashcards (
    user_id          INTEGER NOT NULL,      -- FK -> users(id)
    flashcard_id     INTEGER NOT NULL,      -- FK -> flashcards(id)
    correct_count    INTEGER NOT NULL DEFAULT 0 CHECK (correct_count >= 0),
    status           TEXT NOT NULL DEFAULT 'not_started'
                     CHECK (status IN ('not_started', 'in_progress', 'mastered')),
    last_reviewed_at TEXT NOT NULL,

    PRIMARY KEY (user_id, flashcard_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (flashcard_id) REFERENCES flashcards(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_user_flashcards_flashcard ON user_flashcards(flashcard_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
