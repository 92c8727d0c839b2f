//! CRUD operations for flashcards with optimistic concurrency.
//!
//! Every read joins the requesting user's progress row; a missing row reads
//! as `not_started` with a count of zero.  Updates only apply when the
//! caller's version still matches the stored one.

use chrono::{DateTime, Utc};
use lexcards_shared::content;
use lexcards_shared::{Flashcard, FlashcardId, NewFlashcard, ProgressStatus, UserId};
use rusqlite::params;

use crate::database::Database;
use crate::error::{missing_parent, Result, StoreError};

/// Columns selected by every flashcard read, in [`row_to_flashcard`] order.
/// Expects `flashcards f LEFT JOIN user_flashcards uf`.
pub(crate) const FLASHCARD_COLUMNS: &str = "
    f.id, f.section, f.section_type, f.source_file, f.text, f.question,
    f.flashcard_type, f.flashcard_content, f.categories, f.version, f.created_at,
    COALESCE(uf.correct_count, 0),
    COALESCE(uf.status, 'not_started')";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Store a validated card and seed the owner's progress record.
    ///
    /// Both rows are written in one transaction.  An unknown owner fails
    /// with [`StoreError::NotFound`] and leaves no card behind.
    pub fn insert_flashcard(&self, card: NewFlashcard, owner: UserId) -> Result<Flashcard> {
        let content_json = content::encode(card.content())?.to_string();
        let categories_json = serde_json::to_string(card.categories())?;
        let now = Utc::now();
        let created = now.to_rfc3339();

        let (id, version) = self.bounded(|conn| {
            let tx = conn.unchecked_transaction()?;

            let (id, version): (i64, i32) = tx.query_row(
                "INSERT INTO flashcards (
                    section, section_type, source_file, text, question,
                    flashcard_type, flashcard_content, categories, version, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9)
                 RETURNING id, version",
                params![
                    card.section(),
                    card.section_type(),
                    card.source_file(),
                    card.text(),
                    card.question(),
                    card.kind().as_str(),
                    content_json,
                    categories_json,
                    created,
                ],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            tx.execute(
                "INSERT INTO user_flashcards (user_id, flashcard_id, correct_count, status, last_reviewed_at)
                 VALUES (?1, ?2, 0, 'not_started', ?3)",
                params![owner.0, id, created],
            )
            .map_err(missing_parent)?;

            tx.commit()?;
            Ok((id, version))
        })?;

        tracing::debug!(flashcard_id = id, owner = %owner, "inserted flashcard");

        Ok(Flashcard {
            id: FlashcardId(id),
            body: card,
            version,
            created_at: now,
            correct_count: 0,
            status: ProgressStatus::NotStarted,
        })
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a card joined with `user`'s progress.
    pub fn get_flashcard(&self, id: FlashcardId, user: UserId) -> Result<Flashcard> {
        if !id.is_valid() {
            return Err(StoreError::NotFound);
        }

        let row = self.bounded(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {FLASHCARD_COLUMNS}
                     FROM flashcards f
                     LEFT JOIN user_flashcards uf ON uf.flashcard_id = f.id AND uf.user_id = ?2
                     WHERE f.id = ?1"
                ),
                params![id.0, user.0],
                row_to_flashcard,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::from(other),
            })
        })?;

        row.into_flashcard()
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Write `card` back if nobody changed it since it was read.
    ///
    /// On success the stored version is bumped by one, written into
    /// `card.version` and returned.  A stale version or a vanished row fails
    /// with [`StoreError::EditConflict`] and changes nothing.
    pub fn update_flashcard(&self, card: &mut Flashcard) -> Result<i32> {
        let body = &card.body;
        let content_json = content::encode(body.content())?.to_string();
        let categories_json = serde_json::to_string(body.categories())?;

        let new_version = self.bounded(|conn| {
            conn.query_row(
                "UPDATE flashcards
                 SET section = ?1,
                     section_type = ?2,
                     source_file = ?3,
                     text = ?4,
                     question = ?5,
                     flashcard_type = ?6,
                     flashcard_content = ?7,
                     categories = ?8,
                     version = version + 1
                 WHERE id = ?9 AND version = ?10
                 RETURNING version",
                params![
                    body.section(),
                    body.section_type(),
                    body.source_file(),
                    body.text(),
                    body.question(),
                    body.kind().as_str(),
                    content_json,
                    categories_json,
                    card.id.0,
                    card.version,
                ],
                |row| row.get::<_, i32>(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::EditConflict,
                other => StoreError::from(other),
            })
        });

        match new_version {
            Ok(version) => {
                tracing::debug!(flashcard_id = %card.id, version, "updated flashcard");
                card.version = version;
                Ok(version)
            }
            Err(StoreError::EditConflict) => {
                tracing::warn!(
                    flashcard_id = %card.id,
                    expected_version = card.version,
                    "edit conflict on flashcard update"
                );
                Err(StoreError::EditConflict)
            }
            Err(other) => Err(other),
        }
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a card together with every user's progress on it.
    pub fn delete_flashcard(&self, id: FlashcardId) -> Result<()> {
        if !id.is_valid() {
            return Err(StoreError::NotFound);
        }

        self.bounded(|conn| {
            let tx = conn.unchecked_transaction()?;

            tx.execute(
                "DELETE FROM user_flashcards WHERE flashcard_id = ?1",
                params![id.0],
            )?;
            let affected = tx.execute("DELETE FROM flashcards WHERE id = ?1", params![id.0])?;
            if affected == 0 {
                return Err(StoreError::NotFound);
            }

            tx.commit()?;
            Ok(())
        })?;

        tracing::debug!(flashcard_id = %id, "deleted flashcard");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Flashcard columns as read from SQLite, before the JSON columns are decoded.
pub(crate) struct FlashcardRow {
    id: i64,
    section: Option<String>,
    section_type: Option<String>,
    source_file: Option<String>,
    text: String,
    question: String,
    flashcard_type: String,
    flashcard_content: String,
    categories: String,
    version: i32,
    created_at: DateTime<Utc>,
    correct_count: u32,
    status: ProgressStatus,
}

impl FlashcardRow {
    /// Decode the content and category columns.
    pub(crate) fn into_flashcard(self) -> Result<Flashcard> {
        let content = content::decode_str(&self.flashcard_type, &self.flashcard_content)?;
        let categories: Vec<String> = serde_json::from_str(&self.categories)?;

        Ok(Flashcard {
            id: FlashcardId(self.id),
            body: NewFlashcard::from_persisted(
                self.section,
                self.section_type,
                self.source_file,
                self.text,
                self.question,
                content,
                categories,
            ),
            version: self.version,
            created_at: self.created_at,
            correct_count: self.correct_count,
            status: self.status,
        })
    }
}

/// Map a row selected with [`FLASHCARD_COLUMNS`] to a [`FlashcardRow`].
pub(crate) fn row_to_flashcard(row: &rusqlite::Row<'_>) -> rusqlite::Result<FlashcardRow> {
    let created_str: String = row.get(10)?;
    let status_str: String = row.get(12)?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(10, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let status: ProgressStatus = status_str.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(12, rusqlite::types::Type::Text, e.into())
    })?;

    Ok(FlashcardRow {
        id: row.get(0)?,
        section: row.get(1)?,
        section_type: row.get(2)?,
        source_file: row.get(3)?,
        text: row.get(4)?,
        question: row.get(5)?,
        flashcard_type: row.get(6)?,
        flashcard_content: row.get(7)?,
        categories: row.get(8)?,
        version: row.get(9)?,
        created_at,
        correct_count: row.get(11)?,
        status,
    })
}
