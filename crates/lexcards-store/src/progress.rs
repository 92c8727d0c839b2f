//! Per-user mastery tracking.
//!
//! ```text
//! not_started --record_correct--> in_progress --count reaches threshold--> mastered
//! any state --reset--> not_started
//! ```
//!
//! Both transitions are single upsert statements, so concurrent reviews of
//! the same card by the same user cannot lose an increment.

use chrono::{DateTime, Utc};
use lexcards_shared::constants::MASTERY_THRESHOLD;
use lexcards_shared::{FlashcardId, ProgressStatus, UserId};
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::{missing_parent, Result, StoreError};
use crate::models::ProgressRecord;

const PROGRESS_COLUMNS: &str = "user_id, flashcard_id, correct_count, status, last_reviewed_at";

impl Database {
    /// Count one correct review of `card` by `user`.
    ///
    /// The count stops growing at the mastery threshold; the status becomes
    /// `mastered` once the count reaches it.  `last_reviewed_at` is refreshed
    /// on every call.
    pub fn record_correct(&self, user: UserId, card: FlashcardId) -> Result<ProgressRecord> {
        if !card.is_valid() {
            return Err(StoreError::NotFound);
        }
        let now = Utc::now().to_rfc3339();

        let record = self.bounded(|conn| {
            conn.query_row(
                &format!(
                    "INSERT INTO user_flashcards (user_id, flashcard_id, correct_count, status, last_reviewed_at)
                     VALUES (?1, ?2, 1, CASE WHEN 1 >= ?3 THEN 'mastered' ELSE 'in_progress' END, ?4)
                     ON CONFLICT (user_id, flashcard_id) DO UPDATE SET
                         correct_count = CASE
                             WHEN correct_count < ?3 THEN correct_count + 1
                             ELSE correct_count
                         END,
                         status = CASE
                             WHEN correct_count + 1 >= ?3 THEN 'mastered'
                             ELSE 'in_progress'
                         END,
                         last_reviewed_at = excluded.last_reviewed_at
                     RETURNING {PROGRESS_COLUMNS}"
                ),
                params![user.0, card.0, MASTERY_THRESHOLD, now],
                row_to_progress,
            )
            .map_err(missing_parent)
        })?;

        tracing::debug!(
            user_id = %user,
            flashcard_id = %card,
            correct_count = record.correct_count,
            status = %record.status,
            "recorded correct review"
        );
        Ok(record)
    }

    /// Put `card` back to `not_started` for `user`.
    pub fn reset_progress(&self, user: UserId, card: FlashcardId) -> Result<ProgressRecord> {
        if !card.is_valid() {
            return Err(StoreError::NotFound);
        }
        let now = Utc::now().to_rfc3339();

        let record = self.bounded(|conn| {
            conn.query_row(
                &format!(
                    "INSERT INTO user_flashcards (user_id, flashcard_id, correct_count, status, last_reviewed_at)
                     VALUES (?1, ?2, 0, 'not_started', ?3)
                     ON CONFLICT (user_id, flashcard_id) DO UPDATE SET
                         correct_count = 0,
                         status = 'not_started',
                         last_reviewed_at = excluded.last_reviewed_at
                     RETURNING {PROGRESS_COLUMNS}"
                ),
                params![user.0, card.0, now],
                row_to_progress,
            )
            .map_err(missing_parent)
        })?;

        tracing::debug!(user_id = %user, flashcard_id = %card, "reset progress");
        Ok(record)
    }

    /// Read the progress record for one pair, if any exists.
    pub fn progress(&self, user: UserId, card: FlashcardId) -> Result<Option<ProgressRecord>> {
        self.bounded(|conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {PROGRESS_COLUMNS} FROM user_flashcards
                         WHERE user_id = ?1 AND flashcard_id = ?2"
                    ),
                    params![user.0, card.0],
                    row_to_progress,
                )
                .optional()?)
        })
    }
}

fn row_to_progress(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProgressRecord> {
    let user_id: i64 = row.get(0)?;
    let flashcard_id: i64 = row.get(1)?;
    let correct_count: u32 = row.get(2)?;
    let status_str: String = row.get(3)?;
    let reviewed_str: String = row.get(4)?;

    let status: ProgressStatus = status_str.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
    })?;

    let last_reviewed_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&reviewed_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(ProgressRecord {
        user_id: UserId(user_id),
        flashcard_id: FlashcardId(flashcard_id),
        correct_count,
        status,
        last_reviewed_at,
    })
}

#[cfg(test)]
mod tests {
    use lexcards_shared::constants::MASTERY_THRESHOLD;
    use lexcards_shared::{FlashcardId, ProgressStatus, UserId};

    use crate::models::ProgressRecord;
    use crate::test_support::{open_temp, qa_card};
    use crate::{Database, StoreError};

    #[test]
    fn first_review_creates_in_progress_record() {
        let (_dir, db) = open_temp();
        let owner = db.create_user("owner").unwrap();
        let reviewer = db.create_user("reviewer").unwrap();
        let card = db.insert_flashcard(qa_card("Chapter 1"), owner.id).unwrap();

        let record = db.record_correct(reviewer.id, card.id).unwrap();
        assert_eq!(record.correct_count, 1);
        assert_eq!(record.status, ProgressStatus::InProgress);
        assert_eq!(record.user_id, reviewer.id);
    }

    #[test]
    fn threshold_reviews_master_and_cap_the_count() {
        let (_dir, db) = open_temp();
        let owner = db.create_user("owner").unwrap();
        let card = db.insert_flashcard(qa_card("Chapter 1"), owner.id).unwrap();

        for n in 1..MASTERY_THRESHOLD {
            let record = db.record_correct(owner.id, card.id).unwrap();
            assert_eq!(record.correct_count, n);
            assert_eq!(record.status, ProgressStatus::InProgress);
        }

        let fifth = db.record_correct(owner.id, card.id).unwrap();
        assert_eq!(fifth.correct_count, 5);
        assert_eq!(fifth.status, ProgressStatus::Mastered);

        let sixth = db.record_correct(owner.id, card.id).unwrap();
        assert_eq!(sixth.correct_count, 5);
        assert_eq!(sixth.status, ProgressStatus::Mastered);
        assert!(sixth.last_reviewed_at >= fifth.last_reviewed_at);

        let reset = db.reset_progress(owner.id, card.id).unwrap();
        assert_eq!(reset.correct_count, 0);
        assert_eq!(reset.status, ProgressStatus::NotStarted);

        let joined = db.get_flashcard(card.id, owner.id).unwrap();
        assert_eq!(joined.correct_count, 0);
        assert_eq!(joined.status, ProgressStatus::NotStarted);
    }

    #[test]
    fn reset_without_prior_record_creates_one() {
        let (_dir, db) = open_temp();
        let owner = db.create_user("owner").unwrap();
        let other = db.create_user("other").unwrap();
        let card = db.insert_flashcard(qa_card("Chapter 1"), owner.id).unwrap();

        let record = db.reset_progress(other.id, card.id).unwrap();
        assert_eq!(record.status, ProgressStatus::NotStarted);
        assert!(db.progress(other.id, card.id).unwrap().is_some());
    }

    #[test]
    fn reviews_are_isolated_per_user() {
        let (_dir, db) = open_temp();
        let a = db.create_user("a").unwrap();
        let b = db.create_user("b").unwrap();
        let card = db.insert_flashcard(qa_card("Chapter 1"), a.id).unwrap();

        for _ in 0..3 {
            db.record_correct(a.id, card.id).unwrap();
        }
        db.record_correct(b.id, card.id).unwrap();
        db.reset_progress(b.id, card.id).unwrap();

        assert_eq!(db.progress(a.id, card.id).unwrap().unwrap().correct_count, 3);
        assert_eq!(db.progress(b.id, card.id).unwrap().unwrap().correct_count, 0);
    }

    #[test]
    fn unknown_card_or_user_is_not_found() {
        let (_dir, db) = open_temp();
        let owner = db.create_user("owner").unwrap();
        let card = db.insert_flashcard(qa_card("Chapter 1"), owner.id).unwrap();

        assert!(matches!(
            db.record_correct(owner.id, FlashcardId(999)),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.reset_progress(UserId(999), card.id),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.record_correct(owner.id, FlashcardId(0)),
            Err(StoreError::NotFound)
        ));
    }

    /// Run `per_handle` reviews on each of `handles` separate connections
    /// at once and return the final record.
    fn review_concurrently(handles: usize, per_handle: usize) -> ProgressRecord {
        let (dir, db) = open_temp();
        let path = dir.path().join("test.db");
        let owner = db.create_user("owner").unwrap();
        let card = db.insert_flashcard(qa_card("Chapter 1"), owner.id).unwrap();

        let failures: Vec<StoreError> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..handles)
                .map(|_| {
                    let path = path.clone();
                    scope.spawn(move || {
                        let handle = Database::open_at(&path).unwrap();
                        (0..per_handle)
                            .filter_map(|_| handle.record_correct(owner.id, card.id).err())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            workers
                .into_iter()
                .flat_map(|w| w.join().unwrap())
                .collect()
        });
        assert!(failures.is_empty(), "reviews failed: {failures:?}");

        db.progress(owner.id, card.id).unwrap().unwrap()
    }

    #[test]
    fn concurrent_reviews_past_threshold_cap_at_mastery() {
        let record = review_concurrently(4, 2);
        assert_eq!(record.correct_count, MASTERY_THRESHOLD);
        assert_eq!(record.status, ProgressStatus::Mastered);
    }

    #[test]
    fn concurrent_reviews_lose_no_increment() {
        let record = review_concurrently(4, 1);
        assert_eq!(record.correct_count, 4);
        assert_eq!(record.status, ProgressStatus::InProgress);
    }

    #[test]
    fn deleting_user_cascades_progress() {
        let (_dir, db) = open_temp();
        let owner = db.create_user("owner").unwrap();
        let reviewer = db.create_user("reviewer").unwrap();
        let card = db.insert_flashcard(qa_card("Chapter 1"), owner.id).unwrap();
        db.record_correct(reviewer.id, card.id).unwrap();

        db.delete_user(reviewer.id).unwrap();

        assert!(db.progress(reviewer.id, card.id).unwrap().is_none());
        assert!(db.get_flashcard(card.id, owner.id).is_ok());
    }
}
