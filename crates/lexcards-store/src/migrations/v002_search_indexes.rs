//! v002 -- Search indexes.
//!
//! `flashcards_fts` is an external-content FTS5 index over `section`;
//! `flashcard_categories` unpacks the JSON `categories` column so category
//! containment can use an index.  Triggers keep both in step with
//! `flashcards`, and existing rows are backfilled.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS flashcards_fts USING fts5(
    section,
    content = 'flashcards',
    content_rowid = 'id',
    tokenize = 'unicode61'
);

CREATE TRIGGER IF NOT EXISTS flashcards_fts_ai AFTER INSERT ON flashcards BEGIN
    INSERT INTO flashcards_fts (rowid, section) VALUES (new.id, new.section);
END;

CREATE TRIGGER IF NOT EXISTS flashcards_fts_ad AFTER DELETE ON flashcards BEGIN
    INSERT INTO flashcards_fts (flashcards_fts, rowid, section)
    VALUES ('delete', old.id, old.section);
END;

CREATE TRIGGER IF NOT EXISTS flashcards_fts_au AFTER UPDATE OF section ON flashcards BEGIN
    INSERT INTO flashcards_fts (flashcards_fts, rowid, section)
    VALUES ('delete', old.id, old.section);
    INSERT INTO flashcards_fts (rowid, section) VALUES (new.id, new.section);
END;

INSERT INTO flashcards_fts (flashcards_fts) VALUES ('rebuild');

CREATE TABLE IF NOT EXISTS flashcard_categories (
    flashcard_id INTEGER NOT NULL,          -- FK -> flashcards(id)
    category     TEXT NOT NULL,

    PRIMARY KEY (flashcard_id, category),
    FOREIGN KEY (flashcard_id) REFERENCES flashcards(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_flashcard_categories_category
    ON flashcard_categories(category, flashcard_id);

CREATE TRIGGER IF NOT EXISTS flashcard_categories_ai AFTER INSERT ON flashcards BEGIN
    INSERT OR IGNORE INTO flashcard_categories (flashcard_id, category)
    SELECT new.id, value FROM json_each(new.categories);
END;

CREATE TRIGGER IF NOT EXISTS flashcard_categories_au AFTER UPDATE OF categories ON flashcards BEGIN
    DELETE FROM flashcard_categories WHERE flashcard_id = old.id;
    INSERT OR IGNORE INTO flashcard_categories (flashcard_id, category)
    SELECT new.id, value FROM json_each(new.categories);
END;

INSERT OR IGNORE INTO flashcard_categories (flashcard_id, category)
SELECT f.id, c.value FROM flashcards f, json_each(f.categories) c;
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
