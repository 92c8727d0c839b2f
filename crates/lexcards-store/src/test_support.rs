//! Fixtures shared by the store's unit tests.

use lexcards_shared::{FlashcardInput, NewFlashcard};
use serde_json::json;

use crate::database::Database;

/// Open a fresh database inside a temporary directory.  Keep the returned
/// directory alive for as long as the database is used.
pub(crate) fn open_temp() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(&dir.path().join("test.db")).unwrap();
    (dir, db)
}

pub(crate) fn qa_card(section: &str) -> NewFlashcard {
    FlashcardInput {
        section: Some(section.to_string()),
        section_type: Some("chapter".into()),
        source_file: Some("Foundation Manual".into()),
        text: "A party must serve the claim within four months.".into(),
        question: "How long does a party have to serve the claim?".into(),
        flashcard_type: "qa".into(),
        flashcard_content: json!({ "answer": "Four months", "justification": "Rule 7.5" }),
        categories: vec!["civil".into()],
    }
    .build()
    .unwrap()
}

pub(crate) fn yes_no_card(section: &str) -> NewFlashcard {
    FlashcardInput {
        section: Some(section.to_string()),
        section_type: Some("court_order".into()),
        source_file: Some("Court Rules".into()),
        text: "Service by email requires prior written consent.".into(),
        question: "Can a claim be served by email without consent?".into(),
        flashcard_type: "yes_no".into(),
        flashcard_content: json!({ "correct": false }),
        categories: vec!["civil".into(), "service".into()],
    }
    .build()
    .unwrap()
}
