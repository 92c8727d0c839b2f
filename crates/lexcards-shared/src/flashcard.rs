//! Flashcard construction and validation.
//!
//! Raw request fields arrive as a [`FlashcardInput`].  [`FlashcardInput::build`]
//! is the only way to obtain a [`NewFlashcard`], so every value handed to the
//! store has typed content matching its discriminant and has passed every
//! field check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::{self, Content, ContentType};
use crate::error::ContentError;
use crate::types::{FlashcardId, ProgressStatus};
use crate::validator::{self, ValidationErrors, Validator};

/// Raw, not yet validated flashcard fields as decoded from a request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlashcardInput {
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub section_type: Option<String>,
    #[serde(default)]
    pub source_file: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub flashcard_type: String,
    #[serde(default)]
    pub flashcard_content: Value,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl FlashcardInput {
    /// Validate every field and build the typed value.
    ///
    /// Content that cannot be decoded is reported against
    /// `flashcard_content`; all other problems accumulate alongside it.
    pub fn build(self) -> Result<NewFlashcard, ValidationErrors> {
        let mut v = Validator::new();

        let content = match content::decode(&self.flashcard_type, &self.flashcard_content) {
            Ok(content) => {
                content.check(&mut v);
                Some(content)
            }
            Err(ContentError::UnsupportedContentType(_)) => {
                v.add_error("flashcard_content", "content cannot be decoded for this flashcard type");
                None
            }
            Err(ContentError::MalformedContent { kind, .. }) => {
                v.add_error("flashcard_content", format!("invalid {kind} content"));
                None
            }
        };

        v.check(!self.question.is_empty(), "question", "question must be provided");
        v.check(!self.text.is_empty(), "text", "text must be provided");
        v.check(
            validator::unique(&self.categories),
            "categories",
            "categories must be unique",
        );
        v.check(
            self.flashcard_type.parse::<ContentType>().is_ok(),
            "flashcard_type",
            "invalid flashcard type",
        );

        let Some(content) = content.filter(|_| v.valid()) else {
            return Err(v.into_errors());
        };

        Ok(NewFlashcard {
            section: self.section,
            section_type: self.section_type,
            source_file: self.source_file,
            text: self.text,
            question: self.question,
            content,
            categories: self.categories,
        })
    }
}

/// A complete, validated flashcard that has not been stored yet.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewFlashcard {
    section: Option<String>,
    section_type: Option<String>,
    source_file: Option<String>,
    text: String,
    question: String,
    #[serde(flatten)]
    content: Content,
    categories: Vec<String>,
}

impl NewFlashcard {
    /// Reassemble a value from a persisted row.  Rows only ever enter the
    /// store through [`FlashcardInput::build`], and `content` has been
    /// decoded against the stored discriminant.
    pub fn from_persisted(
        section: Option<String>,
        section_type: Option<String>,
        source_file: Option<String>,
        text: String,
        question: String,
        content: Content,
        categories: Vec<String>,
    ) -> Self {
        Self {
            section,
            section_type,
            source_file,
            text,
            question,
            content,
            categories,
        }
    }

    pub fn section(&self) -> Option<&str> {
        self.section.as_deref()
    }

    pub fn section_type(&self) -> Option<&str> {
        self.section_type.as_deref()
    }

    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn kind(&self) -> ContentType {
        self.content.kind()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}

/// A stored flashcard joined with the requesting user's progress.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Flashcard {
    pub id: FlashcardId,
    #[serde(flatten)]
    pub body: NewFlashcard,
    /// Version last read from the store; updates must echo it back.
    pub version: i32,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    pub correct_count: u32,
    pub status: ProgressStatus,
}

impl Flashcard {
    /// Replace the editable fields, keeping identity, version and creation time.
    pub fn apply(&mut self, body: NewFlashcard) {
        self.body = body;
    }
}
