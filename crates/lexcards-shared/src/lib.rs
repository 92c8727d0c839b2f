//! # lexcards-shared
//!
//! Pure domain types for the lexcards study-card corpus: the polymorphic
//! card content and its codec, validated flashcard construction, listing
//! filters with pagination metadata, and the per-user progress status.
//!
//! Nothing in this crate performs I/O; the `lexcards-store` crate persists
//! the values built here.

pub mod constants;
pub mod content;
pub mod error;
pub mod filters;
pub mod flashcard;
pub mod types;
pub mod validator;

pub use content::{Content, ContentType, McqContent, QaContent, YesNoContent};
pub use error::ContentError;
pub use filters::{CardFilter, Filters, Metadata, PageRequest, SortKey};
pub use flashcard::{Flashcard, FlashcardInput, NewFlashcard};
pub use types::{FlashcardId, ProgressStatus, UserId};
pub use validator::{FieldError, ValidationErrors, Validator};
