//! Polymorphic flashcard content and its codec.
//!
//! A card carries a discriminant (`qa`, `mcq`, `yes_no`) next to an opaque
//! JSON payload.  [`decode`] turns the pair into a typed [`Content`] and
//! [`encode`] turns it back into the payload that gets persisted.  All
//! variant-specific shape knowledge lives in this module.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ContentError;
use crate::validator::{self, Validator};

/// Discriminant selecting which content variant a card uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Qa,
    Mcq,
    YesNo,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Qa => "qa",
            ContentType::Mcq => "mcq",
            ContentType::YesNo => "yes_no",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qa" => Ok(ContentType::Qa),
            "mcq" => Ok(ContentType::Mcq),
            "yes_no" => Ok(ContentType::YesNo),
            other => Err(ContentError::UnsupportedContentType(other.to_string())),
        }
    }
}

/// Open-answer content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QaContent {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
}

/// Multiple-choice content.  `correct_index` is signed so an out-of-range
/// negative index reaches validation instead of failing to decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct McqContent {
    pub options: Vec<String>,
    pub correct_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
}

impl McqContent {
    /// The option marked as correct, if the index is in range.
    pub fn correct_option(&self) -> Option<&str> {
        usize::try_from(self.correct_index)
            .ok()
            .and_then(|i| self.options.get(i))
            .map(String::as_str)
    }
}

/// Yes/no content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct YesNoContent {
    pub correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
}

/// Typed card content.  Serializes adjacently tagged, which is the
/// `flashcard_type` / `flashcard_content` pair seen on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "flashcard_type", content = "flashcard_content")]
pub enum Content {
    #[serde(rename = "qa")]
    Qa(QaContent),
    #[serde(rename = "mcq")]
    Mcq(McqContent),
    #[serde(rename = "yes_no")]
    YesNo(YesNoContent),
}

impl Content {
    /// The discriminant matching this variant.
    pub fn kind(&self) -> ContentType {
        match self {
            Content::Qa(_) => ContentType::Qa,
            Content::Mcq(_) => ContentType::Mcq,
            Content::YesNo(_) => ContentType::YesNo,
        }
    }

    /// Record every structural problem of this payload in `v`.
    pub fn check(&self, v: &mut Validator) {
        match self {
            Content::Qa(qa) => {
                v.check(
                    !qa.answer.is_empty(),
                    "flashcard_content.answer",
                    "answer must not be empty",
                );
            }
            Content::Mcq(mcq) => {
                v.check(
                    mcq.options.len() >= 2,
                    "flashcard_content.options",
                    "at least 2 options required",
                );
                v.check(
                    mcq.correct_option().is_some(),
                    "flashcard_content.correct_index",
                    "correct index out of bounds",
                );
                v.check(
                    validator::unique(&mcq.options),
                    "flashcard_content.options",
                    "options must be unique",
                );
            }
            Content::YesNo(_) => {}
        }
    }
}

/// Decode a raw payload according to its declared discriminant.
pub fn decode(kind: &str, raw: &Value) -> Result<Content, ContentError> {
    match kind.parse::<ContentType>()? {
        ContentType::Qa => parse(ContentType::Qa, raw).map(Content::Qa),
        ContentType::Mcq => parse(ContentType::Mcq, raw).map(Content::Mcq),
        ContentType::YesNo => parse(ContentType::YesNo, raw).map(Content::YesNo),
    }
}

/// Decode a payload stored as JSON text.
pub fn decode_str(kind: &str, text: &str) -> Result<Content, ContentError> {
    let content_type = kind.parse::<ContentType>()?;
    let raw: Value = serde_json::from_str(text).map_err(|source| ContentError::MalformedContent {
        kind: content_type.as_str(),
        source,
    })?;
    decode(kind, &raw)
}

/// Encode typed content back into its raw payload.  An absent
/// justification is left out.
pub fn encode(content: &Content) -> serde_json::Result<Value> {
    match content {
        Content::Qa(qa) => serde_json::to_value(qa),
        Content::Mcq(mcq) => serde_json::to_value(mcq),
        Content::YesNo(yn) => serde_json::to_value(yn),
    }
}

fn parse<T: DeserializeOwned>(kind: ContentType, raw: &Value) -> Result<T, ContentError> {
    T::deserialize(raw).map_err(|source| ContentError::MalformedContent {
        kind: kind.as_str(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn samples() -> Vec<Content> {
        vec![
            Content::Qa(QaContent {
                answer: "Within 21 days of service".into(),
                justification: Some("Order 12, rule 4".into()),
            }),
            Content::Mcq(McqContent {
                options: vec!["District Court".into(), "Circuit Court".into(), "High Court".into()],
                correct_index: 2,
                justification: None,
            }),
            Content::YesNo(YesNoContent {
                correct: false,
                justification: None,
            }),
        ]
    }

    #[test]
    fn encode_then_decode_is_identity() {
        for content in samples() {
            let raw = encode(&content).unwrap();
            let back = decode(content.kind().as_str(), &raw).unwrap();
            assert_eq!(back, content);
        }
    }

    #[test]
    fn unknown_discriminant_is_unsupported() {
        let err = decode("essay", &json!({ "answer": "x" })).unwrap_err();
        assert!(matches!(err, ContentError::UnsupportedContentType(ref k) if k == "essay"));
    }

    #[test]
    fn missing_field_is_malformed() {
        let err = decode("mcq", &json!({ "options": ["a", "b"] })).unwrap_err();
        assert!(matches!(err, ContentError::MalformedContent { kind: "mcq", .. }));
    }

    #[test]
    fn wrong_field_type_is_malformed() {
        let err = decode("yes_no", &json!({ "correct": "yes" })).unwrap_err();
        assert!(matches!(err, ContentError::MalformedContent { kind: "yes_no", .. }));
    }

    #[test]
    fn decode_str_rejects_non_json() {
        let err = decode_str("qa", "not json").unwrap_err();
        assert!(matches!(err, ContentError::MalformedContent { kind: "qa", .. }));
    }

    #[test]
    fn absent_justification_is_omitted() {
        let raw = encode(&Content::YesNo(YesNoContent {
            correct: true,
            justification: None,
        }))
        .unwrap();
        assert_eq!(raw, json!({ "correct": true }));
    }

    #[test]
    fn negative_index_decodes_but_fails_checks() {
        let content = decode(
            "mcq",
            &json!({ "options": ["a", "b"], "correct_index": -1 }),
        )
        .unwrap();

        let mut v = Validator::new();
        content.check(&mut v);
        let errors = v.into_result().unwrap_err();
        assert!(errors.has_field("flashcard_content.correct_index"));
    }

    #[test]
    fn adjacent_tagging_matches_wire_shape() {
        let content = Content::Qa(QaContent {
            answer: "yes".into(),
            justification: None,
        });
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(
            value,
            json!({ "flashcard_type": "qa", "flashcard_content": { "answer": "yes" } })
        );
    }
}
