use thiserror::Error;

/// Failures while mapping a raw payload onto a typed [`Content`](crate::Content).
#[derive(Error, Debug)]
pub enum ContentError {
    /// The discriminant is not one of `qa`, `mcq` or `yes_no`.
    #[error("Unsupported content type: {0:?}")]
    UnsupportedContentType(String),

    /// The payload does not have the shape its discriminant requires.
    #[error("Malformed {kind} content: {source}")]
    MalformedContent {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
