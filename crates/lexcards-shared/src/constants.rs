/// Number of correct reviews after which a card counts as mastered.
pub const MASTERY_THRESHOLD: u32 = 5;

/// Largest page number a listing request may ask for.
pub const MAX_PAGE: u32 = 10_000_000;

/// Largest page size a listing request may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when the caller does not supply one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Sort values accepted by listing requests.
pub const SORT_SAFELIST: [&str; 7] = ["id", "section", "file", "-id", "-section", "-file", "random"];

/// Default store operation timeout in milliseconds.
pub const DEFAULT_OP_TIMEOUT_MS: u64 = 3_000;
