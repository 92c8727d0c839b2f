//! Listing filters: page, page size and sort key, plus the pagination
//! metadata reported alongside each page.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE, MAX_PAGE_SIZE, SORT_SAFELIST};
use crate::validator::{ValidationErrors, Validator};

/// Allow-listed sort orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    Id,
    Section,
    File,
    IdDesc,
    SectionDesc,
    FileDesc,
    Random,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Id => "id",
            SortKey::Section => "section",
            SortKey::File => "file",
            SortKey::IdDesc => "-id",
            SortKey::SectionDesc => "-section",
            SortKey::FileDesc => "-file",
            SortKey::Random => "random",
        }
    }

    /// Flashcard column this key orders by; `None` for [`SortKey::Random`].
    pub fn column(&self) -> Option<&'static str> {
        match self {
            SortKey::Id | SortKey::IdDesc => Some("id"),
            SortKey::Section | SortKey::SectionDesc => Some("section"),
            SortKey::File | SortKey::FileDesc => Some("source_file"),
            SortKey::Random => None,
        }
    }

    pub fn descending(&self) -> bool {
        matches!(self, SortKey::IdDesc | SortKey::SectionDesc | SortKey::FileDesc)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SortKey::Id),
            "section" => Ok(SortKey::Section),
            "file" => Ok(SortKey::File),
            "-id" => Ok(SortKey::IdDesc),
            "-section" => Ok(SortKey::SectionDesc),
            "-file" => Ok(SortKey::FileDesc),
            "random" => Ok(SortKey::Random),
            other => Err(format!("unsupported sort value: {other}")),
        }
    }
}

/// Which cards a listing should include.  Empty strings and an empty
/// category list match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CardFilter {
    /// Free-text query; every token must appear in the card's section.
    #[serde(default)]
    pub section: String,
    /// Case-insensitive exact match.
    #[serde(default)]
    pub section_type: String,
    /// Case-insensitive exact match.
    #[serde(default)]
    pub source_file: String,
    /// The card must carry all of these.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub hide_mastered: bool,
}

/// Raw paging values as coerced from the query string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    pub sort: String,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: i64::from(DEFAULT_PAGE_SIZE),
            sort: "id".to_string(),
        }
    }
}

impl Filters {
    pub fn new(page: i64, page_size: i64, sort: impl Into<String>) -> Self {
        Self {
            page,
            page_size,
            sort: sort.into(),
        }
    }

    /// Record every paging problem in `v`.
    pub fn check(&self, v: &mut Validator) {
        v.check(self.page > 0, "page", "must be greater than zero");
        v.check(
            self.page <= i64::from(MAX_PAGE),
            "page",
            "must be a maximum of 10 million",
        );
        v.check(self.page_size > 0, "page_size", "must be greater than zero");
        v.check(
            self.page_size <= i64::from(MAX_PAGE_SIZE),
            "page_size",
            "must be a maximum of 100",
        );
        v.check(
            SORT_SAFELIST.contains(&self.sort.as_str()),
            "sort",
            "invalid sort value",
        );
    }

    /// Validate and convert into a request the query path can execute.
    pub fn validate(&self) -> Result<PageRequest, ValidationErrors> {
        let mut v = Validator::new();
        self.check(&mut v);
        v.into_result()?;

        let sort = self.sort.parse::<SortKey>();
        let (Ok(page), Ok(page_size), Ok(sort)) = (
            u32::try_from(self.page),
            u32::try_from(self.page_size),
            sort,
        ) else {
            let mut v = Validator::new();
            v.add_error("filters", "could not be interpreted");
            return Err(v.into_errors());
        };

        Ok(PageRequest {
            page,
            page_size,
            sort,
        })
    }
}

/// Validated paging request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
    pub sort: SortKey,
}

impl PageRequest {
    pub fn limit(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

/// Pagination metadata returned with a page of results.  All zero when
/// nothing matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub current_page: u32,
    pub page_size: u32,
    pub first_page: u32,
    pub last_page: u32,
    pub total_records: u64,
}

impl Metadata {
    pub fn calculate(total_records: u64, page: u32, page_size: u32) -> Self {
        if total_records == 0 || page_size == 0 {
            return Self::default();
        }

        let last_page = total_records.div_ceil(u64::from(page_size));
        Self {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: u32::try_from(last_page).unwrap_or(u32::MAX),
            total_records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let req = Filters::default().validate().unwrap();
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, 20);
        assert_eq!(req.sort, SortKey::Id);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn every_safelisted_sort_parses() {
        for sort in SORT_SAFELIST {
            let req = Filters::new(1, 10, sort).validate().unwrap();
            assert_eq!(req.sort.as_str(), sort);
        }
    }

    #[test]
    fn sort_outside_safelist_is_rejected() {
        let errors = Filters::new(1, 10, "created_at").validate().unwrap_err();
        assert_eq!(errors.fields(), vec!["sort"]);

        let errors = Filters::new(1, 10, "id; DROP TABLE flashcards").validate().unwrap_err();
        assert!(errors.has_field("sort"));
    }

    #[test]
    fn page_bounds_are_enforced() {
        let errors = Filters::new(0, 0, "id").validate().unwrap_err();
        assert_eq!(errors.fields(), vec!["page", "page_size"]);

        let errors = Filters::new(10_000_001, 101, "id").validate().unwrap_err();
        assert_eq!(errors.message("page"), Some("must be a maximum of 10 million"));
        assert_eq!(errors.message("page_size"), Some("must be a maximum of 100"));
    }

    #[test]
    fn offset_follows_page_and_size() {
        let req = Filters::new(3, 10, "id").validate().unwrap();
        assert_eq!(req.offset(), 20);
        assert_eq!(req.limit(), 10);
    }

    #[test]
    fn metadata_for_partial_last_page() {
        let meta = Metadata::calculate(23, 3, 10);
        assert_eq!(meta.last_page, 3);
        assert_eq!(meta.first_page, 1);
        assert_eq!(meta.current_page, 3);
        assert_eq!(meta.total_records, 23);
    }

    #[test]
    fn metadata_is_zero_when_nothing_matches() {
        assert_eq!(Metadata::calculate(0, 2, 10), Metadata::default());
    }

    #[test]
    fn sort_key_columns() {
        assert_eq!(SortKey::FileDesc.column(), Some("source_file"));
        assert!(SortKey::FileDesc.descending());
        assert_eq!(SortKey::Random.column(), None);
        assert!(!SortKey::Section.descending());
    }
}
