//! Listing, search and statistics over flashcards.
//!
//! Conditions are assembled per request from a [`CardFilter`]: section goes
//! through the FTS5 index, categories through the `flashcard_categories`
//! index, section type and source file are case-insensitive equality, and
//! `hide_mastered` looks at the joined progress row.  Paging values are
//! validated before any SQL runs.

use std::collections::BTreeSet;

use lexcards_shared::{CardFilter, Flashcard, Filters, Metadata, PageRequest, SortKey, UserId};
use rusqlite::{params, Connection, ToSql};

use crate::database::Database;
use crate::error::Result;
use crate::flashcards::{row_to_flashcard, FlashcardRow, FLASHCARD_COLUMNS};
use crate::models::{CategoryCount, FilterOptions, FlashcardStats};

/// `FROM` clause shared by listing queries.  `?1` is always the requesting user.
const LISTING_FROM: &str = "
    FROM flashcards f
    LEFT JOIN user_flashcards uf ON uf.flashcard_id = f.id AND uf.user_id = ?1";

impl Database {
    /// One page of cards matching `filter`, joined with `user`'s progress.
    ///
    /// Returns the page and its metadata.  An out-of-range page yields no
    /// rows but still reports the full match count.
    pub fn list_flashcards(
        &self,
        user: UserId,
        filter: &CardFilter,
        filters: &Filters,
    ) -> Result<(Vec<Flashcard>, Metadata)> {
        let page = filters.validate()?;
        let conditions = Conditions::from_filter(user, filter);

        let (total, rows) = self.bounded(|conn| {
            let tx = conn.unchecked_transaction()?;
            let total = conditions.count(&tx)?;
            let rows = conditions.page(&tx, &page)?;
            tx.commit()?;
            Ok((total, rows))
        })?;

        let cards = rows
            .into_iter()
            .map(|row| row.into_flashcard())
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            user_id = %user,
            total,
            returned = cards.len(),
            page = page.page,
            sort = %page.sort,
            "listed flashcards"
        );

        Ok((cards, Metadata::calculate(total, page.page, page.page_size)))
    }

    /// Counts of `user`'s progress records, overall and per status.
    pub fn user_stats(&self, user: UserId) -> Result<FlashcardStats> {
        self.bounded(|conn| {
            Ok(conn.query_row(
                "SELECT
                    COUNT(*),
                    COUNT(*) FILTER (WHERE status = 'mastered'),
                    COUNT(*) FILTER (WHERE status = 'in_progress'),
                    COUNT(*) FILTER (WHERE status = 'not_started')
                 FROM user_flashcards
                 WHERE user_id = ?1",
                params![user.0],
                |row| {
                    Ok(FlashcardStats {
                        total: row.get(0)?,
                        mastered: row.get(1)?,
                        in_progress: row.get(2)?,
                        not_started: row.get(3)?,
                    })
                },
            )?)
        })
    }

    /// Category labels across the cards `user` has progress on, with the
    /// number of such cards per label.
    pub fn categories(&self, user: UserId) -> Result<Vec<CategoryCount>> {
        self.bounded(|conn| {
            let mut stmt = conn.prepare(
                "SELECT fc.category, COUNT(*)
                 FROM flashcard_categories fc
                 JOIN user_flashcards uf ON uf.flashcard_id = fc.flashcard_id
                 WHERE uf.user_id = ?1
                 GROUP BY fc.category
                 ORDER BY fc.category ASC",
            )?;

            let rows = stmt.query_map(params![user.0], |row| {
                Ok(CategoryCount {
                    name: row.get(0)?,
                    count: row.get(1)?,
                })
            })?;

            let mut categories = Vec::new();
            for row in rows {
                categories.push(row?);
            }
            Ok(categories)
        })
    }

    /// Distinct sections, section types and source files among cards that
    /// match the given narrowing, each sorted ascending.
    pub fn filter_options(
        &self,
        user: UserId,
        source_file: &str,
        section_type: &str,
        hide_mastered: bool,
    ) -> Result<FilterOptions> {
        let narrowing = CardFilter {
            source_file: source_file.to_string(),
            section_type: section_type.to_string(),
            hide_mastered,
            ..CardFilter::default()
        };
        let conditions = Conditions::from_filter(user, &narrowing);

        self.bounded(|conn| {
            Ok(FilterOptions {
                sections: conditions.distinct(conn, "section")?,
                section_types: conditions.distinct(conn, "section_type")?,
                source_files: conditions.distinct(conn, "source_file")?,
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// WHERE clauses plus their bound values, numbered from `?1`.
struct Conditions {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl Conditions {
    fn from_filter(user: UserId, filter: &CardFilter) -> Self {
        let mut c = Conditions {
            clauses: Vec::new(),
            params: vec![Box::new(user.0)],
        };

        if !filter.section.is_empty() {
            match fts_query(&filter.section) {
                Some(query) => {
                    let idx = c.bind(query);
                    c.clauses.push(format!(
                        "f.id IN (SELECT rowid FROM flashcards_fts WHERE flashcards_fts MATCH ?{idx})"
                    ));
                }
                // Nothing searchable in the query, so nothing can match.
                None => c.clauses.push("0".to_string()),
            }
        }

        if !filter.section_type.is_empty() {
            let idx = c.bind(filter.section_type.clone());
            c.clauses.push(format!("unicode_lower(f.section_type) = unicode_lower(?{idx})"));
        }

        if !filter.source_file.is_empty() {
            let idx = c.bind(filter.source_file.clone());
            c.clauses.push(format!("unicode_lower(f.source_file) = unicode_lower(?{idx})"));
        }

        let wanted: BTreeSet<&str> = filter.categories.iter().map(String::as_str).collect();
        if !wanted.is_empty() {
            let placeholders: Vec<String> = wanted
                .iter()
                .map(|category| format!("?{}", c.bind(category.to_string())))
                .collect();
            c.clauses.push(format!(
                "f.id IN (
                    SELECT flashcard_id FROM flashcard_categories
                    WHERE category IN ({})
                    GROUP BY flashcard_id
                    HAVING COUNT(*) = {}
                )",
                placeholders.join(", "),
                wanted.len()
            ));
        }

        if filter.hide_mastered {
            c.clauses
                .push("COALESCE(uf.status, 'not_started') <> 'mastered'".to_string());
        }

        c
    }

    /// Bind `value` and return its placeholder number.
    fn bind(&mut self, value: impl ToSql + 'static) -> usize {
        self.params.push(Box::new(value));
        self.params.len()
    }

    fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    fn param_refs(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }

    fn count(&self, conn: &Connection) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) {LISTING_FROM} {}", self.where_clause());
        Ok(conn.query_row(&sql, self.param_refs().as_slice(), |row| row.get(0))?)
    }

    fn page(&self, conn: &Connection, page: &PageRequest) -> Result<Vec<FlashcardRow>> {
        let limit_idx = self.params.len() + 1;
        let sql = format!(
            "SELECT {FLASHCARD_COLUMNS} {LISTING_FROM} {}
             ORDER BY {}
             LIMIT ?{} OFFSET ?{}",
            self.where_clause(),
            order_by(page.sort),
            limit_idx,
            limit_idx + 1,
        );

        let limit = i64::from(page.limit());
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        let mut params: Vec<&dyn ToSql> = self.param_refs();
        params.push(&limit);
        params.push(&offset);

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params.as_slice(), row_to_flashcard)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn distinct(&self, conn: &Connection, column: &str) -> Result<Vec<String>> {
        let not_null = format!("f.{column} IS NOT NULL");
        let where_clause = if self.clauses.is_empty() {
            format!("WHERE {not_null}")
        } else {
            format!("{} AND {not_null}", self.where_clause())
        };
        let sql = format!(
            "SELECT DISTINCT f.{column} {LISTING_FROM} {where_clause} ORDER BY f.{column} ASC"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(self.param_refs().as_slice(), |row| row.get::<_, String>(0))?;

        let mut values = Vec::new();
        for row in rows {
            values.push(row?);
        }
        Ok(values)
    }
}

/// ORDER BY clause for an allow-listed sort key.  Text columns compare
/// case-insensitively.  Ascending puts absent values last, descending puts
/// them first; ties break on id.
fn order_by(sort: SortKey) -> String {
    match (sort, sort.column()) {
        (SortKey::Random, _) | (_, None) => "RANDOM()".to_string(),
        (SortKey::Id, _) => "f.id ASC".to_string(),
        (SortKey::IdDesc, _) => "f.id DESC".to_string(),
        (key, Some(column)) if key.descending() => {
            format!("unicode_lower(f.{column}) DESC NULLS FIRST, f.id ASC")
        }
        (_, Some(column)) => format!("unicode_lower(f.{column}) ASC NULLS LAST, f.id ASC"),
    }
}

/// Build an FTS5 query requiring every token of `input`.
///
/// Tokens are split on anything that is not alphanumeric, matching the
/// `unicode61` tokenizer, and each is quoted so operators in user input
/// stay literal.  Returns `None` when `input` has no tokens.
fn fts_query(input: &str) -> Option<String> {
    let tokens: Vec<String> = input
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{t}\""))
        .collect();

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}
