//! Search request model and validation

use crate::store::{default_match_fields, DateRange, MultiMatch, MAX_RESULT_WINDOW};
use crate::search::QueryError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Page size used when the caller gives none
pub const DEFAULT_LIMIT: usize = 10;

/// A paged full-text search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub text: String,
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Four-digit calendar year restricting the `date` field
    #[serde(default)]
    pub year: Option<String>,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl QueryRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            skip: 0,
            limit: DEFAULT_LIMIT,
            year: None,
        }
    }

    pub fn with_page(mut self, skip: usize, limit: usize) -> Self {
        self.skip = skip;
        self.limit = limit;
        self
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if self.text.trim().is_empty() {
            return Err(QueryError::InvalidRequest(
                "search text must not be empty".to_string(),
            ));
        }
        if self.limit == 0 {
            return Err(QueryError::InvalidRequest(
                "limit must be greater than zero".to_string(),
            ));
        }
        self.window_end()?;
        self.year_range()?;
        Ok(())
    }

    /// `skip + limit`, bounded by the store's result window
    pub fn window_end(&self) -> Result<usize, QueryError> {
        self.skip
            .checked_add(self.limit)
            .filter(|end| *end <= MAX_RESULT_WINDOW)
            .ok_or_else(|| {
                QueryError::InvalidRequest(format!(
                    "skip + limit must not exceed {}",
                    MAX_RESULT_WINDOW
                ))
            })
    }

    /// Inclusive range covering the requested year, if any
    pub fn year_range(&self) -> Result<Option<DateRange>, QueryError> {
        self.year.as_deref().map(year_range).transpose()
    }

    /// Title-weighted multi-field match on the raw text
    pub fn match_clause(&self) -> MultiMatch {
        match_clause(&self.text)
    }
}

pub(crate) fn match_clause(text: &str) -> MultiMatch {
    MultiMatch {
        query: text.to_string(),
        fields: default_match_fields(),
    }
}

/// Calendar year written as exactly four ASCII digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Year(i32);

impl Year {
    pub fn value(self) -> i32 {
        self.0
    }

    /// `[year-01-01, year-12-31]`
    pub fn range(self) -> DateRange {
        DateRange {
            gte: NaiveDate::from_ymd_opt(self.0, 1, 1).unwrap_or(NaiveDate::MIN),
            lte: NaiveDate::from_ymd_opt(self.0, 12, 31).unwrap_or(NaiveDate::MAX),
        }
    }
}

impl FromStr for Year {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(QueryError::InvalidRequest(format!(
                "year must be four digits, got '{}'",
                s
            )));
        }
        s.parse()
            .map(Year)
            .map_err(|_| QueryError::InvalidRequest(format!("invalid year '{}'", s)))
    }
}

/// Inclusive date range of a four-digit year string
pub fn year_range(year: &str) -> Result<DateRange, QueryError> {
    Ok(year.parse::<Year>()?.range())
}
