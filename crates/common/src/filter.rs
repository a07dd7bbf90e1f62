//! Search filters
//!
//! Maps the search form's query parameters onto [`CaseQuery`] predicates and
//! back onto query strings for pagination and "back" links.

use crate::db::CaseQuery;
use crate::errors::{AppError, Result};
use crate::record::{CASE_NUMBER, CASE_TYPE, COURT, DECISION_DATE, OUTCOME, SOURCE_COUNTRY};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Search form values. Empty strings mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CaseFilter {
    /// Case number substring
    #[serde(default)]
    pub anhao: String,

    /// Court substring
    #[serde(default)]
    pub fayuan: String,

    /// First decision day, `YYYY-MM-DD`
    #[serde(default)]
    pub date_start: String,

    /// Last decision day, `YYYY-MM-DD`
    #[serde(default)]
    pub date_end: String,

    #[serde(default)]
    pub case_type: String,

    #[serde(default)]
    pub result_type: String,

    /// Source country substring
    #[serde(default)]
    pub country: String,
}

impl CaseFilter {
    /// Trim surrounding whitespace from every value
    pub fn normalized(self) -> Self {
        Self {
            anhao: self.anhao.trim().to_string(),
            fayuan: self.fayuan.trim().to_string(),
            date_start: self.date_start.trim().to_string(),
            date_end: self.date_end.trim().to_string(),
            case_type: self.case_type.trim().to_string(),
            result_type: self.result_type.trim().to_string(),
            country: self.country.trim().to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs().is_empty()
    }

    /// Add this filter's predicates to `query`.
    ///
    /// Day bounds are widened to the whole day in `timezone_offset`.
    pub fn apply(&self, mut query: CaseQuery, timezone_offset: &str) -> Result<CaseQuery> {
        if !self.anhao.is_empty() {
            query = query.contains(CASE_NUMBER, &self.anhao);
        }
        if !self.fayuan.is_empty() {
            query = query.contains(COURT, &self.fayuan);
        }
        if !self.case_type.is_empty() {
            query = query.eq(CASE_TYPE, &self.case_type);
        }
        if !self.result_type.is_empty() {
            query = query.eq(OUTCOME, &self.result_type);
        }
        if !self.country.is_empty() {
            query = query.contains(SOURCE_COUNTRY, &self.country);
        }
        if let Some(day) = parse_day("date_start", &self.date_start)? {
            query = query.gte(DECISION_DATE, format!("{}T00:00:00{}", day, timezone_offset));
        }
        if let Some(day) = parse_day("date_end", &self.date_end)? {
            query = query.lte(DECISION_DATE, format!("{}T23:59:59{}", day, timezone_offset));
        }
        Ok(query)
    }

    /// Non-empty `(name, value)` pairs in form order
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("anhao", self.anhao.as_str()),
            ("fayuan", self.fayuan.as_str()),
            ("date_start", self.date_start.as_str()),
            ("date_end", self.date_end.as_str()),
            ("case_type", self.case_type.as_str()),
            ("result_type", self.result_type.as_str()),
            ("country", self.country.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect()
    }

    /// Percent-encoded query string, optionally with a page number
    pub fn to_query_string(&self, page: Option<usize>) -> String {
        let mut parts: Vec<String> = self
            .pairs()
            .into_iter()
            .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
            .collect();
        if let Some(page) = page {
            parts.push(format!("page={}", page));
        }
        parts.join("&")
    }
}

fn parse_day(field: &str, value: &str) -> Result<Option<NaiveDate>> {
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| AppError::InvalidDate {
            field: field.to_string(),
            value: value.to_string(),
        })
}

/// Page number from a raw query value; anything unusable means page 1
pub fn parse_page(raw: Option<&str>) -> usize {
    raw.and_then(|p| p.trim().parse::<usize>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

/// Inclusive, zero-based row range of a 1-based page
pub fn page_range(page: usize, page_size: usize) -> (usize, usize) {
    let from = page.saturating_sub(1) * page_size;
    (from, from + page_size.max(1) - 1)
}
