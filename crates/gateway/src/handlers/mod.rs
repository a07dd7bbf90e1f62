//! Page and operations handlers

pub mod cases;
pub mod export;
pub mod health;
pub mod search;

use caseforge_common::{
    errors::{AppError, Result},
    filter::parse_page,
    CaseFilter,
};
use serde::Deserialize;
use validator::Validate;

/// Search form query parameters, shared by the search, detail and export pages
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SearchParams {
    #[validate(length(max = 200))]
    pub anhao: Option<String>,

    #[validate(length(max = 200))]
    pub fayuan: Option<String>,

    #[validate(length(max = 32))]
    pub date_start: Option<String>,

    #[validate(length(max = 32))]
    pub date_end: Option<String>,

    #[validate(length(max = 100))]
    pub case_type: Option<String>,

    #[validate(length(max = 100))]
    pub result_type: Option<String>,

    #[validate(length(max = 200))]
    pub country: Option<String>,

    /// Raw page number; anything unusable means page 1
    pub page: Option<String>,
}

impl SearchParams {
    /// Reject oversized values before they reach the store
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(|e| AppError::Validation {
            message: e.to_string(),
            field: e.field_errors().keys().next().map(|f| f.to_string()),
        })
    }

    pub fn filter(&self) -> CaseFilter {
        let value = |v: &Option<String>| v.clone().unwrap_or_default();
        CaseFilter {
            anhao: value(&self.anhao),
            fayuan: value(&self.fayuan),
            date_start: value(&self.date_start),
            date_end: value(&self.date_end),
            case_type: value(&self.case_type),
            result_type: value(&self.result_type),
            country: value(&self.country),
        }
        .normalized()
    }

    pub fn page(&self) -> usize {
        parse_page(self.page.as_deref())
    }
}
