//! HTML views
//!
//! Askama templates for the search, detail and error pages, plus the small
//! view models they loop over. Values are turned into display strings here so
//! the templates stay free of logic.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use caseforge_common::{
    db::{FilterOptions, SearchPage},
    errors::AppError,
    record::{CaseRecord, CASE_NUMBER, DECISION_DATE, GENERATED_ID},
    CaseFilter,
};
use chrono::NaiveDate;

/// One row of the results table
pub struct ResultRow {
    pub case_id: String,
    pub cells: Vec<String>,
}

/// One `<option>` of a select box
pub struct SelectOption {
    pub value: String,
    pub selected: bool,
}

/// One label/value line of the detail page
pub struct DetailField {
    pub name: String,
    pub value: String,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub filter: CaseFilter,
    pub case_types: Vec<SelectOption>,
    pub result_types: Vec<SelectOption>,
    pub countries: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<ResultRow>,
    pub page: usize,
    pub page_size: usize,
    pub has_next_page: bool,
    pub prev_query: String,
    pub next_query: String,
    /// Filters and page carried into detail links
    pub detail_query: String,
    pub export_query: String,
    pub errors: Vec<String>,
}

impl IndexTemplate {
    pub fn new(
        filter: CaseFilter,
        options: FilterOptions,
        columns: Vec<String>,
        page_size: usize,
        results: Option<SearchPage>,
        errors: Vec<String>,
    ) -> Self {
        let (page, has_next_page, records) = match results {
            Some(results) => (results.page, results.has_next_page, results.rows),
            None => (1, false, Vec::new()),
        };

        let rows = records
            .iter()
            .map(|record| ResultRow {
                case_id: record.generated_id().unwrap_or_default().to_string(),
                cells: columns.iter().map(|c| display_value(record, c)).collect(),
            })
            .collect();

        Self {
            case_types: select_options(options.case_types, &filter.case_type),
            result_types: select_options(options.result_types, &filter.result_type),
            countries: options.countries,
            columns,
            rows,
            page,
            page_size,
            has_next_page,
            prev_query: filter.to_query_string(Some(page.saturating_sub(1).max(1))),
            next_query: filter.to_query_string(Some(page + 1)),
            detail_query: filter.to_query_string(Some(page)),
            export_query: filter.to_query_string(None),
            errors,
            filter,
        }
    }
}

#[derive(Template)]
#[template(path = "case_detail.html")]
pub struct CaseDetailTemplate {
    pub case_id: String,
    pub title: String,
    pub fields: Vec<DetailField>,
    /// Query string of the search page the user came from
    pub back_query: String,
}

impl CaseDetailTemplate {
    pub fn new(case_id: &str, record: &CaseRecord, columns: &[String], back_query: String) -> Self {
        let title = match record.text(CASE_NUMBER) {
            number if number.is_empty() => "未知案号".to_string(),
            number => number,
        };

        let fields = columns
            .iter()
            .filter(|column| column.as_str() != GENERATED_ID)
            .map(|column| DetailField {
                name: column.clone(),
                value: record.text(column),
            })
            .collect();

        Self {
            case_id: case_id.to_string(),
            title,
            fields,
            back_query,
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub message: String,
}

/// Render a template into an HTML body
pub fn render<T: Template>(template: &T) -> Result<Html<String>, AppError> {
    template.render().map(Html).map_err(|e| AppError::Template {
        message: e.to_string(),
    })
}

/// HTML error page with the given status and user-facing message
pub fn error_page(status: StatusCode, message: &str) -> Response {
    let template = ErrorTemplate {
        status: status.as_u16(),
        message: message.to_string(),
    };

    match render(&template) {
        Ok(body) => (status, body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render error page");
            (status, message.to_string()).into_response()
        }
    }
}

/// Handler error rendered as an HTML page.
///
/// The underlying error is logged; the page only shows `message`. Client
/// errors keep their status, everything else is a 500.
pub struct PageError {
    error: AppError,
    message: String,
}

impl PageError {
    pub fn new(error: AppError, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        self.error.log();

        let status = if self.error.is_client_error() {
            self.error.status_code()
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        error_page(status, &self.message)
    }
}

fn select_options(values: Vec<String>, current: &str) -> Vec<SelectOption> {
    values
        .into_iter()
        .map(|value| SelectOption {
            selected: value == current,
            value,
        })
        .collect()
}

/// Cell text; decision timestamps are cut to the day
fn display_value(record: &CaseRecord, column: &str) -> String {
    let text = record.text(column);
    if column == DECISION_DATE {
        if let Some(day) = text.get(..10) {
            if NaiveDate::parse_from_str(day, "%Y-%m-%d").is_ok() {
                return day.to_string();
            }
        }
    }
    text
}
