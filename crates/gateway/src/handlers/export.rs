//! CSV export handler

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Local;

use super::SearchParams;
use crate::AppState;
use caseforge_common::{
    errors::Result,
    export::{content_disposition, write_csv},
};

const EXPORT_FAILED: &str = "导出失败";

/// Every case matching the search form, as a CSV download
pub async fn export_cases(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Response {
    match build_export(&state, &params).await {
        Ok(response) => response,
        Err(e) => {
            e.log();
            (StatusCode::INTERNAL_SERVER_ERROR, EXPORT_FAILED).into_response()
        }
    }
}

async fn build_export(state: &AppState, params: &SearchParams) -> Result<Response> {
    params.check()?;
    let filter = params.filter();

    let rows = state.repo.export(&filter).await?;
    let fallback = if rows.is_empty() {
        state.repo.table_columns().await.columns
    } else {
        Vec::new()
    };
    let body = write_csv(&rows, &fallback)?;

    tracing::info!(
        rows = rows.len(),
        bytes = body.len(),
        filters = filter.pairs().len(),
        "Export completed"
    );

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (header::CONTENT_DISPOSITION, content_disposition(&Local::now())),
    ];
    Ok((headers, body).into_response())
}
