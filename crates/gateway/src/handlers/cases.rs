//! Case detail handler

use axum::{
    extract::{Path, Query, State},
    response::Html,
};

use super::SearchParams;
use crate::views::{render, CaseDetailTemplate, PageError};
use crate::AppState;
use caseforge_common::{errors::AppError, record::CASE_NUMBER};

const CASE_NOT_FOUND: &str = "案例不存在";
const DETAIL_FAILED: &str = "获取案例详情失败";

/// Detail page of the case whose derived id is `case_id`
pub async fn case_detail(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Html<String>, PageError> {
    tracing::info!(case_id = %case_id, "Case detail requested");

    let record = state
        .repo
        .find_by_case_id(&case_id)
        .await
        .map_err(|e| PageError::new(e, DETAIL_FAILED))?
        .ok_or_else(|| {
            PageError::new(
                AppError::CaseNotFound {
                    case_id: case_id.clone(),
                },
                CASE_NOT_FOUND,
            )
        })?;

    let layout = state.repo.table_columns().await;
    let back_query = params.filter().to_query_string(Some(params.page()));

    tracing::info!(
        case_id = %case_id,
        case_number = %record.text(CASE_NUMBER),
        "Case found"
    );

    render(&CaseDetailTemplate::new(&case_id, &record, &layout.columns, back_query))
        .map_err(|e| PageError::new(e, DETAIL_FAILED))
}
