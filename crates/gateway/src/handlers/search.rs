//! Search page handler

use axum::{
    extract::{Query, State},
    response::Html,
};

use super::SearchParams;
use crate::views::{render, IndexTemplate, PageError};
use crate::AppState;
use caseforge_common::{db::SearchPage, errors::Result, CaseFilter};

/// Search page.
///
/// Failures do not change the status: the page is rendered with the error
/// message and no rows.
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> std::result::Result<Html<String>, PageError> {
    let filter = params.filter();

    let (results, errors) = match run_search(&state, &params, &filter).await {
        Ok(results) => (Some(results), Vec::new()),
        Err(e) => {
            e.log();
            (None, vec![format!("搜索过程中发生错误: {}", e)])
        }
    };

    let options = state.repo.filter_options().await;
    let search = state.repo.search_config();

    let view = IndexTemplate::new(
        filter,
        options,
        search.display_columns.clone(),
        search.page_size,
        results,
        errors,
    );

    render(&view).map_err(|e| PageError::new(e, "页面渲染失败"))
}

async fn run_search(state: &AppState, params: &SearchParams, filter: &CaseFilter) -> Result<SearchPage> {
    params.check()?;
    state.repo.search_page(filter, params.page()).await
}
