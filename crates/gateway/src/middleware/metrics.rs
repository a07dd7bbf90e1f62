//! Request metrics middleware

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use caseforge_common::metrics::RequestMetrics;

/// Count and time every routed request, labelled by route template
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let metrics = RequestMetrics::start(request.method().as_str(), &endpoint);
    let response = next.run(request).await;
    metrics.finish(response.status().as_u16());

    response
}

#[cfg(test)]
mod tests {
    use crate::test_support;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_tracked_routes_still_respond() {
        let response = test_support::get(test_support::state(), "/case/0000000000").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
