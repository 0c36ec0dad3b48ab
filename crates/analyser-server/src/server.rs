//! Axum router and the analysis handler

use crate::error::{ServerError, ServerResult};
use crate::query::AnalyseQuery;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use s3_analyser::analysis::{self, Analyser};
use s3_analyser::ReportFormat;
use tower_http::trace::TraceLayer;

/// Build the router
///
/// Only `/` is served; anything else, `/favicon.ico` included, is a 404.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(analyse_handler).head(head_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn head_handler() -> impl IntoResponse {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")])
}

async fn not_found_handler(uri: Uri) -> ServerError {
    tracing::debug!("No route for {}", uri.path());
    ServerError::NotFound
}

/// `GET /`: run an analysis and return its report
async fn analyse_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AnalyseQuery>,
) -> ServerResult<Response> {
    if query.token.as_deref() != Some(&*state.token) {
        return Err(ServerError::Unauthorized);
    }

    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let params = query.validate(accept)?;

    if params.echo {
        return Ok(text_response(ReportFormat::Plain, params.command_line()));
    }

    let mut config = (*state.config).clone();
    config.format = params.format;
    if let Some(unit) = params.unit {
        config.unit = unit;
    }
    if params.prefix.is_some() {
        config.prefix = params.prefix.clone();
    }
    if params.concurrency.is_some() {
        config.concurrency = params.concurrency;
    }

    let ctx = state.lock.begin(config.concurrency, state.gauges.clone())?;
    tracing::info!("Starting analysis: {}", params.command_line());

    let storage = state.storage.clone();
    let metrics = state.metrics.clone();
    let report = tokio::task::spawn_blocking(move || {
        let analyser = Analyser::new(&*storage, &*metrics);
        analysis::run(&ctx, &analyser, &config)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("analysis task failed: {}", e)))??;

    Ok(text_response(params.format, report))
}

fn text_response(format: ReportFormat, body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, format.content_type())],
        body,
    )
        .into_response()
}
