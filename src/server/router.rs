use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use action_flow::FlowResult;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use super::state::ServeState;
use crate::request::RawRunRequest;

pub fn build_router(state: ServeState) -> Router {
    Router::new()
        .route("/run", post(run_handler))
        .route("/health", get(health_handler))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

async fn health_handler(State(state): State<ServeState>) -> impl IntoResponse {
    let snapshot = state.health_snapshot();
    Json(json!({
        "status": "ok",
        "in_flight": snapshot.in_flight,
        "completed": snapshot.completed,
        "succeeded": snapshot.succeeded,
    }))
}

async fn run_handler(
    State(state): State<ServeState>,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Response {
    let mut raw = RawRunRequest::from_pairs(query);
    // the body is only consulted when the query lacks an identifier
    if !raw.has_identifiers() {
        raw = raw.merge(RawRunRequest::parse_body(&body));
    }

    let request = match raw.normalize(&state.defaults) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "rejected run request");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "detail": err.to_string() })),
            )
                .into_response();
        }
    };

    info!(
        reg_no = %request.reg_no,
        rto_value = %request.rto_value,
        timeout_sec = request.timeout_sec,
        "run accepted"
    );
    state.health.run_started();
    let (runner, health) = (state.runner.clone(), state.health.clone());
    // the run outlives a dropped connection and is always counted once
    let task = tokio::spawn(async move {
        let result = runner.execute(&request).await;
        health.run_finished(result.success);
        result
    });
    let result = match task.await {
        Ok(result) => result,
        Err(err) => {
            warn!(error = %err, "run task failed");
            state.health.run_finished(false);
            FlowResult::failure([format!("run_error: {err}")])
        }
    };

    Json(result).into_response()
}
