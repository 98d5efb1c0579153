use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::Router;
use serde::Deserialize;
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use dispatcher_core::error::DispatchError;
use dispatcher_core::forwarder::{ForwardOutcome, TaskRequest};

use crate::state::AppState;
use crate::ws;

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                http::Method::GET,
                http::Method::POST,
                http::Method::PUT,
                http::Method::PATCH,
                http::Method::DELETE,
                http::Method::OPTIONS,
            ])
            .allow_headers(Any)
    } else {
        let origins = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect::<Vec<_>>();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                http::Method::GET,
                http::Method::POST,
                http::Method::PUT,
                http::Method::PATCH,
                http::Method::DELETE,
                http::Method::OPTIONS,
            ])
            .allow_headers(Any)
    };

    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/task", axum::routing::post(task))
        .route(
            "/algorithm",
            get(get_algorithm).put(set_algorithm).post(set_algorithm),
        )
        .route("/workers/{name}", patch(patch_worker))
        .route(
            "/workers/{name}/config",
            get(get_worker_config)
                .put(proxy_worker_config)
                .post(proxy_worker_config),
        )
        .route("/metrics", get(metrics))
        .route("/ws", get(ws::upgrade))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "healthy"}))
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.snapshot())
}

async fn task(State(state): State<AppState>, body: Bytes) -> Response {
    let task = TaskRequest::from_bytes(&body);
    match state.forwarder.dispatch(task).await {
        ForwardOutcome::NoWorkers => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": DispatchError::NoWorkersAvailable.to_string()})),
        )
            .into_response(),
        ForwardOutcome::Success(body) => (StatusCode::OK, Json(body)).into_response(),
        ForwardOutcome::Failure => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "Worker failed"})),
        )
            .into_response(),
    }
}

async fn get_algorithm(State(state): State<AppState>) -> impl IntoResponse {
    let algorithm = state.registry.algorithm();
    let available: Vec<&'static str> = dispatcher_core::registry::Algorithm::ALL
        .iter()
        .map(|a| a.as_str())
        .collect();
    Json(json!({"algorithm": algorithm.as_str(), "available": available}))
}

#[derive(Debug, Deserialize)]
struct SetAlgorithmBody {
    algorithm: String,
}

async fn set_algorithm(State(state): State<AppState>, body: Bytes) -> Response {
    let Ok(parsed) = serde_json::from_slice::<SetAlgorithmBody>(&body) else {
        return bad_request("invalid request body");
    };

    match state.registry.set_algorithm(&parsed.algorithm) {
        Ok(algorithm) => {
            state.broadcaster.request_broadcast(&state.registry);
            Json(json!({"algorithm": algorithm.as_str()})).into_response()
        }
        Err(_) => bad_request(&format!("unknown algorithm '{}'", parsed.algorithm)),
    }
}

#[derive(Debug, Deserialize, Default)]
struct PatchWorkerBody {
    enabled: Option<bool>,
    weight: Option<i64>,
}

async fn patch_worker(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let patch: PatchWorkerBody = if body.is_empty() {
        PatchWorkerBody::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(p) => p,
            Err(_) => return bad_request("invalid request body"),
        }
    };

    if state.registry.update_worker(&name, patch.enabled, patch.weight) {
        state.broadcaster.request_broadcast(&state.registry);
        Json(json!({"status": "updated"})).into_response()
    } else {
        not_found(&DispatchError::UnknownWorker(name).to_string())
    }
}

async fn get_worker_config(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let worker = match state.registry.worker_or_err(&name) {
        Ok(worker) => worker,
        Err(err) => return not_found(&err.to_string()),
    };

    let url = format!("{}/config", worker.url.trim_end_matches('/'));
    match state.config_proxy_client.get(&url).send().await {
        Ok(resp) => {
            let mut body: Value = resp.json().await.unwrap_or_else(|_| json!({}));
            if let Value::Object(map) = &mut body {
                map.insert("worker".into(), json!(worker.name));
            }
            Json(body).into_response()
        }
        Err(_) => bad_gateway("worker unreachable"),
    }
}

async fn proxy_worker_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
    method: axum::http::Method,
    body: Bytes,
) -> Response {
    let worker = match state.registry.worker_or_err(&name) {
        Ok(worker) => worker,
        Err(err) => return not_found(&err.to_string()),
    };

    let url = format!("{}/config", worker.url.trim_end_matches('/'));
    let request = match method {
        axum::http::Method::PUT => state.config_proxy_client.put(&url),
        _ => state.config_proxy_client.post(&url),
    };

    match request.body(body.to_vec()).header("content-type", "application/json").send().await {
        Ok(resp) => {
            let body: Value = resp.json().await.unwrap_or_else(|_| json!({}));
            Json(body).into_response()
        }
        Err(_) => bad_gateway("worker unreachable"),
    }
}

async fn metrics(State(state): State<AppState>) -> Response {
    (
        [(http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.encode(),
    )
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"error": message}))).into_response()
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": message}))).into_response()
}

fn bad_gateway(message: &str) -> Response {
    (StatusCode::BAD_GATEWAY, Json(json!({"error": message}))).into_response()
}
