//! HTTP surface over the graph service.
//!
//! Handlers resolve the caller identity, run the synchronous service call on the
//! blocking pool, and attach the consumed quota as `X-RateLimit-*` headers.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use ebb::error::GraphError;
use ebb::graph::requests::{AddObservationRequest, CreateEntityRequest, CreateRelationRequest};
use ebb::graph::{GraphService, Metered};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    service: Arc<GraphService>,
    trust_forwarded_for: bool,
}

impl AppState {
    pub fn new(service: Arc<GraphService>, trust_forwarded_for: bool) -> Self {
        Self {
            service,
            trust_forwarded_for,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/entities", post(create_entity))
        .route("/entities/{name}", get(get_entity))
        .route("/entities/{name}/access", post(record_access))
        .route("/observations", post(add_observation))
        .route("/relations", post(create_relation))
        .route("/search", get(search))
        .route("/stats", get(stats))
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    Graph(GraphError),
    Task(tokio::task::JoinError),
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        Self::Graph(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Graph(GraphError::invalid(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Graph(GraphError::invalid(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Graph(GraphError::invalid(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Graph(err) => {
                let status = match &err {
                    GraphError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                    GraphError::NotFound(_) => StatusCode::NOT_FOUND,
                    GraphError::Conflict(_) => StatusCode::CONFLICT,
                    GraphError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                    GraphError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                };
                let mut response = (status, Json(err.to_body())).into_response();
                if let GraphError::RateLimited {
                    retry_after_secs, ..
                } = err
                {
                    response
                        .headers_mut()
                        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                }
                response
            }
            ApiError::Task(e) => {
                tracing::error!(error = %e, "graph task failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({
                        "error": format!("graph task failed: {e}"),
                        "kind": "internal",
                    })),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct EntityQuery {
    #[serde(default)]
    include_expired: bool,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(alias = "query")]
    q: Option<String>,
}

/// Peer address, or the first `X-Forwarded-For` hop when trusted.
fn caller_identity(state: &AppState, headers: &HeaderMap, peer: SocketAddr) -> String {
    if state.trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }
    peer.ip().to_string()
}

/// Run a service call on the blocking pool with the caller and a fresh `now`.
async fn run<T, F>(state: &AppState, caller: String, call: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&GraphService, &str, chrono::DateTime<Utc>) -> Result<T, GraphError>
        + Send
        + 'static,
{
    let service = Arc::clone(&state.service);
    tokio::task::spawn_blocking(move || call(&*service, caller.as_str(), Utc::now()))
        .await
        .map_err(ApiError::Task)?
        .map_err(ApiError::Graph)
}

fn metered<T: Serialize>(status: StatusCode, metered: Metered<T>) -> Response {
    let mut response = (status, Json(metered.value)).into_response();
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(metered.quota.limit));
    headers.insert(
        "x-ratelimit-remaining",
        HeaderValue::from(metered.quota.remaining),
    );
    response
}

async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let service = Arc::clone(&state.service);
    let document = tokio::task::spawn_blocking(move || service.snapshot())
        .await
        .map_err(ApiError::Task)??;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "entities": document.entities.len(),
    })))
}

async fn create_entity(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<CreateEntityRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let caller = caller_identity(&state, &headers, peer);
    let result = run(&state, caller, move |svc, caller, now| {
        svc.create_entity(caller, request, now)
    })
    .await?;
    Ok(metered(StatusCode::CREATED, result))
}

async fn add_observation(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<AddObservationRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let caller = caller_identity(&state, &headers, peer);
    let result = run(&state, caller, move |svc, caller, now| {
        svc.add_observation(caller, request, now)
    })
    .await?;
    Ok(metered(StatusCode::CREATED, result))
}

async fn create_relation(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<CreateRelationRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let caller = caller_identity(&state, &headers, peer);
    let result = run(&state, caller, move |svc, caller, now| {
        svc.create_relation(caller, request, now)
    })
    .await?;
    Ok(metered(StatusCode::CREATED, result))
}

async fn get_entity(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<EntityQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Path(name) = path?;
    let Query(query) = query?;
    let caller = caller_identity(&state, &headers, peer);
    let result = run(&state, caller, move |svc, caller, now| {
        svc.get_entity(caller, &name, query.include_expired, now)
    })
    .await?;
    Ok(metered(StatusCode::OK, result))
}

async fn record_access(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(name) = path?;
    let caller = caller_identity(&state, &headers, peer);
    let result = run(&state, caller, move |svc, caller, now| {
        svc.record_access(caller, &name, now)
    })
    .await?;
    Ok(metered(StatusCode::OK, result))
}

async fn search(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let caller = caller_identity(&state, &headers, peer);
    let result = run(&state, caller, move |svc, caller, now| {
        svc.search(caller, query.q.as_deref(), now)
    })
    .await?;
    Ok(metered(StatusCode::OK, result))
}

async fn stats(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let caller = caller_identity(&state, &headers, peer);
    let result = run(&state, caller, move |svc, caller, now| svc.stats(caller, now)).await?;
    Ok(metered(StatusCode::OK, result))
}
