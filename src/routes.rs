//! HTTP router construction.
//!
//! Assembles the read-only JSON API over the [`QueryService`]. Every response
//! uses the same envelope:
//!
//! ```text
//! { "success": true,  "data": { ... } }
//! { "success": false, "message": "..." }
//! ```
//!
//! Requests the extractors cannot decode are answered in the same envelope,
//! and a trailing slash is ignored when matching routes.

use crate::collection::{Collection, ScrapeStatus};
use crate::models::University;
use crate::query::{QueryService, UniversityFilter};
use axum::Json;
use axum::Router;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::NormalizePath;
use tracing::debug;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub queries: QueryService,
    pub collection: Arc<Collection>,
}

impl AppState {
    pub fn new(collection: Arc<Collection>) -> Self {
        Self {
            queries: QueryService::new(Arc::clone(&collection)),
            collection,
        }
    }
}

/// Response envelope shared by all endpoints.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UniversitiesData {
    pub universities: Vec<University>,
}

#[derive(Debug, Serialize)]
pub struct UniversityData {
    pub university: University,
}

#[derive(Debug, Serialize)]
pub struct StatusData {
    pub status: ScrapeStatus,
}

/// A request that could not be decoded, reported with the rejection's status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(Envelope::<()>::failure(self.message))).into_response()
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// The single percent-decoded path parameter of a route.
#[derive(Debug)]
pub struct Segment(pub String);

impl<S> FromRequestParts<S> for Segment
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<String>::from_request_parts(parts, state).await?;
        Ok(Segment(value))
    }
}

/// List filters read from the query string. Repeated keys keep their first value.
#[derive(Debug)]
pub struct Filter(pub UniversityFilter);

impl<S> FromRequestParts<S> for Filter
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state).await?;
        Ok(Filter(UniversityFilter::from_pairs(pairs)))
    }
}

/// The served application: the router behind trailing-slash normalization.
pub type App = NormalizePath<Router>;

type ListResponse = Json<Envelope<UniversitiesData>>;

fn list_response(universities: Vec<University>) -> ListResponse {
    Json(Envelope::ok(UniversitiesData { universities }))
}

/// Build the complete application.
pub fn build_router(state: AppState) -> App {
    // Static segments take precedence over `{identifier}`.
    let router = Router::new()
        .route("/api/universities", get(list_universities))
        .route("/api/universities/city/{city}", get(universities_by_city))
        .route("/api/universities/state/{state}", get(universities_by_state))
        .route("/api/universities/private", get(private_universities))
        .route(
            "/api/universities/private/state/{state}",
            get(private_universities_by_state),
        )
        .route("/api/universities/{identifier}", get(university_by_identifier))
        .route("/api/status", get(scrape_status))
        .with_state(state)
        .layer(CorsLayer::permissive());
    NormalizePath::trim_trailing_slash(router)
}

async fn list_universities(State(state): State<AppState>, Filter(filter): Filter) -> ListResponse {
    debug!(?filter, "Listing universities");
    list_response(state.queries.list(&filter))
}

async fn universities_by_city(State(state): State<AppState>, Segment(city): Segment) -> ListResponse {
    list_response(state.queries.by_city(&city))
}

async fn universities_by_state(State(state): State<AppState>, Segment(name): Segment) -> ListResponse {
    list_response(state.queries.by_state(&name))
}

async fn private_universities(State(state): State<AppState>) -> ListResponse {
    list_response(state.queries.private_only())
}

async fn private_universities_by_state(
    State(state): State<AppState>,
    Segment(name): Segment,
) -> ListResponse {
    list_response(state.queries.private_by_state(&name))
}

async fn university_by_identifier(
    State(state): State<AppState>,
    Segment(identifier): Segment,
) -> Response {
    match state.queries.by_identifier(&identifier) {
        Some(university) => Json(Envelope::ok(UniversityData { university })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(Envelope::<UniversityData>::failure("University not found")),
        )
            .into_response(),
    }
}

async fn scrape_status(State(state): State<AppState>) -> Json<Envelope<StatusData>> {
    Json(Envelope::ok(StatusData {
        status: state.collection.status(),
    }))
}
