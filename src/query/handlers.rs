//! HTTP handlers over the resolver.
//!
//! Store calls block, so every handler hops onto the blocking pool before
//! touching the resolver.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use kladr::{GeoObject, GeoStore, Level, ResolveError, Resolved, Resolver, SearchResult};

pub type DynStore = Box<dyn GeoStore>;

/// Application state shared across handlers
pub struct AppState {
    pub resolver: Resolver<DynStore>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/", get(regions_handler))
        .route("/resolve/{code}", get(resolve_handler))
        .route("/region/{code}", get(region_handler))
        .route("/area/{code}", get(area_handler))
        .route("/city/{code}", get(city_handler))
        .route("/settlement/{code}", get(settlement_handler))
        .route("/search", get(search_handler))
        .route("/streets/{code}", get(streets_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handler error mapped onto a JSON body.
#[derive(Debug)]
pub enum ApiError {
    Resolve(ResolveError),
    WrongLevel {
        code: String,
        expected: Level,
        found: Level,
    },
    Worker(tokio::task::JoinError),
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        ApiError::Resolve(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Resolve(err) if err.is_caller_error() => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Resolve(err @ ResolveError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            ApiError::WrongLevel {
                code,
                expected,
                found,
            } => (
                StatusCode::NOT_FOUND,
                format!("{code} resolves to level {found}, expected {expected}"),
            ),
            ApiError::Resolve(err) => {
                tracing::error!("Resolver failed: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Worker(err) => {
                tracing::error!("Blocking task failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Run a resolver call on the blocking pool.
async fn blocking<T, F>(state: &Arc<AppState>, call: F) -> Result<T, ApiError>
where
    F: FnOnce(&Resolver<DynStore>) -> Result<T, ResolveError> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || call(&state.resolver))
        .await
        .map_err(ApiError::Worker)?
        .map_err(ApiError::from)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Health check endpoint
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Top-level listing of regions
async fn regions_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GeoObject>>, ApiError> {
    let regions = blocking(&state, |resolver| resolver.list_regions()).await?;
    Ok(Json(regions))
}

async fn resolve_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Resolved>, ApiError> {
    let resolved = blocking(&state, move |resolver| resolver.resolve(&code)).await?;
    Ok(Json(resolved))
}

/// Resolve and insist on the level named by the route.
async fn resolve_level(
    state: &Arc<AppState>,
    code: String,
    expected: Level,
) -> Result<Json<Resolved>, ApiError> {
    let resolved = blocking(state, move |resolver| resolver.resolve(&code)).await?;
    if resolved.level() != expected {
        return Err(ApiError::WrongLevel {
            code: resolved.object().id.clone(),
            expected,
            found: resolved.level(),
        });
    }
    Ok(Json(resolved))
}

async fn region_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Resolved>, ApiError> {
    resolve_level(&state, code, Level::Region).await
}

async fn area_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Resolved>, ApiError> {
    resolve_level(&state, code, Level::Area).await
}

async fn city_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Resolved>, ApiError> {
    resolve_level(&state, code, Level::City).await
}

async fn settlement_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Resolved>, ApiError> {
    resolve_level(&state, code, Level::Settlement).await
}

#[derive(Deserialize)]
struct SearchQueryParams {
    /// Name or LIKE pattern, missing is treated as blank
    geo_object_name: Option<String>,
    /// Scope code, only used when `local_search=on`
    code: Option<String>,
    local_search: Option<String>,
}

impl SearchQueryParams {
    fn scope(&self) -> Option<String> {
        if self.local_search.as_deref() != Some("on") {
            return None;
        }
        self.code.clone().filter(|code| !code.is_empty())
    }
}

/// Name search across all levels
async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQueryParams>,
) -> Result<Json<SearchResult>, ApiError> {
    let scope = params.scope();
    let name = params.geo_object_name.unwrap_or_default();
    let result = blocking(&state, move |resolver| {
        resolver.search(&name, scope.as_deref())
    })
    .await?;
    Ok(Json(result))
}

#[derive(Deserialize)]
struct StreetQueryParams {
    name: Option<String>,
}

/// Streets of a place filtered by name
async fn streets_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(params): Query<StreetQueryParams>,
) -> Result<Json<Vec<GeoObject>>, ApiError> {
    let name = params.name.unwrap_or_else(|| "%".to_string());
    let streets = blocking(&state, move |resolver| {
        resolver.search_streets(&code, &name)
    })
    .await?;
    Ok(Json(streets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use kladr::MemoryStore;
    use tower::ServiceExt;

    fn app(store: MemoryStore) -> Router {
        let store: DynStore = Box::new(store);
        router(Arc::new(AppState {
            resolver: Resolver::new(store),
        }))
    }

    fn fixture() -> MemoryStore {
        MemoryStore::new(
            vec![
                GeoObject::new("Moscow", "г", "7700000000000"),
                GeoObject::new("Troitsky", "р-н", "7701100000000"),
                GeoObject::new("Troitsk", "г", "7701100100000"),
                GeoObject::new("Zelenograd", "г", "7700000100000"),
            ],
            vec![GeoObject::new("Central", "пр-кт", "77000001000000100")],
        )
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_regions() {
        let (status, body) = get_json(app(fixture()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], "7700000000000");
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_region_route() {
        let (status, body) = get_json(app(fixture()), "/region/7700000000000").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["level"], "region");
        assert_eq!(body["areas"][0]["name"], "Troitsky");
        assert_eq!(body["cities"][0]["name"], "Zelenograd");
    }

    #[tokio::test]
    async fn test_route_level_mismatch_is_not_found() {
        let (status, body) = get_json(app(fixture()), "/area/7700000000000").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "7700000000000 resolves to level region, expected area");
    }

    #[tokio::test]
    async fn test_city_with_streets() {
        let (status, body) = get_json(app(fixture()), "/city/7700000100000").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["streets"][0]["name"], "Central");
    }

    #[tokio::test]
    async fn test_malformed_code_is_bad_request() {
        let (status, body) = get_json(app(fixture()), "/resolve/77000").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("77000"));
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found() {
        let (status, _) = get_json(app(fixture()), "/resolve/2300000000000").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_scope_needs_local_search() {
        let uri = "/search?geo_object_name=Troitsk&code=7701100000000";
        let (status, body) = get_json(app(fixture()), uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"], "Troitsk");
        assert_eq!(body["areas"][0]["id"], "7701100000000");
        assert_eq!(body["cities"][0]["id"], "7701100100000");

        let uri = "/search?geo_object_name=Z&code=7701100000000&local_search=on";
        let (status, body) = get_json(app(fixture()), uri).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["cities"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_streets_route() {
        let (status, body) = get_json(app(fixture()), "/streets/7700000100000?name=cen").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], "77000001000000100");
    }

    #[tokio::test]
    async fn test_storage_failure_is_internal_error() {
        let (status, body) = get_json(app(MemoryStore::offline()), "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_rejected_query_is_internal_error() {
        let (status, body) =
            get_json(app(MemoryStore::rejecting()), "/region/7700000000000").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("77___00000000"));
    }

    #[tokio::test]
    async fn test_search_without_name_is_bad_request() {
        for uri in ["/search", "/search?geo_object_name=%20%20"] {
            let (status, body) = get_json(app(fixture()), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"], "search name is empty");
        }
    }
}
