use axum::{
    http::StatusCode,
    middleware::from_fn,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::Cache,
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::{CatalogStore, SimilarityPolicy},
};

pub mod series;
pub mod stacks;

/// Shared, read-only application state
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub cache: Option<Cache>,
    pub similarity: SimilarityPolicy,
}

impl AppState {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            cache: None,
            similarity: SimilarityPolicy::default(),
        }
    }

    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_similarity(mut self, similarity: SimilarityPolicy) -> Self {
        self.similarity = similarity;
        self
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:collection/similar/:id", get(series::similar))
        .route("/:collection/search", get(series::search_query))
        .route("/:collection/search/:query", get(series::search_path))
        .route("/:collection/stats/:id", get(series::rating_stats))
        .route("/:collection/view/:id", get(series::view))
        .route("/:collection/genres", get(series::genres))
        .route("/stacks/view/:username", get(stacks::view))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
