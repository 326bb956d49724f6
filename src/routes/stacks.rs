use axum::{extract::State, Json};
use serde_json::Value;
use std::sync::Arc;

use crate::{error::AppResult, middleware::ApiPath, routes::AppState, services::lookup};

/// Handler for a user's stacks
pub async fn view(
    State(state): State<Arc<AppState>>,
    ApiPath(username): ApiPath<String>,
) -> AppResult<Json<Vec<Value>>> {
    let stacks = lookup::get_stacks(state.store.as_ref(), &username).await?;
    Ok(Json(stacks))
}
