use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    cached,
    db::CacheKey,
    error::AppResult,
    middleware::{ApiPath, CurrentUser, RequestId},
    models::{CollectionKind, PersonalizedSeries, RatingCount, SeriesId, SeriesItem, SeriesRef},
    routes::AppState,
    services::{lookup, ratings, search, similarity},
};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

/// Handler for similar series
pub async fn similar(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    ApiPath((kind, id)): ApiPath<(CollectionKind, String)>,
) -> AppResult<Json<Vec<SeriesItem>>> {
    let reference = SeriesRef::parse(&id);

    tracing::info!(
        request_id = %request_id,
        collection = %kind,
        reference = %reference,
        "Finding similar series"
    );

    let key = CacheKey::Similar(kind, reference.clone());
    let similar: Vec<SeriesItem> = cached!(
        state.cache.as_ref(),
        key,
        similarity::find_similar(state.store.as_ref(), kind, &reference, &state.similarity)
    )?;

    tracing::info!(
        request_id = %request_id,
        results = similar.len(),
        "Similar series found"
    );

    Ok(Json(similar))
}

/// Handler for `/search/{query}`
pub async fn search_path(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    current_user: CurrentUser,
    ApiPath((kind, query)): ApiPath<(CollectionKind, String)>,
) -> AppResult<Json<Vec<PersonalizedSeries>>> {
    run_search(&state, request_id, kind, &query, &current_user).await
}

/// Handler for `/search?q=`; a missing `q` searches for nothing
pub async fn search_query(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    current_user: CurrentUser,
    ApiPath(kind): ApiPath<CollectionKind>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<PersonalizedSeries>>> {
    let query = params.q.unwrap_or_default();
    run_search(&state, request_id, kind, &query, &current_user).await
}

async fn run_search(
    state: &AppState,
    request_id: RequestId,
    kind: CollectionKind,
    query: &str,
    current_user: &CurrentUser,
) -> AppResult<Json<Vec<PersonalizedSeries>>> {
    tracing::info!(
        request_id = %request_id,
        collection = %kind,
        query = %query,
        authenticated = current_user.user().is_some(),
        "Searching catalog"
    );

    let results = search::search(state.store.as_ref(), kind, query, current_user.user()).await?;

    tracing::info!(
        request_id = %request_id,
        results = results.len(),
        "Search completed"
    );

    Ok(Json(results))
}

/// Handler for rating statistics
pub async fn rating_stats(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    ApiPath((kind, id)): ApiPath<(CollectionKind, String)>,
) -> AppResult<Json<Vec<RatingCount>>> {
    let series_id = SeriesId::parse(&id)?;

    tracing::info!(
        request_id = %request_id,
        collection = %kind,
        id = %series_id,
        "Aggregating ratings"
    );

    let key = CacheKey::RatingStats(kind, series_id.clone());
    let distribution: [RatingCount; ratings::RATING_BUCKETS] = cached!(
        state.cache.as_ref(),
        key,
        ratings::rating_distribution(state.store.as_ref(), kind, series_id.as_str())
    )?;

    Ok(Json(distribution.to_vec()))
}

/// Handler for a single series view
pub async fn view(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    current_user: CurrentUser,
    ApiPath((kind, id)): ApiPath<(CollectionKind, String)>,
) -> AppResult<Json<PersonalizedSeries>> {
    let series = SeriesRef::parse(&id);

    tracing::info!(
        request_id = %request_id,
        collection = %kind,
        series = %series,
        "Viewing series"
    );

    let item = lookup::get_series(state.store.as_ref(), kind, &series, current_user.user()).await?;
    Ok(Json(item))
}

/// Handler listing every genre in a collection
pub async fn genres(
    State(state): State<Arc<AppState>>,
    ApiPath(kind): ApiPath<CollectionKind>,
) -> AppResult<Json<Vec<String>>> {
    let genres = lookup::list_genres(state.store.as_ref(), kind).await?;
    Ok(Json(genres))
}
