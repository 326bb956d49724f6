use crate::{
    error::{AppError, AppResult},
    models::{CollectionKind, PersonalizedSeries, SeriesItem, SeriesType, User},
    services::{catalog::CatalogStore, personalization},
};

pub const SEARCH_RESULT_LIMIT: usize = 15;

/// Movies first, then TV, then manga, then everything else
pub fn type_priority(series_type: &SeriesType) -> u8 {
    match series_type {
        SeriesType::Movie => 0,
        SeriesType::Tv => 1,
        SeriesType::Manga => 2,
        _ => 3,
    }
}

/// Ranks raw store hits: relevance descending, then a stable regroup by type
///
/// The regroup keeps the relevance order inside each type.
pub fn rank_hits(mut hits: Vec<SeriesItem>) -> Vec<SeriesItem> {
    hits.sort_by(|a, b| {
        b.search_score
            .unwrap_or_default()
            .total_cmp(&a.search_score.unwrap_or_default())
    });
    hits.truncate(SEARCH_RESULT_LIMIT);
    hits.sort_by_key(|hit| type_priority(&hit.series_type));
    hits
}

/// Free-text search over one collection
///
/// A blank query returns nothing without touching the store.
#[tracing::instrument(skip(store, user))]
pub async fn search(
    store: &dyn CatalogStore,
    kind: CollectionKind,
    query: &str,
    user: Option<&User>,
) -> AppResult<Vec<PersonalizedSeries>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let hits = store
        .search_text(kind, query, SEARCH_RESULT_LIMIT)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, store = store.name(), "Catalog text search failed");
            AppError::SearchFailed(e.to_string())
        })?;

    let ranked = rank_hits(hits);

    tracing::debug!(
        hits = ranked.len(),
        personalized = user.is_some(),
        "Search ranked"
    );

    Ok(personalization::merge_all(ranked, user, kind))
}
