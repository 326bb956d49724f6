use crate::{
    error::{AppError, AppResult},
    models::{CollectionKind, RatingCount, SeriesId},
    services::catalog::CatalogStore,
};

pub const RATING_BUCKETS: usize = 10;

/// Spreads grouped counts over the ten rating buckets
///
/// Missing ratings become zero-count entries. Groups outside 1..=10 are
/// dropped; the store should never produce them.
pub fn fill_distribution(groups: Vec<RatingCount>) -> [RatingCount; RATING_BUCKETS] {
    let mut counts = [0u64; RATING_BUCKETS];

    for group in groups {
        match group.rating {
            1..=10 => counts[usize::from(group.rating) - 1] += group.count,
            other => tracing::warn!(
                rating = other,
                count = group.count,
                "Ignoring out-of-range rating"
            ),
        }
    }

    std::array::from_fn(|i| RatingCount {
        rating: (i + 1) as u8,
        count: counts[i],
    })
}

/// How many users gave each rating from 1 to 10 to one series
///
/// The id must be canonical; slugs and malformed ids are rejected before any
/// query runs.
#[tracing::instrument(skip(store))]
pub async fn rating_distribution(
    store: &dyn CatalogStore,
    kind: CollectionKind,
    raw_id: &str,
) -> AppResult<[RatingCount; RATING_BUCKETS]> {
    let series_id = SeriesId::parse(raw_id)?;

    let groups = store
        .aggregate_ratings(kind, &series_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, store = store.name(), "Rating aggregation failed");
            AppError::AggregationFailed(e.to_string())
        })?;

    Ok(fill_distribution(groups))
}
