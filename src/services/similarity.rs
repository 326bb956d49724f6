use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::{
    error::{AppError, AppResult},
    models::{CollectionKind, SeriesItem, SeriesRef},
    services::catalog::{self, CatalogStore, SeriesFilter, SeriesSort},
};

/// Newest-first candidates fetched before scoring. Older matches past this
/// cut are never considered.
pub const CANDIDATE_POOL_LIMIT: usize = 1000;

pub const SIMILAR_RESULT_LIMIT: usize = 5;

/// Release window similarity candidates must fall in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimilarityPolicy {
    /// Candidates must start on or after January 1st of this year
    pub year_lower_bound: i32,
    /// Candidates must end on or before January 1st of this year
    pub year_upper_bound: i32,
}

impl Default for SimilarityPolicy {
    fn default() -> Self {
        Self {
            year_lower_bound: 2006,
            year_upper_bound: 2014,
        }
    }
}

impl SimilarityPolicy {
    pub fn date_bounds(&self) -> AppResult<(NaiveDate, NaiveDate)> {
        let start_of = |year: i32| {
            NaiveDate::from_ymd_opt(year, 1, 1)
                .ok_or_else(|| AppError::InvalidInput(format!("year out of range: {}", year)))
        };
        Ok((start_of(self.year_lower_bound)?, start_of(self.year_upper_bound)?))
    }
}

/// How much of a candidate's genre set the reference shares
///
/// Ordered by the ratio `shared / total`; a candidate without genres sorts
/// below every ratio, including 0.
#[derive(Debug, Clone, Copy)]
pub enum GenreOverlap {
    NoGenres,
    Ratio { shared: usize, total: usize },
}

impl Ord for GenreOverlap {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GenreOverlap::NoGenres, GenreOverlap::NoGenres) => Ordering::Equal,
            (GenreOverlap::NoGenres, GenreOverlap::Ratio { .. }) => Ordering::Less,
            (GenreOverlap::Ratio { .. }, GenreOverlap::NoGenres) => Ordering::Greater,
            (
                GenreOverlap::Ratio { shared: a, total: n },
                GenreOverlap::Ratio { shared: b, total: m },
            ) => (a * m).cmp(&(b * n)),
        }
    }
}

impl PartialOrd for GenreOverlap {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for GenreOverlap {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GenreOverlap {}

pub fn genre_overlap(reference_genres: &HashSet<&str>, candidate: &SeriesItem) -> GenreOverlap {
    let genres: HashSet<&str> = candidate.genres.iter().map(String::as_str).collect();
    if genres.is_empty() {
        return GenreOverlap::NoGenres;
    }

    let shared = genres.intersection(reference_genres).count();
    GenreOverlap::Ratio {
        shared,
        total: genres.len(),
    }
}

/// Orders candidates by genre overlap with the reference, strongest first
///
/// Equal overlap goes to the more recent `date_start`, then to input order.
/// The reference itself is dropped even if the caller passed it in.
pub fn rank_by_genre_overlap(
    reference: &SeriesItem,
    candidates: Vec<SeriesItem>,
    limit: usize,
) -> Vec<SeriesItem> {
    let reference_genres: HashSet<&str> = reference.genres.iter().map(String::as_str).collect();

    let mut scored: Vec<(GenreOverlap, SeriesItem)> = candidates
        .into_iter()
        .filter(|candidate| candidate.id != reference.id)
        .map(|candidate| (genre_overlap(&reference_genres, &candidate), candidate))
        .collect();

    scored.sort_by(|(a_overlap, a), (b_overlap, b)| {
        b_overlap
            .cmp(a_overlap)
            .then_with(|| b.date_start.cmp(&a.date_start))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(_, candidate)| candidate)
        .collect()
}

/// Finds up to five series of the same type sharing genres with the reference
#[tracing::instrument(skip(store))]
pub async fn find_similar(
    store: &dyn CatalogStore,
    kind: CollectionKind,
    reference: &SeriesRef,
    policy: &SimilarityPolicy,
) -> AppResult<Vec<SeriesItem>> {
    let reference = catalog::resolve(store, kind, reference).await?;

    if reference.genres.is_empty() {
        tracing::debug!(id = %reference.id, "Reference has no genres, nothing can overlap");
        return Ok(Vec::new());
    }

    let (date_start_from, date_end_until) = policy.date_bounds()?;
    let filter = SeriesFilter {
        exclude_id: Some(reference.id.clone()),
        series_type: Some(reference.series_type.clone()),
        date_start_from: Some(date_start_from),
        date_end_until: Some(date_end_until),
        genres_any: Some(reference.genres.clone()),
    };

    let candidates = store
        .find_many(
            kind,
            &filter,
            Some(SeriesSort::DateStartDesc),
            Some(CANDIDATE_POOL_LIMIT),
        )
        .await?;

    tracing::debug!(
        id = %reference.id,
        candidates = candidates.len(),
        store = store.name(),
        "Scoring similarity candidates"
    );

    Ok(rank_by_genre_overlap(
        &reference,
        candidates,
        SIMILAR_RESULT_LIMIT,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SeriesId, SeriesType};
    use crate::services::catalog::{CatalogSeed, MemoryCatalogStore, MockCatalogStore};

    fn series(
        n: u32,
        series_type: SeriesType,
        genres: &[&str],
        start: (i32, u32),
        end: (i32, u32),
    ) -> SeriesItem {
        SeriesItem {
            id: SeriesId::parse(&format!("{:024x}", n)).unwrap(),
            slug: format!("series-{}", n),
            title_main: format!("Series {}", n),
            title_english: None,
            series_type,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            date_start: NaiveDate::from_ymd_opt(start.0, start.1, 1),
            date_end: NaiveDate::from_ymd_opt(end.0, end.1, 1),
            search_score: None,
        }
    }

    fn ratio(shared: usize, total: usize) -> GenreOverlap {
        GenreOverlap::Ratio { shared, total }
    }

    #[test]
    fn test_overlap_ordering_is_by_ratio() {
        assert_eq!(ratio(1, 1), ratio(2, 2));
        assert!(ratio(2, 3) < ratio(1, 1));
        assert!(ratio(1, 3) < ratio(1, 2));
        assert!(GenreOverlap::NoGenres < ratio(0, 4));
    }

    #[test]
    fn test_equal_ratio_prefers_recent_start() {
        let reference = series(1, SeriesType::Tv, &["A", "B", "C"], (2010, 1), (2011, 1));
        let y = series(2, SeriesType::Tv, &["A", "B"], (2008, 1), (2009, 1));
        let z = series(3, SeriesType::Tv, &["A"], (2012, 1), (2013, 1));

        let ranked = rank_by_genre_overlap(&reference, vec![y.clone(), z.clone()], 5);
        assert_eq!(ranked, vec![z, y]);
    }

    #[test]
    fn test_partial_overlap_ranks_below_full_overlap() {
        let reference = series(1, SeriesType::Tv, &["A", "B", "C"], (2010, 1), (2011, 1));
        // 2 of 3 genres shared: the old k/(k-n+1) score blew up on exactly this shape
        let partial = series(2, SeriesType::Tv, &["A", "B", "D"], (2013, 1), (2013, 6));
        let full = series(3, SeriesType::Tv, &["C"], (2007, 1), (2008, 1));
        let bare = series(4, SeriesType::Tv, &[], (2013, 1), (2013, 6));

        let ranked = rank_by_genre_overlap(
            &reference,
            vec![bare.clone(), partial.clone(), full.clone(), reference.clone()],
            5,
        );
        assert_eq!(ranked, vec![full, partial, bare]);
    }

    #[tokio::test]
    async fn test_find_similar_applies_type_date_and_genre_filters() {
        let reference = series(1, SeriesType::Tv, &["Action", "Drama"], (2009, 4), (2010, 7));
        let match_recent = series(2, SeriesType::Tv, &["Action"], (2012, 1), (2012, 12));
        let match_older = series(3, SeriesType::Tv, &["Drama", "Comedy"], (2007, 1), (2007, 12));
        let wrong_type = series(4, SeriesType::Movie, &["Action"], (2010, 1), (2010, 1));
        let too_old = series(5, SeriesType::Tv, &["Action"], (2004, 1), (2005, 1));
        let still_airing = series(6, SeriesType::Tv, &["Action"], (2013, 1), (2016, 1));
        let no_overlap = series(7, SeriesType::Tv, &["Romance"], (2010, 1), (2010, 6));

        let store = MemoryCatalogStore::from_seed(CatalogSeed {
            anime: vec![
                reference.clone(),
                match_recent.clone(),
                match_older.clone(),
                wrong_type,
                too_old,
                still_airing,
                no_overlap,
            ],
            ..Default::default()
        });

        let similar = find_similar(
            &store,
            CollectionKind::Anime,
            &SeriesRef::Slug("series-1".to_string()),
            &SimilarityPolicy::default(),
        )
        .await
        .unwrap();

        assert_eq!(similar, vec![match_recent, match_older]);
    }

    #[tokio::test]
    async fn test_find_similar_caps_results_and_excludes_reference() {
        let reference = series(1, SeriesType::Tv, &["Action"], (2009, 1), (2009, 6));
        let mut anime = vec![reference.clone()];
        for n in 2..12 {
            anime.push(series(n, SeriesType::Tv, &["Action"], (2006 + n as i32 / 2, 1), (2013, 1)));
        }
        let store = MemoryCatalogStore::from_seed(CatalogSeed {
            anime,
            ..Default::default()
        });

        let similar = find_similar(
            &store,
            CollectionKind::Anime,
            &SeriesRef::Id(reference.id.clone()),
            &SimilarityPolicy::default(),
        )
        .await
        .unwrap();

        assert_eq!(similar.len(), SIMILAR_RESULT_LIMIT);
        assert!(similar.iter().all(|item| item.id != reference.id));
        assert!(similar
            .windows(2)
            .all(|pair| pair[0].date_start >= pair[1].date_start));
    }

    #[tokio::test]
    async fn test_find_similar_is_stable_across_calls_when_candidates_tie() {
        let reference = series(1, SeriesType::Tv, &["Action"], (2009, 1), (2009, 6));
        let mut anime: Vec<SeriesItem> = (2..10)
            .rev()
            .map(|n| series(n, SeriesType::Tv, &["Action"], (2010, 4), (2010, 9)))
            .collect();
        anime.push(reference.clone());
        let store = MemoryCatalogStore::from_seed(CatalogSeed {
            anime,
            ..Default::default()
        });

        let reference = SeriesRef::Id(reference.id.clone());
        let policy = SimilarityPolicy::default();
        let first = find_similar(&store, CollectionKind::Anime, &reference, &policy)
            .await
            .unwrap();
        let second = find_similar(&store, CollectionKind::Anime, &reference, &policy)
            .await
            .unwrap();

        assert_eq!(first, second);
        let slugs: Vec<&str> = first.iter().map(|item| item.slug.as_str()).collect();
        assert_eq!(
            slugs,
            vec!["series-2", "series-3", "series-4", "series-5", "series-6"]
        );
    }

    #[tokio::test]
    async fn test_find_similar_unknown_reference_is_not_found() {
        let store = MemoryCatalogStore::new();
        let result = find_similar(
            &store,
            CollectionKind::Manga,
            &SeriesRef::parse("507f1f77bcf86cd799439011"),
            &SimilarityPolicy::default(),
        )
        .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_similar_surfaces_candidate_query_failure() {
        let reference = series(1, SeriesType::Tv, &["Action"], (2009, 1), (2009, 6));
        let mut store = MockCatalogStore::new();
        store
            .expect_find_by_id()
            .returning(move |_, _| Ok(Some(reference.clone())));
        store
            .expect_find_many()
            .withf(|_, filter, sort, limit| {
                filter.series_type == Some(SeriesType::Tv)
                    && *sort == Some(SeriesSort::DateStartDesc)
                    && *limit == Some(CANDIDATE_POOL_LIMIT)
            })
            .returning(|_, _, _, _| Err(AppError::Internal("pool timed out".into())));
        store.expect_name().return_const("mock");

        let result = find_similar(
            &store,
            CollectionKind::Anime,
            &SeriesRef::parse("000000000000000000000001"),
            &SimilarityPolicy::default(),
        )
        .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
