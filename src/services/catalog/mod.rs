//! Catalog store abstraction
//!
//! The relevance engine never talks to a database directly. Every read goes
//! through a `CatalogStore`, so PostgreSQL and the in-memory catalog are
//! interchangeable behind `Arc<dyn CatalogStore>`.
use chrono::NaiveDate;

use crate::{
    error::{AppError, AppResult},
    models::{CollectionKind, RatingCount, SeriesId, SeriesItem, SeriesRef, SeriesType, User},
};

pub mod memory;
pub mod postgres;

pub use memory::{CatalogSeed, MemoryCatalogStore};
pub use postgres::PgCatalogStore;

/// Conjunctive filter over catalog items
///
/// Unset fields do not constrain. Date bounds never match a missing date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesFilter {
    pub exclude_id: Option<SeriesId>,
    pub series_type: Option<SeriesType>,
    pub date_start_from: Option<NaiveDate>,
    pub date_end_until: Option<NaiveDate>,
    /// Matches items sharing at least one of these genres
    pub genres_any: Option<Vec<String>>,
}

impl SeriesFilter {
    /// Evaluates the filter against one item
    pub fn matches(&self, item: &SeriesItem) -> bool {
        if self.exclude_id.as_ref() == Some(&item.id) {
            return false;
        }
        if let Some(series_type) = &self.series_type {
            if &item.series_type != series_type {
                return false;
            }
        }
        if let Some(from) = self.date_start_from {
            if !item.date_start.is_some_and(|start| start >= from) {
                return false;
            }
        }
        if let Some(until) = self.date_end_until {
            if !item.date_end.is_some_and(|end| end <= until) {
                return false;
            }
        }
        if let Some(genres) = &self.genres_any {
            if !item.genres.iter().any(|g| genres.contains(g)) {
                return false;
            }
        }
        true
    }
}

/// Result ordering for [`CatalogStore::find_many`]
///
/// Rows tied on the sort key always come back in ascending id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesSort {
    DateStartDesc,
}

/// Trait for catalog store adapters
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_by_id(&self, kind: CollectionKind, id: &SeriesId)
        -> AppResult<Option<SeriesItem>>;

    async fn find_by_slug(&self, kind: CollectionKind, slug: &str)
        -> AppResult<Option<SeriesItem>>;

    /// Filtered query with optional ordering and cap
    async fn find_many(
        &self,
        kind: CollectionKind,
        filter: &SeriesFilter,
        sort: Option<SeriesSort>,
        limit: Option<usize>,
    ) -> AppResult<Vec<SeriesItem>>;

    /// Free-text search
    ///
    /// Matches on text relevance or on a case-insensitive title substring, sorted
    /// by relevance descending. Every returned item carries `search_score`.
    async fn search_text(
        &self,
        kind: CollectionKind,
        query: &str,
        limit: usize,
    ) -> AppResult<Vec<SeriesItem>>;

    /// Groups every user's positive ratings of one series by rating value
    async fn aggregate_ratings(
        &self,
        kind: CollectionKind,
        series_id: &SeriesId,
    ) -> AppResult<Vec<RatingCount>>;

    async fn find_user(&self, username: &str) -> AppResult<Option<User>>;

    /// Distinct genre tags of a collection, sorted
    async fn list_genres(&self, kind: CollectionKind) -> AppResult<Vec<String>>;

    /// Adapter name for logging
    fn name(&self) -> &'static str;
}

/// Looks a series up by id or slug
pub async fn resolve(
    store: &dyn CatalogStore,
    kind: CollectionKind,
    series: &SeriesRef,
) -> AppResult<SeriesItem> {
    let found = match series {
        SeriesRef::Id(id) => store.find_by_id(kind, id).await?,
        SeriesRef::Slug(slug) => store.find_by_slug(kind, slug).await?,
    };

    found.ok_or_else(|| AppError::NotFound(format!("{} {}", kind, series)))
}
