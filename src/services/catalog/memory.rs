use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    error::AppResult,
    models::{CollectionKind, RatingCount, SeriesId, SeriesItem, User},
    services::catalog::{CatalogStore, SeriesFilter, SeriesSort},
};

/// Catalog contents as loaded from a JSON seed file
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub anime: Vec<SeriesItem>,
    #[serde(default)]
    pub manga: Vec<SeriesItem>,
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Default)]
struct MemoryCatalogInner {
    series: HashMap<CollectionKind, Vec<SeriesItem>>,
    users: HashMap<String, User>,
}

/// In-process catalog store
///
/// Used by the test suite and for running the service without PostgreSQL.
/// Items keep insertion order, which is the tie-break for equal search scores.
#[derive(Clone, Default)]
pub struct MemoryCatalogStore {
    inner: Arc<RwLock<MemoryCatalogInner>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: CatalogSeed) -> Self {
        let mut series = HashMap::new();
        series.insert(CollectionKind::Anime, seed.anime);
        series.insert(CollectionKind::Manga, seed.manga);

        let users = seed
            .users
            .into_iter()
            .map(|user| (user.username.clone(), user))
            .collect();

        Self {
            inner: Arc::new(RwLock::new(MemoryCatalogInner { series, users })),
        }
    }

    /// Loads a seed file of the form `{"anime": [...], "manga": [...], "users": [...]}`
    pub async fn load_seed_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let seed: CatalogSeed = serde_json::from_str(&raw)?;

        tracing::info!(
            path = %path.as_ref().display(),
            anime = seed.anime.len(),
            manga = seed.manga.len(),
            users = seed.users.len(),
            "Loaded catalog seed"
        );

        Ok(Self::from_seed(seed))
    }
}

/// Lowercased alphanumeric words
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Share of a field's words that appear in the query
fn field_score(field: &str, terms: &HashSet<String>) -> f64 {
    let tokens = tokenize(field);
    if tokens.is_empty() {
        return 0.0;
    }
    let matched = tokens.iter().filter(|token| terms.contains(*token)).count();
    matched as f64 / tokens.len() as f64
}

fn text_score(item: &SeriesItem, terms: &HashSet<String>) -> f64 {
    field_score(&item.title_main, terms)
        + item
            .title_english
            .as_deref()
            .map_or(0.0, |title| field_score(title, terms))
}

fn title_contains(item: &SeriesItem, needle: &str) -> bool {
    item.title_main.to_lowercase().contains(needle)
        || item
            .title_english
            .as_deref()
            .is_some_and(|title| title.to_lowercase().contains(needle))
}

#[async_trait::async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn find_by_id(
        &self,
        kind: CollectionKind,
        id: &SeriesId,
    ) -> AppResult<Option<SeriesItem>> {
        let inner = self.inner.read().await;
        Ok(inner
            .series
            .get(&kind)
            .and_then(|items| items.iter().find(|item| &item.id == id))
            .cloned())
    }

    async fn find_by_slug(
        &self,
        kind: CollectionKind,
        slug: &str,
    ) -> AppResult<Option<SeriesItem>> {
        let inner = self.inner.read().await;
        Ok(inner
            .series
            .get(&kind)
            .and_then(|items| items.iter().find(|item| item.slug == slug))
            .cloned())
    }

    async fn find_many(
        &self,
        kind: CollectionKind,
        filter: &SeriesFilter,
        sort: Option<SeriesSort>,
        limit: Option<usize>,
    ) -> AppResult<Vec<SeriesItem>> {
        let inner = self.inner.read().await;
        let mut found: Vec<SeriesItem> = inner
            .series
            .get(&kind)
            .map(|items| items.iter().filter(|item| filter.matches(item)).cloned().collect())
            .unwrap_or_default();

        match sort {
            Some(SeriesSort::DateStartDesc) => found.sort_by(|a, b| {
                b.date_start
                    .cmp(&a.date_start)
                    .then_with(|| a.id.cmp(&b.id))
            }),
            None => found.sort_by(|a, b| a.id.cmp(&b.id)),
        }

        if let Some(limit) = limit {
            found.truncate(limit);
        }

        Ok(found)
    }

    async fn search_text(
        &self,
        kind: CollectionKind,
        query: &str,
        limit: usize,
    ) -> AppResult<Vec<SeriesItem>> {
        let terms: HashSet<String> = tokenize(query).into_iter().collect();
        let needle = query.to_lowercase();

        let inner = self.inner.read().await;
        let mut found: Vec<SeriesItem> = inner
            .series
            .get(&kind)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let score = text_score(item, &terms);
                        if score > 0.0 || title_contains(item, &needle) {
                            let mut hit = item.clone();
                            hit.search_score = Some(score);
                            Some(hit)
                        } else {
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        found.sort_by(|a, b| {
            b.search_score
                .unwrap_or_default()
                .total_cmp(&a.search_score.unwrap_or_default())
                .then_with(|| a.id.cmp(&b.id))
        });
        found.truncate(limit);

        Ok(found)
    }

    async fn aggregate_ratings(
        &self,
        kind: CollectionKind,
        series_id: &SeriesId,
    ) -> AppResult<Vec<RatingCount>> {
        let inner = self.inner.read().await;
        let mut groups: BTreeMap<u8, u64> = BTreeMap::new();

        for entry in inner
            .users
            .values()
            .filter_map(|user| user.list(kind))
            .flatten()
            .filter(|entry| &entry.series_id == series_id && entry.is_rated())
        {
            *groups.entry(entry.item_rating).or_default() += 1;
        }

        Ok(groups
            .into_iter()
            .map(|(rating, count)| RatingCount { rating, count })
            .collect())
    }

    async fn find_user(&self, username: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(username).cloned())
    }

    async fn list_genres(&self, kind: CollectionKind) -> AppResult<Vec<String>> {
        let inner = self.inner.read().await;
        let genres: BTreeSet<&String> = inner
            .series
            .get(&kind)
            .into_iter()
            .flatten()
            .flat_map(|item| item.genres.iter())
            .collect();

        Ok(genres.into_iter().cloned().collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SeriesType, UserListEntry};
    use chrono::NaiveDate;

    fn series(id: &str, title: &str, english: Option<&str>) -> SeriesItem {
        SeriesItem {
            id: SeriesId::parse(id).unwrap(),
            slug: title.to_lowercase().replace(' ', "-"),
            title_main: title.to_string(),
            title_english: english.map(str::to_string),
            series_type: SeriesType::Tv,
            genres: vec!["Action".to_string()],
            date_start: None,
            date_end: None,
            search_score: None,
        }
    }

    #[test]
    fn test_tokenize_splits_on_punctuation() {
        assert_eq!(
            tokenize("Fullmetal Alchemist: Brotherhood"),
            vec!["fullmetal", "alchemist", "brotherhood"]
        );
    }

    #[tokio::test]
    async fn test_search_text_ranks_whole_word_matches_above_substrings() {
        let store = MemoryCatalogStore::from_seed(CatalogSeed {
            anime: vec![
                series("000000000000000000000001", "Naruto Shippuden", None),
                series("000000000000000000000002", "Naruto", None),
                series(
                    "000000000000000000000003",
                    "Boruto",
                    Some("Boruto: Naruto Next Generations"),
                ),
            ],
            ..Default::default()
        });

        let hits = store
            .search_text(CollectionKind::Anime, "naruto", 15)
            .await
            .unwrap();

        let slugs: Vec<&str> = hits.iter().map(|hit| hit.slug.as_str()).collect();
        assert_eq!(slugs, vec!["naruto", "naruto-shippuden", "boruto"]);
        assert_eq!(hits[0].search_score, Some(1.0));

        let partial = store
            .search_text(CollectionKind::Anime, "shipp", 15)
            .await
            .unwrap();
        assert_eq!(partial.len(), 1);
        assert_eq!(partial[0].search_score, Some(0.0));
    }

    #[tokio::test]
    async fn test_aggregate_ratings_skips_unrated_and_other_series() {
        let target = SeriesId::parse("000000000000000000000001").unwrap();
        let other = SeriesId::parse("000000000000000000000002").unwrap();

        let mut alice = User::new("alice");
        alice.add_entry(CollectionKind::Anime, UserListEntry::new(target.clone(), 8));
        alice.add_entry(CollectionKind::Anime, UserListEntry::new(other.clone(), 3));
        let mut bob = User::new("bob");
        bob.add_entry(CollectionKind::Anime, UserListEntry::new(target.clone(), 8));
        let mut carol = User::new("carol");
        carol.add_entry(CollectionKind::Anime, UserListEntry::new(target.clone(), 0));
        carol.add_entry(CollectionKind::Manga, UserListEntry::new(target.clone(), 5));

        let store = MemoryCatalogStore::from_seed(CatalogSeed {
            users: vec![alice, bob, carol],
            ..Default::default()
        });

        let groups = store
            .aggregate_ratings(CollectionKind::Anime, &target)
            .await
            .unwrap();
        assert_eq!(groups, vec![RatingCount { rating: 8, count: 2 }]);
    }

    #[tokio::test]
    async fn test_ties_come_back_in_id_order_regardless_of_insertion() {
        let mut late = series("00000000000000000000000c", "Clannad", None);
        let mut early = series("00000000000000000000000a", "Clannad After Story", None);
        let mut middle = series("00000000000000000000000b", "Clannad Movie", None);
        for item in [&mut late, &mut early, &mut middle] {
            item.date_start = NaiveDate::from_ymd_opt(2007, 10, 1);
        }

        let store = MemoryCatalogStore::from_seed(CatalogSeed {
            anime: vec![late, middle, early],
            ..Default::default()
        });

        let pool = store
            .find_many(
                CollectionKind::Anime,
                &SeriesFilter::default(),
                Some(SeriesSort::DateStartDesc),
                Some(2),
            )
            .await
            .unwrap();
        let slugs: Vec<&str> = pool.iter().map(|item| item.slug.as_str()).collect();
        assert_eq!(slugs, vec!["clannad-after-story", "clannad-movie"]);

        let hits = store
            .search_text(CollectionKind::Anime, "lann", 15)
            .await
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "00000000000000000000000a",
                "00000000000000000000000b",
                "00000000000000000000000c",
            ]
        );
    }

    #[tokio::test]
    async fn test_list_genres_is_sorted_and_distinct() {
        let mut first = series("000000000000000000000001", "One", None);
        first.genres = vec!["Drama".to_string(), "Action".to_string()];
        let mut second = series("000000000000000000000002", "Two", None);
        second.genres = vec!["Action".to_string(), "Comedy".to_string()];

        let store = MemoryCatalogStore::from_seed(CatalogSeed {
            anime: vec![first, second],
            ..Default::default()
        });

        assert_eq!(
            store.list_genres(CollectionKind::Anime).await.unwrap(),
            vec!["Action", "Comedy", "Drama"]
        );
        assert!(store.list_genres(CollectionKind::Manga).await.unwrap().is_empty());
    }
}
