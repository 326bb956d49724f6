use chrono::NaiveDate;
use serde_json::{Map, Value};
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{CollectionKind, RatingCount, SeriesId, SeriesItem, SeriesType, User, UserListEntry},
    services::catalog::{CatalogStore, SeriesFilter, SeriesSort},
};

const SERIES_COLUMNS: &str =
    "id, slug, title_main, title_english, series_type, genres, date_start, date_end";

/// Every ordering ends on `id` so rows tied on the sort key keep their
/// relative order across executions, and `LIMIT` cuts the same rows.
fn order_by(sort: Option<SeriesSort>) -> &'static str {
    match sort {
        Some(SeriesSort::DateStartDesc) => " ORDER BY date_start DESC NULLS LAST, id",
        None => " ORDER BY id",
    }
}

fn search_sql() -> String {
    format!(
        r#"
        SELECT {SERIES_COLUMNS},
               ts_rank(search_vector, plainto_tsquery('simple', $2))::float8 AS search_score
        FROM series
        WHERE kind = $1
          AND (search_vector @@ plainto_tsquery('simple', $2)
               OR title_main ILIKE $3
               OR title_english ILIKE $3)
        ORDER BY search_score DESC, id
        LIMIT $4
        "#
    )
}

/// PostgreSQL-backed catalog store
///
/// Schema lives in `migrations/`. Free-text relevance comes from the generated
/// `search_vector` column ranked with `ts_rank`.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct SeriesRow {
    id: String,
    slug: String,
    title_main: String,
    title_english: Option<String>,
    series_type: String,
    genres: Vec<String>,
    date_start: Option<NaiveDate>,
    date_end: Option<NaiveDate>,
    search_score: Option<f64>,
}

impl TryFrom<SeriesRow> for SeriesItem {
    type Error = AppError;

    fn try_from(row: SeriesRow) -> Result<Self, Self::Error> {
        // Stored ids are canonical lowercase hex, the same form lookups bind.
        let id = SeriesId::parse(&row.id)
            .ok()
            .filter(|id| id.as_str() == row.id)
            .ok_or_else(|| {
                AppError::Internal(format!("malformed series id in catalog: {}", row.id))
            })?;

        Ok(SeriesItem {
            id,
            slug: row.slug,
            title_main: row.title_main,
            title_english: row.title_english,
            series_type: SeriesType::from(row.series_type),
            genres: row.genres,
            date_start: row.date_start,
            date_end: row.date_end,
            search_score: row.search_score,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ListEntryRow {
    kind: String,
    series_id: String,
    item_rating: i16,
    details: Json<Map<String, Value>>,
}

/// Builds an ILIKE pattern matching `raw` as a literal substring
fn contains_pattern(raw: &str) -> String {
    let mut pattern = String::with_capacity(raw.len() + 2);
    pattern.push('%');
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn collect_rows(rows: Vec<SeriesRow>) -> AppResult<Vec<SeriesItem>> {
    rows.into_iter().map(SeriesItem::try_from).collect()
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(
        &self,
        kind: CollectionKind,
        column: &str,
        value: &str,
    ) -> AppResult<Option<SeriesItem>> {
        let sql = format!(
            "SELECT {SERIES_COLUMNS}, NULL::float8 AS search_score \
             FROM series WHERE kind = $1 AND {column} = $2"
        );

        sqlx::query_as::<_, SeriesRow>(&sql)
            .bind(kind.as_str())
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .map(SeriesItem::try_from)
            .transpose()
    }
}

#[async_trait::async_trait]
impl CatalogStore for PgCatalogStore {
    async fn find_by_id(
        &self,
        kind: CollectionKind,
        id: &SeriesId,
    ) -> AppResult<Option<SeriesItem>> {
        self.find_one(kind, "id", id.as_str()).await
    }

    async fn find_by_slug(
        &self,
        kind: CollectionKind,
        slug: &str,
    ) -> AppResult<Option<SeriesItem>> {
        self.find_one(kind, "slug", slug).await
    }

    async fn find_many(
        &self,
        kind: CollectionKind,
        filter: &SeriesFilter,
        sort: Option<SeriesSort>,
        limit: Option<usize>,
    ) -> AppResult<Vec<SeriesItem>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {SERIES_COLUMNS}, NULL::float8 AS search_score FROM series WHERE kind = "
        ));
        builder.push_bind(kind.as_str());

        if let Some(id) = &filter.exclude_id {
            builder.push(" AND id <> ").push_bind(id.to_string());
        }
        if let Some(series_type) = &filter.series_type {
            builder
                .push(" AND series_type = ")
                .push_bind(series_type.to_string());
        }
        if let Some(from) = filter.date_start_from {
            builder.push(" AND date_start >= ").push_bind(from);
        }
        if let Some(until) = filter.date_end_until {
            builder.push(" AND date_end <= ").push_bind(until);
        }
        if let Some(genres) = &filter.genres_any {
            builder.push(" AND genres && ").push_bind(genres.clone());
        }

        builder.push(order_by(sort));

        if let Some(limit) = limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder
            .build_query_as::<SeriesRow>()
            .fetch_all(&self.pool)
            .await?;

        collect_rows(rows)
    }

    async fn search_text(
        &self,
        kind: CollectionKind,
        query: &str,
        limit: usize,
    ) -> AppResult<Vec<SeriesItem>> {
        let sql = search_sql();
        let rows = sqlx::query_as::<_, SeriesRow>(&sql)
            .bind(kind.as_str())
            .bind(query)
            .bind(contains_pattern(query))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        collect_rows(rows)
    }

    async fn aggregate_ratings(
        &self,
        kind: CollectionKind,
        series_id: &SeriesId,
    ) -> AppResult<Vec<RatingCount>> {
        let rows: Vec<(i32, i64)> = sqlx::query_as(
            r#"
            SELECT item_rating::int4 AS rating, COUNT(*) AS count
            FROM user_list_entries
            WHERE kind = $1 AND series_id = $2 AND item_rating > 0
            GROUP BY item_rating
            "#,
        )
        .bind(kind.as_str())
        .bind(series_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(rating, count)| {
                let rating = u8::try_from(rating).ok()?;
                Some(RatingCount {
                    rating,
                    count: count.max(0) as u64,
                })
            })
            .collect())
    }

    async fn find_user(&self, username: &str) -> AppResult<Option<User>> {
        let stacks: Option<Json<Vec<Value>>> =
            sqlx::query_scalar("SELECT stacks FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        let Some(Json(stacks)) = stacks else {
            return Ok(None);
        };

        let entries = sqlx::query_as::<_, ListEntryRow>(
            r#"
            SELECT kind, series_id, item_rating, details
            FROM user_list_entries
            WHERE username = $1
            ORDER BY kind, position
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        let mut user = User::new(username);
        user.stacks = stacks;

        for row in entries {
            let kind: CollectionKind = row.kind.parse()?;
            let Ok(series_id) = SeriesId::parse(&row.series_id) else {
                tracing::warn!(
                    username = %username,
                    series_id = %row.series_id,
                    "Skipping list entry with malformed series id"
                );
                continue;
            };

            user.add_entry(
                kind,
                UserListEntry {
                    series_id,
                    item_rating: u8::try_from(row.item_rating).unwrap_or_default(),
                    details: row.details.0,
                },
            );
        }

        Ok(Some(user))
    }

    async fn list_genres(&self, kind: CollectionKind) -> AppResult<Vec<String>> {
        let genres = sqlx::query_scalar(
            r#"
            SELECT DISTINCT unnest(genres) AS genre
            FROM series
            WHERE kind = $1
            ORDER BY genre
            "#,
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(genres)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("bebop"), "%bebop%");
        assert_eq!(contains_pattern("100%_real"), "%100\\%\\_real%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    const MIGRATION: &str = include_str!("../../../migrations/20240101000000_catalog.sql");

    fn row_with_id(id: &str) -> SeriesRow {
        SeriesRow {
            id: id.to_string(),
            slug: "cowboy-bebop".to_string(),
            title_main: "Cowboy Bebop".to_string(),
            title_english: None,
            series_type: "tv".to_string(),
            genres: vec![],
            date_start: None,
            date_end: None,
            search_score: None,
        }
    }

    #[test]
    fn test_orderings_break_ties_on_id() {
        assert!(order_by(Some(SeriesSort::DateStartDesc)).ends_with(", id"));
        assert_eq!(order_by(None), " ORDER BY id");
        assert!(search_sql().contains("ORDER BY search_score DESC, id"));
    }

    #[test]
    fn test_series_row_with_uppercase_id_is_rejected() {
        assert!(matches!(
            SeriesItem::try_from(row_with_id("507F1F77BCF86CD799439011")),
            Err(AppError::Internal(_))
        ));
        assert!(SeriesItem::try_from(row_with_id("507f1f77bcf86cd799439011")).is_ok());
    }

    #[test]
    fn test_schema_only_admits_lowercase_ids() {
        assert!(MIGRATION.contains("CHECK (id ~ '^[0-9a-f]{24}$')"));
        assert!(MIGRATION.contains("CHECK (series_id ~ '^[0-9a-f]{24}$')"));
    }

    #[test]
    fn test_series_row_conversion() {
        let row = SeriesRow {
            id: "507f1f77bcf86cd799439011".to_string(),
            slug: "cowboy-bebop".to_string(),
            title_main: "Cowboy Bebop".to_string(),
            title_english: None,
            series_type: "tv".to_string(),
            genres: vec!["Action".to_string(), "Sci-Fi".to_string()],
            date_start: NaiveDate::from_ymd_opt(1998, 4, 3),
            date_end: NaiveDate::from_ymd_opt(1999, 4, 24),
            search_score: Some(0.6),
        };

        let item = SeriesItem::try_from(row).unwrap();
        assert_eq!(item.id.as_str(), "507f1f77bcf86cd799439011");
        assert_eq!(item.series_type, SeriesType::Tv);
        assert_eq!(item.search_score, Some(0.6));
    }

    #[test]
    fn test_series_row_with_bad_id_is_internal_error() {
        let row = SeriesRow {
            id: "legacy-7".to_string(),
            slug: "legacy".to_string(),
            title_main: "Legacy".to_string(),
            title_english: None,
            series_type: "ova".to_string(),
            genres: vec![],
            date_start: None,
            date_end: None,
            search_score: None,
        };

        assert!(matches!(
            SeriesItem::try_from(row),
            Err(AppError::Internal(_))
        ));
    }
}
