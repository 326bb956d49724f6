use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    models::{CollectionKind, PersonalizedSeries, SeriesRef, User},
    services::{catalog, catalog::CatalogStore, personalization},
};

/// Single series view, with the requester's list entry when they have one
pub async fn get_series(
    store: &dyn CatalogStore,
    kind: CollectionKind,
    series: &SeriesRef,
    user: Option<&User>,
) -> AppResult<PersonalizedSeries> {
    let item = catalog::resolve(store, kind, series).await?;
    Ok(personalization::merge(&item, user, kind))
}

pub async fn list_genres(store: &dyn CatalogStore, kind: CollectionKind) -> AppResult<Vec<String>> {
    store.list_genres(kind).await
}

/// A user's stacks, as stored
pub async fn get_stacks(store: &dyn CatalogStore, username: &str) -> AppResult<Vec<Value>> {
    store
        .find_user(username)
        .await?
        .map(|user| user.stacks)
        .ok_or_else(|| AppError::NotFound(format!("user {}", username)))
}
