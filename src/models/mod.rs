use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::AppError;

pub mod series;
pub mod user;

pub use series::{PersonalizedSeries, SeriesId, SeriesItem, SeriesRef, SeriesType};
pub use user::{User, UserListEntry};

/// Which of the two parallel catalogs a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Anime,
    Manga,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Anime => "anime",
            CollectionKind::Manga => "manga",
        }
    }
}

impl Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CollectionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anime" => Ok(CollectionKind::Anime),
            "manga" => Ok(CollectionKind::Manga),
            other => Err(AppError::InvalidInput(format!(
                "unknown collection: {}",
                other
            ))),
        }
    }
}

/// Number of users who gave a series a particular rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingCount {
    pub rating: u8,
    pub count: u64,
}
