use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::AppError;

use super::UserListEntry;

/// Canonical catalog identifier: 24 hexadecimal characters, stored lowercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeriesId(String);

impl SeriesId {
    /// Length of the hex form
    pub const LEN: usize = 24;

    /// Parses a raw identifier, rejecting anything that is not 24 hex characters
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if raw.len() == Self::LEN && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(raw.to_ascii_lowercase()))
        } else {
            Err(AppError::InvalidId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SeriesId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SeriesId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SeriesId> for String {
    fn from(id: SeriesId) -> Self {
        id.0
    }
}

/// How a caller referred to a series: by canonical id or by slug
///
/// Resolved once at the boundary; a 24-hex string is an id, anything else a slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SeriesRef {
    Id(SeriesId),
    Slug(String),
}

impl SeriesRef {
    pub fn parse(raw: &str) -> Self {
        match SeriesId::parse(raw) {
            Ok(id) => SeriesRef::Id(id),
            Err(_) => SeriesRef::Slug(raw.to_string()),
        }
    }
}

impl Display for SeriesRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesRef::Id(id) => write!(f, "{}", id),
            SeriesRef::Slug(slug) => write!(f, "{}", slug),
        }
    }
}

/// Format of a catalog entry
///
/// Values outside the known set are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SeriesType {
    Movie,
    Tv,
    Ova,
    Ona,
    Special,
    Music,
    Manga,
    Novel,
    OneShot,
    Doujin,
    Manhwa,
    Manhua,
    Other(String),
}

impl SeriesType {
    pub fn as_str(&self) -> &str {
        match self {
            SeriesType::Movie => "movie",
            SeriesType::Tv => "tv",
            SeriesType::Ova => "ova",
            SeriesType::Ona => "ona",
            SeriesType::Special => "special",
            SeriesType::Music => "music",
            SeriesType::Manga => "manga",
            SeriesType::Novel => "novel",
            SeriesType::OneShot => "one_shot",
            SeriesType::Doujin => "doujin",
            SeriesType::Manhwa => "manhwa",
            SeriesType::Manhua => "manhua",
            SeriesType::Other(raw) => raw,
        }
    }
}

impl From<String> for SeriesType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "movie" => SeriesType::Movie,
            "tv" => SeriesType::Tv,
            "ova" => SeriesType::Ova,
            "ona" => SeriesType::Ona,
            "special" => SeriesType::Special,
            "music" => SeriesType::Music,
            "manga" => SeriesType::Manga,
            "novel" => SeriesType::Novel,
            "one_shot" => SeriesType::OneShot,
            "doujin" => SeriesType::Doujin,
            "manhwa" => SeriesType::Manhwa,
            "manhua" => SeriesType::Manhua,
            _ => SeriesType::Other(raw),
        }
    }
}

impl From<SeriesType> for String {
    fn from(series_type: SeriesType) -> Self {
        series_type.as_str().to_string()
    }
}

impl Display for SeriesType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A catalog entry (anime or manga)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesItem {
    pub id: SeriesId,
    pub slug: String,
    pub title_main: String,
    #[serde(default)]
    pub title_english: Option<String>,
    pub series_type: SeriesType,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub date_start: Option<NaiveDate>,
    #[serde(default)]
    pub date_end: Option<NaiveDate>,
    /// Text relevance, only present on search results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_score: Option<f64>,
}

/// A catalog entry with the requesting user's list entry attached
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonalizedSeries {
    #[serde(flatten)]
    pub series: SeriesItem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_data: Option<UserListEntry>,
}

impl From<SeriesItem> for PersonalizedSeries {
    fn from(series: SeriesItem) -> Self {
        Self {
            series,
            personal_data: None,
        }
    }
}
