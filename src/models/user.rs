use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::{CollectionKind, SeriesId};

/// A user's personal record for one series
///
/// Only `series_id` and `item_rating` are interpreted; status, progress and any
/// other fields are carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserListEntry {
    pub series_id: SeriesId,
    /// 0 means unrated, otherwise 1..=10
    #[serde(default)]
    pub item_rating: u8,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl UserListEntry {
    pub fn new(series_id: SeriesId, item_rating: u8) -> Self {
        Self {
            series_id,
            item_rating,
            details: Map::new(),
        }
    }

    pub fn is_rated(&self) -> bool {
        self.item_rating > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub lists: HashMap<CollectionKind, Vec<UserListEntry>>,
    /// User-curated collections, opaque to the service
    #[serde(default)]
    pub stacks: Vec<Value>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            lists: HashMap::new(),
            stacks: Vec::new(),
        }
    }

    /// The user's list for a collection, if they have one
    pub fn list(&self, kind: CollectionKind) -> Option<&[UserListEntry]> {
        self.lists.get(&kind).map(Vec::as_slice)
    }

    pub fn add_entry(&mut self, kind: CollectionKind, entry: UserListEntry) {
        self.lists.entry(kind).or_default().push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_entry_passes_through_opaque_fields() {
        let raw = json!({
            "series_id": "507f1f77bcf86cd799439011",
            "item_rating": 8,
            "item_status": "watching",
            "item_progress": 12
        });

        let entry: UserListEntry = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(entry.item_rating, 8);
        assert_eq!(entry.details["item_status"], "watching");
        assert_eq!(serde_json::to_value(&entry).unwrap(), raw);
    }

    #[test]
    fn test_user_lists_keyed_by_collection() {
        let raw = json!({
            "username": "spike",
            "lists": {
                "anime": [{ "series_id": "507f1f77bcf86cd799439011", "item_rating": 0 }]
            }
        });

        let user: User = serde_json::from_value(raw).unwrap();
        assert_eq!(user.list(CollectionKind::Anime).map(<[_]>::len), Some(1));
        assert!(user.list(CollectionKind::Manga).is_none());
        assert!(!user.list(CollectionKind::Anime).unwrap()[0].is_rated());
    }
}
