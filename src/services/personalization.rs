use std::collections::HashMap;

use crate::models::{CollectionKind, PersonalizedSeries, SeriesId, SeriesItem, User, UserListEntry};

/// A user's list for one collection, indexed by series id
///
/// Built once per request so annotating a result set does not rescan the list
/// for every item. When a list holds the same series twice the first entry wins.
#[derive(Debug, Default)]
pub struct PersonalIndex<'a> {
    entries: HashMap<&'a SeriesId, &'a UserListEntry>,
}

impl<'a> PersonalIndex<'a> {
    pub fn new(user: Option<&'a User>, kind: CollectionKind) -> Self {
        let mut entries = HashMap::new();
        for entry in user.and_then(|user| user.list(kind)).unwrap_or_default() {
            entries.entry(&entry.series_id).or_insert(entry);
        }
        Self { entries }
    }

    pub fn annotate(&self, series: SeriesItem) -> PersonalizedSeries {
        let personal_data = self.entries.get(&series.id).map(|entry| (*entry).clone());
        PersonalizedSeries {
            series,
            personal_data,
        }
    }
}

/// Copies `item` and attaches the user's entry for it, if any
pub fn merge(item: &SeriesItem, user: Option<&User>, kind: CollectionKind) -> PersonalizedSeries {
    let personal_data = user
        .and_then(|user| user.list(kind))
        .and_then(|list| list.iter().find(|entry| entry.series_id == item.id))
        .cloned();

    PersonalizedSeries {
        series: item.clone(),
        personal_data,
    }
}

/// Annotates a whole result set, keeping its order
pub fn merge_all(
    items: Vec<SeriesItem>,
    user: Option<&User>,
    kind: CollectionKind,
) -> Vec<PersonalizedSeries> {
    let index = PersonalIndex::new(user, kind);
    items.into_iter().map(|item| index.annotate(item)).collect()
}
