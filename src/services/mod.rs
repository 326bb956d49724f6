pub mod catalog;
pub mod lookup;
pub mod personalization;
pub mod ratings;
pub mod search;
pub mod similarity;

pub use catalog::CatalogStore;
pub use similarity::SimilarityPolicy;
