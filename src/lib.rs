//! Series relevance engine: similar-series ranking, free-text search ranking
//! and rating distributions over an anime/manga catalog, served over HTTP.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
