/// Read-through caching over an optional [`Cache`](crate::db::Cache).
///
/// Evaluates to `AppResult<T>`. With no cache configured the computation runs
/// directly. A cache hit skips it; a miss or an unreadable cache runs it and
/// queues the fresh value for writing. Cache failures never fail the request.
///
/// # Arguments
/// * `$cache`: an `Option<&Cache>`.
/// * `$key`: the [`CacheKey`](crate::db::CacheKey) to read and write.
/// * `$compute`: a future resolving to `AppResult<T>`.
///
/// # Example
/// ```rust,ignore
/// let stats = cached!(state.cache.as_ref(), key, ratings::rating_distribution(store, kind, id))?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $compute:expr) => {{
        match $cache {
            Some(cache) => match cache.get(&$key).await {
                Ok(Some(hit)) => {
                    tracing::debug!(key = %$key, "Cache hit");
                    Ok(hit)
                }
                miss => {
                    if let Err(e) = miss {
                        tracing::warn!(error = %e, key = %$key, "Cache read failed, computing");
                    }
                    match $compute.await {
                        Ok(value) => {
                            cache.put(&$key, &value);
                            Ok(value)
                        }
                        Err(e) => Err(e),
                    }
                }
            },
            None => $compute.await,
        }
    }};
}
