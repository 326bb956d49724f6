use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::{AppError, AppResult};
use crate::models::{CollectionKind, SeriesId, SeriesRef};

/// Keys of cached engine results
///
/// Search results are never cached: they depend on the requesting user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Similar(CollectionKind, SeriesRef),
    RatingStats(CollectionKind, SeriesId),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Similar(kind, series) => match series {
                SeriesRef::Id(id) => write!(f, "similar:{}:id:{}", kind, id),
                SeriesRef::Slug(slug) => write!(f, "similar:{}:slug:{}", kind, slug),
            },
            CacheKey::RatingStats(kind, id) => write!(f, "stats:{}:{}", kind, id),
        }
    }
}

struct PendingWrite {
    key: String,
    value: String,
    ttl_secs: u64,
}

/// Read-through result cache backed by Redis
///
/// Reads hit Redis directly. Writes are queued to a background task so a
/// response never waits on the cache.
#[derive(Clone)]
pub struct Cache {
    client: Client,
    write_tx: mpsc::UnboundedSender<PendingWrite>,
    ttl_secs: u64,
}

/// Stops the background writer once everything queued has been written
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    writer: tokio::task::JoinHandle<()>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.writer.await {
            tracing::error!(error = %e, "Cache writer task panicked");
        }
        tracing::info!("Cache writer stopped");
    }
}

impl Cache {
    /// Connects to Redis and starts the background writer
    pub async fn connect(redis_url: &str, ttl_secs: u64) -> AppResult<(Self, CacheWriterHandle)> {
        let client = Client::open(redis_url)?;
        // Connectivity check
        client.get_multiplexed_async_connection().await?;

        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let writer = tokio::spawn(Self::run_writer(client.clone(), write_rx, shutdown_rx));

        tracing::info!(ttl_secs, "Result cache connected");

        Ok((
            Self {
                client,
                write_tx,
                ttl_secs,
            },
            CacheWriterHandle {
                shutdown_tx,
                writer,
            },
        ))
    }

    async fn run_writer(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<PendingWrite>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                Some(write) = write_rx.recv() => {
                    Self::write(&client, write).await;
                }
                _ = shutdown_rx.recv() => {
                    write_rx.close();
                    let mut flushed = 0usize;
                    while let Some(write) = write_rx.recv().await {
                        Self::write(&client, write).await;
                        flushed += 1;
                    }
                    tracing::info!(flushed, "Cache writer flushed pending writes");
                    break;
                }
            }
        }
    }

    async fn write(client: &Client, write: PendingWrite) {
        let PendingWrite {
            key,
            value,
            ttl_secs,
        } = write;

        let result = match client.get_multiplexed_async_connection().await {
            Ok(mut conn) => conn.set_ex::<_, _, ()>(&key, value, ttl_secs).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, key = %key, "Cache write failed");
        }
    }

    pub async fn get<T>(&self, key: &CacheKey) -> AppResult<Option<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        cached
            .map(|json| {
                serde_json::from_str(&json)
                    .map_err(|e| AppError::Internal(format!("Cache deserialization error: {}", e)))
            })
            .transpose()
    }

    /// Queues a value for writing; returns immediately
    pub fn put<T: serde::Serialize>(&self, key: &CacheKey, value: &T) {
        let value = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let write = PendingWrite {
            key: key.to_string(),
            value,
            ttl_secs: self.ttl_secs,
        };

        if self.write_tx.send(write).is_err() {
            tracing::warn!(key = %key, "Cache writer is gone, dropping write");
        }
    }
}
