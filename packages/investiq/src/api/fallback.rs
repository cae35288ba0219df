//! Priority-ordered fallback across data sources

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

use super::cache::TtlCache;
use crate::{FeedError, Result};

/// One provider in a fallback chain. `Ok(None)` means the provider answered
/// without usable data and the chain moves on.
pub struct Source<'a, T> {
    pub name: &'static str,
    /// Lower runs first
    pub priority: u8,
    fetch: BoxFuture<'a, Result<Option<T>>>,
}

impl<'a, T> Source<'a, T> {
    pub fn new<F>(name: &'static str, priority: u8, fetch: F) -> Self
    where
        F: Future<Output = Result<Option<T>>> + Send + 'a,
    {
        Self {
            name,
            priority,
            fetch: fetch.boxed(),
        }
    }
}

/// Data plus the name of the source that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fetched<T> {
    pub data: T,
    pub source: String,
}

/// Where a chain's winning result is cached.
pub struct CachePolicy<'c, T> {
    pub cache: &'c TtlCache<Fetched<T>>,
    pub key: String,
    pub ttl: Duration,
}

impl<'c, T> CachePolicy<'c, T> {
    pub fn new(cache: &'c TtlCache<Fetched<T>>, key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            cache,
            key: key.into(),
            ttl,
        }
    }
}

/// Try `sources` in ascending priority until one returns data.
///
/// A fresh cache entry short-circuits the chain. The first `Ok(Some(_))`
/// is cached and returned; errors and empty answers fall through.
pub async fn fetch_with_fallback<T: Clone>(
    mut sources: Vec<Source<'_, T>>,
    cache: Option<CachePolicy<'_, T>>,
) -> Result<Fetched<T>> {
    if let Some(policy) = &cache {
        if let Some(hit) = policy.cache.get(&policy.key) {
            tracing::debug!("Cache hit for {} ({})", policy.key, hit.source);
            return Ok(hit);
        }
    }

    sources.sort_by_key(|s| s.priority);

    let mut failures = Vec::new();
    for source in sources {
        tracing::debug!("Trying {}...", source.name);
        match source.fetch.await {
            Ok(Some(data)) => {
                tracing::debug!("{} succeeded", source.name);
                let fetched = Fetched {
                    data,
                    source: source.name.to_string(),
                };
                if let Some(policy) = &cache {
                    policy
                        .cache
                        .insert(policy.key.clone(), fetched.clone(), policy.ttl);
                }
                return Ok(fetched);
            }
            Ok(None) => {
                tracing::warn!("{} returned no data", source.name);
                failures.push(format!("{}: no data", source.name));
            }
            Err(e) => {
                tracing::warn!("{} failed: {}", source.name, e);
                failures.push(format!("{}: {}", source.name, e));
            }
        }
    }

    Err(FeedError::AllSourcesFailed(failures.join("; ")))
}
