//! In-flight request registry
//!
//! Deduplicates concurrent fetches for the same key by sharing one
//! pending handle among all callers. The first caller spawns a driver
//! task; everyone else joins its result. At most one flight exists per
//! key, and the key is removed from the registry exactly once, when the
//! flight settles.

use crate::error::FetchError;
use citepane_client::ApiError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::oneshot;

type Flight<T> = Shared<BoxFuture<'static, Result<T, FetchError>>>;

/// Registry of pending fetches keyed by cache key.
#[derive(Debug)]
pub struct InFlightRegistry<K, T>
where
    K: Eq + Hash,
{
    flights: Arc<DashMap<K, Flight<T>>>,
}

impl<K, T> InFlightRegistry<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Display + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flights: Arc::new(DashMap::new()),
        }
    }

    /// Join the pending fetch for `key`, or start one by invoking
    /// `factory`.
    ///
    /// The factory runs exactly once per flight; all concurrent callers
    /// for the same key observe the same resolved value or the same
    /// error, in the order their continuations were scheduled.
    pub async fn fetch_or_join<F, Fut>(&self, key: K, factory: F) -> Result<T, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let (flight, driver) = match self.flights.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                tracing::debug!(key = %key, "joining in-flight request");
                (occupied.get().clone(), None)
            }
            Entry::Vacant(vacant) => {
                let (tx, rx) = oneshot::channel::<Result<T, FetchError>>();
                let shared: Flight<T> = rx
                    .map(|settled| match settled {
                        Ok(result) => result,
                        Err(_) => Err(FetchError::Aborted),
                    })
                    .boxed()
                    .shared();
                vacant.insert(shared.clone());
                (shared, Some(tx))
            }
        };

        if let Some(tx) = driver {
            tracing::debug!(key = %key, "starting fetch");
            let fut = factory();
            let flights = Arc::clone(&self.flights);
            tokio::spawn(async move {
                let result = fut.await.map_err(FetchError::from);
                let _ = tx.send(result);
                flights.remove(&key);
            });
        }

        flight.await
    }

    /// Whether a flight is pending for `key`.
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.flights.contains_key(key)
    }

    /// Number of pending flights.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.flights.len()
    }

    /// Whether no flight is pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    /// Drop every pending flight handle. Running drivers finish on
    /// their own; callers already joined still receive the settled
    /// result, but new callers start fresh fetches.
    #[inline]
    pub fn clear(&self) {
        self.flights.clear();
    }
}

impl<K, T> Default for InFlightRegistry<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Display + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
