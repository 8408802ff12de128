// Copyright 2026 cellar Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{sync::Arc, time::Duration};

use cellar_common::{
    code::{Key, Value},
    error::{Error, ErrorKind, Result},
    spawn::Spawner,
};
use chrono::TimeDelta;
use futures_util::{future::BoxFuture, FutureExt};
use parking_lot::Mutex;

use crate::{
    cache::inflight::{Flight, InflightMap, Notifier},
    store::{InvalidateOptions, SetOptions, Store},
};

/// The loader for the stale cache.
///
/// The loader produces a fresh value for a key on a cache miss or refresh, or fails.
pub trait Loader<K, V>: Fn(&K) -> BoxFuture<'static, Result<V>> + Send + Sync + 'static {}
impl<K, V, T> Loader<K, V> for T where T: Fn(&K) -> BoxFuture<'static, Result<V>> + Send + Sync + 'static {}

/// The admission predicate for the stale cache.
///
/// The predicate decides whether a freshly loaded value is written to the underlying store.
/// Rejected values are still returned to callers; they are just not cached.
pub trait Admission<K, V>: Fn(&K, &V) -> bool + Send + Sync + 'static {}
impl<K, V, T> Admission<K, V> for T where T: Fn(&K, &V) -> bool + Send + Sync + 'static {}

/// Freshness of a stored entry, derived from its logical remaining time-to-live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The logical remaining TTL is non-negative; serve as is.
    Fresh,
    /// The entry is logically expired but physically still inside the stale margin;
    /// serve it and refresh in the background.
    Stale,
    /// Even the stale margin is exhausted; reload before answering.
    Expired,
}

impl Freshness {
    /// Classify a logical remaining TTL against the configured stale margin.
    pub fn classify(logical_ttl: TimeDelta, max_stale: TimeDelta) -> Self {
        if logical_ttl >= TimeDelta::zero() {
            Freshness::Fresh
        } else if logical_ttl + max_stale >= TimeDelta::zero() {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }
}

struct Inner<K, V, S>
where
    K: Key,
    V: Value,
    S: Store<K, V>,
{
    store: S,

    /// Default logical expiration for writes that do not specify one.
    ttl: Duration,
    /// Extra physical lifetime granted to every stored entry.
    max_stale: Duration,
    /// `max_stale` as a signed delta, for the logical TTL arithmetic.
    max_stale_delta: TimeDelta,

    loader: Option<Arc<dyn Loader<K, V>>>,
    admission: Arc<dyn Admission<K, V>>,
    spawner: Option<Spawner>,

    inflights: Mutex<InflightMap<K, V>>,
}

/// A stale-while-revalidate wrapper over an underlying [`Store`].
///
/// Every write extends the physical expiration by the configured stale margin. Reads classify
/// the entry as fresh, stale, or expired from the margin-shifted TTL: fresh entries are served
/// directly, stale entries are served immediately while a single detached refresh runs in the
/// background, and expired or missing entries are reloaded synchronously. Concurrent reads of
/// the same key coalesce onto one underlying operation.
///
/// The wrapper is a cheap [`Clone`] handle over shared state, so it can be shared across tasks.
pub struct StaleCache<K, V, S>
where
    K: Key,
    V: Value,
    S: Store<K, V>,
{
    inner: Arc<Inner<K, V, S>>,
}

impl<K, V, S> Clone for StaleCache<K, V, S>
where
    K: Key,
    V: Value,
    S: Store<K, V>,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Builder for [`StaleCache`].
pub struct StaleCacheBuilder<K, V, S>
where
    K: Key,
    V: Value,
    S: Store<K, V>,
{
    store: S,
    ttl: Duration,
    max_stale: Duration,
    loader: Option<Arc<dyn Loader<K, V>>>,
    admission: Arc<dyn Admission<K, V>>,
    spawner: Option<Spawner>,
}

impl<K, V, S> StaleCacheBuilder<K, V, S>
where
    K: Key,
    V: Value,
    S: Store<K, V>,
{
    /// Set the default logical expiration for writes that do not specify one.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the stale margin: how long a logically expired entry may still be served.
    ///
    /// A zero margin disables staleness entirely, reducing the wrapper to a plain TTL-shifted
    /// passthrough.
    pub fn with_max_stale(mut self, max_stale: Duration) -> Self {
        self.max_stale = max_stale;
        self
    }

    /// Set the load function invoked on a miss or refresh.
    pub fn with_loader<F, FU>(mut self, loader: F) -> Self
    where
        F: Fn(&K) -> FU + Send + Sync + 'static,
        FU: std::future::Future<Output = Result<V>> + Send + 'static,
    {
        self.loader = Some(Arc::new(move |key: &K| loader(key).boxed()));
        self
    }

    /// Set the admission predicate consulted before writing a loaded value to the store.
    pub fn with_admission<F>(mut self, admission: F) -> Self
    where
        F: Admission<K, V>,
    {
        self.admission = Arc::new(admission);
        self
    }

    /// Set the spawner that runs detached background refresh tasks.
    ///
    /// Defaults to the tokio runtime current at the triggering call site. Either way the spawned
    /// refresh is independent of the triggering caller's cancellation scope.
    pub fn with_spawner(mut self, spawner: impl Into<Spawner>) -> Self {
        self.spawner = Some(spawner.into());
        self
    }

    /// Build the cache.
    pub fn build(self) -> StaleCache<K, V, S> {
        let max_stale_delta = TimeDelta::from_std(self.max_stale).unwrap_or(TimeDelta::MAX);
        StaleCache {
            inner: Arc::new(Inner {
                store: self.store,
                ttl: self.ttl,
                max_stale: self.max_stale,
                max_stale_delta,
                loader: self.loader,
                admission: self.admission,
                spawner: self.spawner,
                inflights: Mutex::new(InflightMap::default()),
            }),
        }
    }
}

/// Releases waiters with a cancellation error if the leader's future is dropped mid-flight.
///
/// Disarmed on every regular exit path; only a cancelled leader reaches the [`Drop`] body.
struct LeadGuard<'a, K, V, S>
where
    K: Key,
    V: Value,
    S: Store<K, V>,
{
    inner: &'a Inner<K, V, S>,
    key: &'a K,
    armed: bool,
}

impl<K, V, S> LeadGuard<'_, K, V, S>
where
    K: Key,
    V: Value,
    S: Store<K, V>,
{
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<K, V, S> Drop for LeadGuard<'_, K, V, S>
where
    K: Key,
    V: Value,
    S: Store<K, V>,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let notifiers = self.inner.inflights.lock().finish(self.key);
        for notifier in notifiers {
            let _ = notifier.send(Err(Error::new(
                ErrorKind::Cancelled,
                "reload leader dropped before completion",
            )));
        }
    }
}

impl<K, V, S> StaleCache<K, V, S>
where
    K: Key,
    V: Value,
    S: Store<K, V>,
{
    /// The fixed identifier returned by [`StaleCache::kind`].
    pub const KIND: &'static str = "stale";

    /// Start building a stale cache over the given store.
    pub fn builder(store: S) -> StaleCacheBuilder<K, V, S> {
        StaleCacheBuilder {
            store,
            ttl: Duration::ZERO,
            max_stale: Duration::ZERO,
            loader: None,
            admission: Arc::new(|_: &K, _: &V| true),
            spawner: None,
        }
    }

    /// Get the value for a key, reloading or refreshing it as its freshness demands.
    ///
    /// Concurrent calls for the same key coalesce: only one underlying read or load is issued
    /// while an operation is in flight, and every caller receives the same outcome. `Ok(None)`
    /// is the deliberate "nothing to serve" result of a miss with no loader configured.
    pub async fn get(&self, key: &K) -> Result<Option<V>> {
        // Bind the flight first: a temporary guard in the match scrutinee would be held across
        // the awaits in the arms.
        let flight = self.inner.inflights.lock().join(key);
        match flight {
            Flight::Ready(result) => result,
            Flight::Wait(waiter) => match waiter.await {
                Ok(result) => result,
                Err(e) => Err(Error::new(ErrorKind::ChannelClosed, "in-flight operation abandoned").with_source(e)),
            },
            Flight::Lead => self.lead(key).await,
        }
    }

    /// Drive the reload for a key this caller won the in-flight record for.
    async fn lead(&self, key: &K) -> Result<Option<V>> {
        let mut guard = LeadGuard {
            inner: self.inner.as_ref(),
            key,
            armed: true,
        };

        let result = match self.inner.store.get_with_ttl(key).await {
            Err(e) if e.is_not_found() => self.reload(key).await,
            Err(e) => Err(e),
            Ok((value, stored_ttl)) => {
                let logical_ttl = stored_ttl
                    .checked_sub(&self.inner.max_stale_delta)
                    .unwrap_or(TimeDelta::MIN);
                match Freshness::classify(logical_ttl, self.inner.max_stale_delta) {
                    Freshness::Fresh => Ok(Some(value)),
                    Freshness::Expired => self.reload(key).await,
                    Freshness::Stale => {
                        // Publish the stale value first so neither the coalesced waiters nor any
                        // later arrival blocks on the refresh, then hand the record over to the
                        // detached refresh task, which removes it when done.
                        let result = Ok(Some(value));
                        let notifiers = self.inner.inflights.lock().settle(key, result.clone());
                        guard.disarm();
                        Self::notify(notifiers, &result);
                        self.spawn_refresh(key.clone());
                        return result;
                    }
                }
            }
        };

        let notifiers = self.inner.inflights.lock().finish(key);
        guard.disarm();
        Self::notify(notifiers, &result);
        result
    }

    fn notify(notifiers: Vec<Notifier<V>>, result: &Result<Option<V>>) {
        for notifier in notifiers {
            let _ = notifier.send(result.clone());
        }
    }

    fn spawn_refresh(&self, key: K) {
        let cache = self.clone();
        let spawner = self.inner.spawner.clone().unwrap_or_else(Spawner::current);
        // The handle is dropped on purpose: the refresh must run to completion even if every
        // interested caller has gone away.
        drop(spawner.spawn(async move {
            if let Err(e) = cache.reload(&key).await {
                tracing::warn!("background refresh for {key:?} failed: {e}");
            }
            cache.inner.inflights.lock().finish(&key);
        }));
    }

    /// Load a fresh value and write it through this wrapper.
    ///
    /// With no loader configured this is a no-op producing `Ok(None)`. Load failures propagate
    /// without touching the store. A failed store write is logged and swallowed; the loaded
    /// value is still returned.
    async fn reload(&self, key: &K) -> Result<Option<V>> {
        let loader = match self.inner.loader.clone() {
            Some(loader) => loader,
            None => return Ok(None),
        };

        let value = (loader)(key).await?;
        if !(self.inner.admission)(key, &value) {
            return Ok(Some(value));
        }
        if let Err(e) = self.set(key.clone(), value.clone(), SetOptions::new()).await {
            tracing::warn!("cache write after reload for {key:?} failed: {e}");
        }
        Ok(Some(value))
    }

    /// Get the value for a key together with its logical remaining time-to-live.
    ///
    /// The logical TTL is the stored physical TTL minus the stale margin and may be negative;
    /// negativity is the staleness signal [`StaleCache::get`] classifies on. This is a pure
    /// read: no coalescing, no reload.
    pub async fn get_with_ttl(&self, key: &K) -> Result<(V, TimeDelta)> {
        let (value, stored_ttl) = self.inner.store.get_with_ttl(key).await?;
        let logical_ttl = stored_ttl
            .checked_sub(&self.inner.max_stale_delta)
            .unwrap_or(TimeDelta::MIN);
        Ok((value, logical_ttl))
    }

    /// Store a value, extending the requested (or default) expiration by the stale margin.
    pub async fn set(&self, key: K, value: V, options: SetOptions) -> Result<()> {
        let expiration = options.expiration().unwrap_or(self.inner.ttl);
        let options = options.with_expiration(self.inner.max_stale.saturating_add(expiration));
        self.inner.store.set(key, value, options).await
    }

    /// Remove the value stored for the given key.
    pub async fn delete(&self, key: &K) -> Result<()> {
        self.inner.store.delete(key).await
    }

    /// Remove every entry matching the given options.
    pub async fn invalidate(&self, options: InvalidateOptions) -> Result<()> {
        self.inner.store.invalidate(options).await
    }

    /// Remove all entries.
    pub async fn clear(&self) -> Result<()> {
        self.inner.store.clear().await
    }

    /// A fixed identifier for this wrapper kind, for introspection by outer decorators.
    pub fn kind(&self) -> &'static str {
        Self::KIND
    }
}
