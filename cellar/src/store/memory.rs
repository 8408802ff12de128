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

use std::time::Instant;

use async_trait::async_trait;
use cellar_common::{
    code::{Key, Value},
    error::{Error, Result},
};
use chrono::TimeDelta;
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::store::{InvalidateOptions, SetOptions, Store};

struct Entry<V> {
    value: V,
    deadline: Option<Instant>,
    tags: Vec<String>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= now)
    }

    fn remaining(&self, now: Instant) -> TimeDelta {
        match self.deadline {
            Some(deadline) => TimeDelta::from_std(deadline.saturating_duration_since(now))
                .unwrap_or(TimeDelta::MAX),
            None => TimeDelta::MAX,
        }
    }
}

/// Reference in-process store backed by a hash map.
///
/// Expired entries are treated as absent on read and purged lazily. There is no eviction policy
/// and no capacity accounting; this backend exists for tests, examples, and small embedded use.
pub struct MemoryStore<K, V>
where
    K: Key,
    V: Value,
{
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> Default for MemoryStore<K, V>
where
    K: Key,
    V: Value,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MemoryStore<K, V>
where
    K: Key,
    V: Value,
{
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn lookup(&self, key: &K) -> Result<(V, TimeDelta)> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    return Ok((entry.value.clone(), entry.remaining(now)));
                }
                Some(_) => {}
                None => return Err(Error::not_found()),
            }
        }
        // The entry expired; purge it under the write lock unless it has been replaced meanwhile.
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
        Err(Error::not_found())
    }
}

#[async_trait]
impl<K, V> Store<K, V> for MemoryStore<K, V>
where
    K: Key,
    V: Value,
{
    async fn get(&self, key: &K) -> Result<V> {
        self.lookup(key).map(|(value, _)| value)
    }

    async fn get_with_ttl(&self, key: &K) -> Result<(V, TimeDelta)> {
        self.lookup(key)
    }

    async fn set(&self, key: K, value: V, options: SetOptions) -> Result<()> {
        let deadline = match options.expiration() {
            Some(expiration) if !expiration.is_zero() => Some(Instant::now() + expiration),
            _ => None,
        };
        let entry = Entry {
            value,
            deadline,
            tags: options.tags().to_vec(),
        };
        self.entries.write().insert(key, entry);
        Ok(())
    }

    async fn delete(&self, key: &K) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn invalidate(&self, options: InvalidateOptions) -> Result<()> {
        if options.is_empty() {
            return Ok(());
        }
        self.entries
            .write()
            .retain(|_, entry| !entry.tags.iter().any(|tag| options.tags().contains(tag)));
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let store = MemoryStore::new();
        store.set("k".to_string(), 1u64, SetOptions::new()).await.unwrap();
        assert_eq!(store.get(&"k".to_string()).await.unwrap(), 1);
        assert!(store.get(&"missing".to_string()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_ttl_reported() {
        let store = MemoryStore::new();
        store
            .set("k".to_string(), 1u64, SetOptions::new().with_expiration(Duration::from_secs(60)))
            .await
            .unwrap();
        let (_, ttl) = store.get_with_ttl(&"k".to_string()).await.unwrap();
        assert!(ttl <= TimeDelta::seconds(60));
        assert!(ttl > TimeDelta::seconds(59));
    }

    #[tokio::test]
    async fn test_no_expiration_never_expires() {
        let store = MemoryStore::new();
        store
            .set("k".to_string(), 1u64, SetOptions::new().with_expiration(Duration::ZERO))
            .await
            .unwrap();
        let (_, ttl) = store.get_with_ttl(&"k".to_string()).await.unwrap();
        assert_eq!(ttl, TimeDelta::MAX);
    }

    #[tokio::test]
    async fn test_lazy_expiry() {
        let store = MemoryStore::new();
        store
            .set("k".to_string(), 1u64, SetOptions::new().with_expiration(Duration::from_millis(20)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.get(&"k".to_string()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let store = MemoryStore::new();
        store.set("a".to_string(), 1u64, SetOptions::new()).await.unwrap();
        store.set("b".to_string(), 2u64, SetOptions::new()).await.unwrap();

        store.delete(&"a".to_string()).await.unwrap();
        assert!(store.get(&"a".to_string()).await.is_err());
        assert!(store.get(&"b".to_string()).await.is_ok());

        store.clear().await.unwrap();
        assert!(store.get(&"b".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn test_invalidate_by_tag() {
        let store = MemoryStore::new();
        store
            .set("a".to_string(), 1u64, SetOptions::new().with_tags(["red"]))
            .await
            .unwrap();
        store
            .set("b".to_string(), 2u64, SetOptions::new().with_tags(["blue"]))
            .await
            .unwrap();
        store.set("c".to_string(), 3u64, SetOptions::new()).await.unwrap();

        store
            .invalidate(InvalidateOptions::new().with_tags(["red"]))
            .await
            .unwrap();
        assert!(store.get(&"a".to_string()).await.is_err());
        assert!(store.get(&"b".to_string()).await.is_ok());
        assert!(store.get(&"c".to_string()).await.is_ok());

        // Empty options select nothing.
        store.invalidate(InvalidateOptions::new()).await.unwrap();
        assert!(store.get(&"b".to_string()).await.is_ok());
    }

    #[tokio::test]
    async fn test_kind() {
        let store: MemoryStore<String, u64> = MemoryStore::new();
        assert_eq!(Store::kind(&store), "memory");
    }

    #[tokio::test]
    async fn test_shared_handle_is_a_store() {
        fn assert_store<K: Key, V: Value, S: Store<K, V>>(store: S) -> S {
            store
        }

        let store = assert_store(std::sync::Arc::new(MemoryStore::new()));
        store.set("k".to_string(), 1u64, SetOptions::new()).await.unwrap();
        assert_eq!(store.as_ref().get(&"k".to_string()).await.unwrap(), 1);
        assert_eq!(Store::kind(&store), "memory");
    }
}
