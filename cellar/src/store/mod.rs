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

//! Underlying key/value store contract and the reference in-memory implementation.

mod memory;
mod options;

pub use memory::MemoryStore;
pub use options::{InvalidateOptions, SetOptions};

use std::sync::Arc;

use async_trait::async_trait;
use cellar_common::{
    code::{Key, Value},
    error::Result,
};
use chrono::TimeDelta;

/// The underlying key/value store consumed by cache wrappers.
///
/// The store is assumed to enforce its own expiry; entries may or may not be purged exactly when
/// their time-to-live reaches zero. Absence is reported as an [`crate::ErrorKind::NotFound`]
/// error, which is the signal wrappers recover from.
#[async_trait]
pub trait Store<K, V>: Send + Sync + 'static
where
    K: Key,
    V: Value,
{
    /// Get the value stored for the given key.
    async fn get(&self, key: &K) -> Result<V>;

    /// Get the value stored for the given key and its remaining physical time-to-live.
    ///
    /// The TTL is signed: backends that keep expired entries around may report a negative
    /// remainder instead of absence.
    async fn get_with_ttl(&self, key: &K) -> Result<(V, TimeDelta)>;

    /// Store a value for the given key.
    async fn set(&self, key: K, value: V, options: SetOptions) -> Result<()>;

    /// Remove the value stored for the given key.
    async fn delete(&self, key: &K) -> Result<()>;

    /// Remove every entry matching the given options.
    async fn invalidate(&self, options: InvalidateOptions) -> Result<()>;

    /// Remove all entries.
    async fn clear(&self) -> Result<()>;

    /// A fixed identifier for the store kind, for introspection by outer decorators.
    fn kind(&self) -> &'static str;
}

/// A shared store handle is a store itself, so a backend can be handed to a cache wrapper while
/// the caller keeps a handle for direct access.
#[async_trait]
impl<K, V, T> Store<K, V> for Arc<T>
where
    K: Key,
    V: Value,
    T: Store<K, V>,
{
    async fn get(&self, key: &K) -> Result<V> {
        self.as_ref().get(key).await
    }

    async fn get_with_ttl(&self, key: &K) -> Result<(V, TimeDelta)> {
        self.as_ref().get_with_ttl(key).await
    }

    async fn set(&self, key: K, value: V, options: SetOptions) -> Result<()> {
        self.as_ref().set(key, value, options).await
    }

    async fn delete(&self, key: &K) -> Result<()> {
        self.as_ref().delete(key).await
    }

    async fn invalidate(&self, options: InvalidateOptions) -> Result<()> {
        self.as_ref().invalidate(options).await
    }

    async fn clear(&self) -> Result<()> {
        self.as_ref().clear().await
    }

    fn kind(&self) -> &'static str {
        self.as_ref().kind()
    }
}
