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

//! cellar is a stale-while-revalidate caching abstraction for Rust.
//!
//! The centerpiece is [`StaleCache`], a wrapper over any [`Store`] that grants every entry a
//! stale margin of extra physical lifetime. A read whose logical time-to-live ran out but is
//! still inside the margin is answered immediately with the stale value while a single detached
//! refresh task reloads it in the background; a read past the margin (or a plain miss) reloads
//! synchronously. Concurrent readers of the same key coalesce onto one underlying operation.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use cellar::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let cache = StaleCache::builder(MemoryStore::new())
//!         .with_ttl(Duration::from_secs(60))
//!         .with_max_stale(Duration::from_secs(10))
//!         .with_loader(|key: &String| {
//!             let key = key.clone();
//!             async move { Ok(format!("value of {key}")) }
//!         })
//!         .build();
//!
//!     let value = cache.get(&"hello".to_string()).await?;
//!     assert_eq!(value.as_deref(), Some("value of hello"));
//!     Ok(())
//! }
//! ```

/// Cache wrappers.
pub mod cache;
/// The underlying store contract and reference backends.
pub mod store;

/// The cellar prelude.
pub mod prelude;

pub use cellar_common::{
    code::{Key, Value},
    error::{Error, ErrorKind, Result},
    spawn::Spawner,
};

pub use crate::{
    cache::{Admission, Freshness, Loader, StaleCache, StaleCacheBuilder},
    store::{InvalidateOptions, MemoryStore, SetOptions, Store},
};
