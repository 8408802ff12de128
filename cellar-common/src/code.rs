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

use std::{fmt::Debug, hash::Hash};

/// Key trait for the cache key.
///
/// Keys are cloned when an in-flight record or a background refresh task needs to own them.
pub trait Key: Send + Sync + 'static + Hash + Eq + Clone + Debug {}
impl<T> Key for T where T: Send + Sync + 'static + Hash + Eq + Clone + Debug {}

/// Value trait for the cache value.
///
/// Values are cloned to fan a single result out to every coalesced caller.
pub trait Value: Send + Sync + 'static + Clone {}
impl<T> Value for T where T: Send + Sync + 'static + Clone {}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_key<T: Key>() {}
    fn is_value<T: Value>() {}

    #[test]
    fn test_trait_bounds() {
        is_key::<u64>();
        is_key::<String>();
        is_key::<(String, u32)>();
        is_value::<Vec<u8>>();
        is_value::<String>();
    }
}
