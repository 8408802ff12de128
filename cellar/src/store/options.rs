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

use std::time::Duration;

/// Options for a store write.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    expiration: Option<Duration>,
    tags: Vec<String>,
}

impl SetOptions {
    /// Create empty write options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the expiration of the entry.
    ///
    /// When unset, wrappers substitute their configured default expiration. A zero duration means
    /// "no expiry" for backends that support it.
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Attach invalidation tags to the entry.
    pub fn with_tags<T, I>(mut self, tags: I) -> Self
    where
        T: Into<String>,
        I: IntoIterator<Item = T>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Get the requested expiration, if any.
    pub fn expiration(&self) -> Option<Duration> {
        self.expiration
    }

    /// Get the invalidation tags.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Options for a tag-based invalidation.
#[derive(Debug, Clone, Default)]
pub struct InvalidateOptions {
    tags: Vec<String>,
}

impl InvalidateOptions {
    /// Create empty invalidation options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select entries carrying at least one of the given tags.
    pub fn with_tags<T, I>(mut self, tags: I) -> Self
    where
        T: Into<String>,
        I: IntoIterator<Item = T>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Get the selected tags.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Return `true` if no tag is selected.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
