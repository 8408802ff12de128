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

use std::hash::Hash;

use cellar_common::error::Result;
use equivalent::Equivalent;
use hashbrown::hash_map::{Entry as HashMapEntry, HashMap};
use tokio::sync::oneshot;

/// Receiver half of a single-shot completion signal.
pub type Waiter<V> = oneshot::Receiver<Result<Option<V>>>;
/// Sender half of a single-shot completion signal.
pub type Notifier<V> = oneshot::Sender<Result<Option<V>>>;

/// Outcome of joining the in-flight operation for a key.
pub enum Flight<V> {
    /// No operation was in flight; the caller created the record and leads the reload.
    Lead,
    /// An operation is in flight with no published result yet; await the waiter.
    Wait(Waiter<V>),
    /// An operation is in flight but its result is already published; use it directly.
    Ready(Result<Option<V>>),
}

enum Inflight<V> {
    /// The leader has not produced a result yet; arriving callers park a notifier here.
    Pending { notifiers: Vec<Notifier<V>> },
    /// The result is published while a background refresh still runs; arriving callers
    /// read it without waiting.
    Settled { result: Result<Option<V>> },
}

/// A table of the in-flight reload operations, at most one per key.
///
/// The table itself is not synchronized; the owning cache guards it with a mutex and performs
/// every state transition under a single lock acquisition, which is what makes first-arrival
/// races on the same key impossible.
pub struct InflightMap<K, V> {
    inflights: HashMap<K, Inflight<V>>,
}

impl<K, V> Default for InflightMap<K, V> {
    fn default() -> Self {
        Self {
            inflights: HashMap::new(),
        }
    }
}

impl<K, V> InflightMap<K, V>
where
    K: Hash + Eq,
    V: Clone,
{
    /// Join the in-flight operation for `key`, creating the record if absent.
    pub fn join<Q>(&mut self, key: &Q) -> Flight<V>
    where
        Q: Hash + Equivalent<K> + ?Sized + ToOwned<Owned = K>,
    {
        match self.inflights.entry(key.to_owned()) {
            HashMapEntry::Vacant(v) => {
                v.insert(Inflight::Pending { notifiers: vec![] });
                Flight::Lead
            }
            HashMapEntry::Occupied(mut o) => match o.get_mut() {
                Inflight::Pending { notifiers } => {
                    let (tx, rx) = oneshot::channel();
                    notifiers.push(tx);
                    Flight::Wait(rx)
                }
                Inflight::Settled { result } => Flight::Ready(result.clone()),
            },
        }
    }

    /// Publish a result on `key`'s record without removing it.
    ///
    /// Returns the parked notifiers so the caller can fire them outside the lock.
    pub fn settle<Q>(&mut self, key: &Q, result: Result<Option<V>>) -> Vec<Notifier<V>>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        match self.inflights.get_mut(key) {
            Some(inflight) => match std::mem::replace(inflight, Inflight::Settled { result }) {
                Inflight::Pending { notifiers } => notifiers,
                Inflight::Settled { .. } => vec![],
            },
            None => vec![],
        }
    }

    /// Remove `key`'s record, returning any still-parked notifiers.
    pub fn finish<Q>(&mut self, key: &Q) -> Vec<Notifier<V>>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        match self.inflights.remove(key) {
            Some(Inflight::Pending { notifiers }) => notifiers,
            Some(Inflight::Settled { .. }) | None => vec![],
        }
    }

    /// Number of keys with an operation in flight.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inflights.len()
    }

    /// Return `true` if no operation is in flight.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.inflights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_arrival_leads() {
        let mut map: InflightMap<String, u64> = InflightMap::default();
        assert!(matches!(map.join("k"), Flight::Lead));
        assert!(matches!(map.join("k"), Flight::Wait(_)));
        assert!(matches!(map.join("k"), Flight::Wait(_)));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_finish_drains_notifiers() {
        let mut map: InflightMap<String, u64> = InflightMap::default();
        assert!(matches!(map.join("k"), Flight::Lead));
        let w1 = map.join("k");
        let w2 = map.join("k");

        let notifiers = map.finish("k");
        assert_eq!(notifiers.len(), 2);
        assert!(map.is_empty());

        for notifier in notifiers {
            notifier.send(Ok(Some(7))).unwrap();
        }
        for waiter in [w1, w2] {
            match waiter {
                Flight::Wait(rx) => assert_eq!(rx.blocking_recv().unwrap().unwrap(), Some(7)),
                _ => panic!("expected waiter"),
            }
        }
    }

    #[test]
    fn test_settled_record_serves_immediately() {
        let mut map: InflightMap<String, u64> = InflightMap::default();
        assert!(matches!(map.join("k"), Flight::Lead));
        let _waiter = map.join("k");

        let notifiers = map.settle("k", Ok(Some(3)));
        assert_eq!(notifiers.len(), 1);
        // The record stays alive for the background refresh, but late arrivals do not wait.
        assert_eq!(map.len(), 1);
        match map.join("k") {
            Flight::Ready(result) => assert_eq!(result.unwrap(), Some(3)),
            _ => panic!("expected published result"),
        }

        assert!(map.finish("k").is_empty());
        assert!(map.is_empty());
    }

    #[test]
    fn test_finish_unknown_key() {
        let mut map: InflightMap<String, u64> = InflightMap::default();
        assert!(map.finish("nope").is_empty());
        assert!(map.settle("nope", Ok(None)).is_empty());
    }
}
