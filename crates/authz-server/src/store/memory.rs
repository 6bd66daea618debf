//! In-memory credential namespace.

use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::CredentialNamespace;
use crate::error::{StoreError, StoreResult};
use crate::models::Expiring;

/// A sharded concurrent map of records.
///
/// Every operation touches a single shard lock for a bounded time; nothing
/// here awaits.
pub struct MemoryNamespace<R> {
    name: &'static str,
    entries: DashMap<String, R>,
}

impl<R> MemoryNamespace<R> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self { name, entries: DashMap::new() }
    }
}

#[async_trait]
impl<R> CredentialNamespace<R> for MemoryNamespace<R>
where
    R: Expiring + Clone + Send + Sync + 'static,
{
    async fn put(&self, key: String, record: R) -> StoreResult<()> {
        match self.entries.entry(key) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey { namespace: self.name }),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn take(&self, key: &str) -> StoreResult<Option<R>> {
        Ok(self.entries.remove(key).map(|(_, record)| record))
    }

    async fn get(&self, key: &str) -> StoreResult<Option<R>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn purge_expired(&self, now: Instant) -> StoreResult<usize> {
        // Collect first: removing while iterating would re-lock a held shard.
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_expired_at(now))
            .map(|entry| entry.key().clone())
            .collect();

        let removed = expired
            .iter()
            .filter(|key| {
                self.entries.remove_if(key.as_str(), |_, r| r.is_expired_at(now)).is_some()
            })
            .count();
        Ok(removed)
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.entries.len())
    }
}
