//! Credential storage.
//!
//! Three independent namespaces (authorization codes, access tokens, refresh
//! tokens), each behind the [`CredentialNamespace`] trait so a backend can be
//! injected. `take` is the single-use primitive: when several callers race on
//! one key, exactly one of them gets the record.

mod memory;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

pub use memory::MemoryNamespace;

use crate::error::StoreResult;
use crate::models::{AccessToken, AuthorizationCode, Expiring, RefreshToken};

/// An expiring key -> record namespace.
#[async_trait]
pub trait CredentialNamespace<R>: Send + Sync
where
    R: Expiring + Clone + Send + Sync + 'static,
{
    /// Insert a record. Fails if the key is already present.
    async fn put(&self, key: String, record: R) -> StoreResult<()>;

    /// Atomically read and remove a record.
    async fn take(&self, key: &str) -> StoreResult<Option<R>>;

    /// Read a record without removing it.
    async fn get(&self, key: &str) -> StoreResult<Option<R>>;

    /// Remove a record. Returns whether it was present.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Remove every record expired at `now`, each with an atomic
    /// delete-if-expired. Returns the number removed.
    async fn purge_expired(&self, now: Instant) -> StoreResult<usize>;

    /// Number of stored records, expired ones included.
    async fn len(&self) -> StoreResult<usize>;
}

/// Counts of records removed by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeStats {
    pub codes: usize,
    pub access_tokens: usize,
    pub refresh_tokens: usize,
}

impl PurgeStats {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.codes + self.access_tokens + self.refresh_tokens
    }
}

/// Issued codes and tokens.
#[derive(Clone)]
pub struct CredentialStore {
    codes: Arc<dyn CredentialNamespace<AuthorizationCode>>,
    access_tokens: Arc<dyn CredentialNamespace<AccessToken>>,
    refresh_tokens: Arc<dyn CredentialNamespace<RefreshToken>>,
}

impl CredentialStore {
    /// Assemble a store from injected namespaces.
    #[must_use]
    pub fn new(
        codes: Arc<dyn CredentialNamespace<AuthorizationCode>>,
        access_tokens: Arc<dyn CredentialNamespace<AccessToken>>,
        refresh_tokens: Arc<dyn CredentialNamespace<RefreshToken>>,
    ) -> Self {
        Self { codes, access_tokens, refresh_tokens }
    }

    /// Volatile in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryNamespace::<AuthorizationCode>::new("code")),
            Arc::new(MemoryNamespace::<AccessToken>::new("access_token")),
            Arc::new(MemoryNamespace::<RefreshToken>::new("refresh_token")),
        )
    }

    #[must_use]
    pub fn codes(&self) -> &dyn CredentialNamespace<AuthorizationCode> {
        self.codes.as_ref()
    }

    #[must_use]
    pub fn access_tokens(&self) -> &dyn CredentialNamespace<AccessToken> {
        self.access_tokens.as_ref()
    }

    #[must_use]
    pub fn refresh_tokens(&self) -> &dyn CredentialNamespace<RefreshToken> {
        self.refresh_tokens.as_ref()
    }

    /// Remove expired records from all namespaces.
    pub async fn purge_expired(&self) -> StoreResult<PurgeStats> {
        let now = Instant::now();
        Ok(PurgeStats {
            codes: self.codes.purge_expired(now).await?,
            access_tokens: self.access_tokens.purge_expired(now).await?,
            refresh_tokens: self.refresh_tokens.purge_expired(now).await?,
        })
    }

    /// Start a background task that purges expired records every `interval`.
    ///
    /// Expiry is always enforced on read; the sweep only bounds memory.
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match store.purge_expired().await {
                    Ok(stats) if stats.total() > 0 => {
                        tracing::debug!(
                            codes = stats.codes,
                            access_tokens = stats.access_tokens,
                            refresh_tokens = stats.refresh_tokens,
                            "Purged expired credentials"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "Credential sweep failed"),
                }
            }
        })
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish()
    }
}
