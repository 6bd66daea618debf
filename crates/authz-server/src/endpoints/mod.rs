//! Protocol endpoints, independent of the HTTP binding.
//!
//! [`AuthorizationServer`] owns the client registry, the credential store and
//! the configuration. Its operations are split by endpoint:
//!
//! - [`authorize`]: authorization requests and code issuance
//! - [`token`]: `authorization_code` and `refresh_token` grants
//! - [`validator`]: access token validation and revocation

pub mod authorize;
pub mod token;
pub mod validator;

use std::future::Future;
use std::time::Instant;

pub use authorize::{AuthorizeError, AuthorizeRequest, AuthorizeResponse};
pub use token::{ClientCredentials, Grant, TokenRequest, TokenResponse};

use crate::config::Config;
use crate::crypto;
use crate::error::{OAuthResult, StoreError, StoreResult};
use crate::models::{AccessToken, RefreshToken, ScopeSet};
use crate::registry::ClientRegistry;
use crate::store::CredentialStore;

/// The authorization server core.
///
/// Cheap to clone: all state is shared.
#[derive(Clone, Debug)]
pub struct AuthorizationServer {
    config: Config,
    registry: ClientRegistry,
    store: CredentialStore,
}

impl AuthorizationServer {
    #[must_use]
    pub fn new(config: Config, registry: ClientRegistry, store: CredentialStore) -> Self {
        Self { config, registry, store }
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Start the background sweeper if one is configured.
    pub fn start_sweeper(&self) -> Option<tokio::task::JoinHandle<()>> {
        self.config.sweep_interval.map(|interval| {
            tracing::info!(interval_secs = interval.as_secs(), "Starting credential sweeper");
            self.store.spawn_sweeper(interval)
        })
    }

    /// Run a store operation under the configured time bound.
    pub(crate) async fn bounded<T>(
        &self,
        op: impl Future<Output = StoreResult<T>> + Send,
    ) -> StoreResult<T> {
        let limit = self.config.store_timeout;
        tokio::time::timeout(limit, op).await.map_err(|_| StoreError::Timeout(limit))?
    }

    /// Issue and persist a fresh access + refresh token pair.
    pub(crate) async fn issue_token_pair(
        &self,
        client_id: &str,
        user_id: &str,
        scopes: ScopeSet,
    ) -> OAuthResult<TokenResponse> {
        let access_token = crypto::generate_access_token()?;
        let refresh_token = crypto::generate_refresh_token()?;
        let now = Instant::now();

        let access = AccessToken {
            client_id: client_id.to_owned(),
            user_id: user_id.to_owned(),
            scopes: scopes.clone(),
            expires_at: now + self.config.access_token_ttl,
        };
        let refresh = RefreshToken {
            client_id: client_id.to_owned(),
            user_id: user_id.to_owned(),
            scopes: scopes.clone(),
            expires_at: now + self.config.refresh_token_ttl,
            access_token: access_token.clone(),
        };

        self.bounded(self.store.access_tokens().put(access_token.clone(), access)).await?;
        if let Err(e) =
            self.bounded(self.store.refresh_tokens().put(refresh_token.clone(), refresh)).await
        {
            // Do not leave an access token without its refresh sibling.
            if let Err(rollback) =
                self.bounded(self.store.access_tokens().delete(&access_token)).await
            {
                tracing::error!(
                    client_id = %client_id,
                    error = %rollback,
                    "Failed to roll back access token"
                );
            }
            return Err(e.into());
        }

        Ok(TokenResponse::bearer(
            access_token,
            self.config.access_token_expires_in(),
            refresh_token,
            &scopes,
        ))
    }
}
