//! Access token validation and revocation (RFC 7009).

use super::AuthorizationServer;
use crate::error::{StoreResult, TokenError};
use crate::models::{AccessToken, Expiring, TokenKind};

impl AuthorizationServer {
    /// Resolve a bearer token to its grant.
    ///
    /// An expired token is deleted on the spot.
    ///
    /// # Errors
    ///
    /// `TokenNotFound` for unknown or revoked tokens, `TokenExpired` once
    /// past expiry, `Store` on backend failure.
    pub async fn validate(&self, token: &str) -> Result<AccessToken, TokenError> {
        let Some(record) = self.bounded(self.store.access_tokens().get(token)).await? else {
            return Err(TokenError::TokenNotFound);
        };

        if record.is_expired() {
            self.bounded(self.store.access_tokens().delete(token)).await?;
            tracing::debug!(client_id = %record.client_id, "Access token expired");
            return Err(TokenError::TokenExpired);
        }

        Ok(record)
    }

    /// Revoke a token of a known kind. Unknown tokens are a no-op.
    ///
    /// Revoking a refresh token also revokes the access token issued with it.
    pub async fn revoke(&self, token: &str, kind: TokenKind) -> StoreResult<bool> {
        match kind {
            TokenKind::Access => self.bounded(self.store.access_tokens().delete(token)).await,
            TokenKind::Refresh => {
                let Some(refresh) = self.bounded(self.store.refresh_tokens().take(token)).await?
                else {
                    return Ok(false);
                };
                self.bounded(self.store.access_tokens().delete(&refresh.access_token)).await?;
                Ok(true)
            }
        }
    }

    /// Revoke a token, trying the hinted kind first.
    pub async fn revoke_any(&self, token: &str, hint: Option<&str>) -> StoreResult<bool> {
        let first = hint.and_then(TokenKind::from_hint).unwrap_or(TokenKind::Access);
        if self.revoke(token, first).await? {
            return Ok(true);
        }
        self.revoke(token, first.other()).await
    }

    /// Revoke a token on behalf of an authenticated client.
    ///
    /// Tokens issued to another client are left untouched. The caller still
    /// answers 200 so token ownership does not leak.
    pub async fn revoke_for_client(
        &self,
        client_id: &str,
        token: &str,
        hint: Option<&str>,
    ) -> StoreResult<bool> {
        let first = hint.and_then(TokenKind::from_hint).unwrap_or(TokenKind::Access);
        for kind in [first, first.other()] {
            let owner = match kind {
                TokenKind::Access => self
                    .bounded(self.store.access_tokens().get(token))
                    .await?
                    .map(|t| t.client_id),
                TokenKind::Refresh => self
                    .bounded(self.store.refresh_tokens().get(token))
                    .await?
                    .map(|t| t.client_id),
            };
            match owner {
                Some(owner) if owner == client_id => return self.revoke(token, kind).await,
                Some(owner) => {
                    tracing::warn!(
                        client_id = %client_id,
                        issued_to = %owner,
                        "Refusing to revoke a token issued to another client"
                    );
                    return Ok(false);
                }
                None => {}
            }
        }
        Ok(false)
    }
}
