//! Token endpoint (RFC 6749 §4.1.3 and §6).
//!
//! Grants are parsed into [`Grant`] and dispatched with one exhaustive
//! match. Codes and refresh tokens are taken out of the store before any
//! other check, so a credential is spent even when the request fails.

use serde::{Deserialize, Serialize};

use super::AuthorizationServer;
use crate::error::{OAuthError, OAuthResult};
use crate::models::{Expiring, ScopeSet};
use crate::pkce;

/// Form parameters of a token request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Client credentials presented at the token or revocation endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self { client_id: client_id.into(), client_secret: client_secret.into() }
    }
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials").field("client_id", &self.client_id).finish()
    }
}

/// A parsed grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    AuthorizationCode { code: String, redirect_uri: String, code_verifier: Option<String> },
    RefreshToken { refresh_token: String, scope: Option<ScopeSet> },
}

impl Grant {
    /// Parse the grant-specific parameters of a token request.
    pub fn from_request(request: &TokenRequest) -> OAuthResult<Self> {
        let grant_type = required(request.grant_type.as_deref(), "grant_type")?;
        match grant_type {
            "authorization_code" => Ok(Self::AuthorizationCode {
                code: required(request.code.as_deref(), "code")?.to_owned(),
                redirect_uri: required(request.redirect_uri.as_deref(), "redirect_uri")?.to_owned(),
                code_verifier: request.code_verifier.clone().filter(|v| !v.is_empty()),
            }),
            "refresh_token" => Ok(Self::RefreshToken {
                refresh_token: required(request.refresh_token.as_deref(), "refresh_token")?
                    .to_owned(),
                scope: request.scope.as_deref().map(ScopeSet::parse).filter(|s| !s.is_empty()),
            }),
            other => Err(OAuthError::UnsupportedGrantType(format!(
                "grant_type '{other}' is not supported"
            ))),
        }
    }

    /// Wire name of the grant type.
    #[must_use]
    pub const fn grant_type(&self) -> &'static str {
        match self {
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::RefreshToken { .. } => "refresh_token",
        }
    }
}

/// Successful token response (RFC 6749 §5.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: String,
    pub scope: String,
}

impl TokenResponse {
    #[must_use]
    pub fn bearer(
        access_token: String,
        expires_in: u64,
        refresh_token: String,
        scopes: &ScopeSet,
    ) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            refresh_token,
            scope: scopes.to_string(),
        }
    }
}

impl AuthorizationServer {
    /// Handle a token request whose credentials are in the form body.
    pub async fn token(&self, request: TokenRequest) -> OAuthResult<TokenResponse> {
        let credentials = match (request.client_id.as_deref(), request.client_secret.as_deref()) {
            (Some(id), Some(secret)) => Some(ClientCredentials::new(id, secret)),
            _ => None,
        };
        self.token_with_credentials(credentials, &request).await
    }

    /// Handle a token request with already-extracted client credentials.
    ///
    /// Client authentication runs first and fails with `invalid_client`
    /// whatever the grant type.
    pub async fn token_with_credentials(
        &self,
        credentials: Option<ClientCredentials>,
        request: &TokenRequest,
    ) -> OAuthResult<TokenResponse> {
        let client_id = self.authenticate_client(credentials.as_ref())?;

        let grant = Grant::from_request(request)?;
        let grant_type = grant.grant_type();

        let response = match grant {
            Grant::AuthorizationCode { code, redirect_uri, code_verifier } => {
                self.exchange_code(&client_id, &code, &redirect_uri, code_verifier.as_deref()).await
            }
            Grant::RefreshToken { refresh_token, scope } => {
                self.refresh(&client_id, &refresh_token, scope).await
            }
        }?;

        tracing::info!(
            client_id = %client_id,
            grant_type,
            scope = %response.scope,
            "Issued token pair"
        );

        Ok(response)
    }

    /// Authenticate a client and return its id.
    pub fn authenticate_client(
        &self,
        credentials: Option<&ClientCredentials>,
    ) -> OAuthResult<String> {
        let Some(credentials) = credentials else {
            return Err(OAuthError::invalid_client());
        };
        if credentials.client_id.is_empty()
            || !self.registry.validate_secret(&credentials.client_id, &credentials.client_secret)
        {
            tracing::warn!(client_id = %credentials.client_id, "Client authentication failed");
            return Err(OAuthError::invalid_client());
        }
        Ok(credentials.client_id.clone())
    }

    async fn exchange_code(
        &self,
        client_id: &str,
        code: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> OAuthResult<TokenResponse> {
        // Spent on first read, whatever happens next.
        let Some(record) = self.bounded(self.store.codes().take(code)).await? else {
            tracing::debug!(client_id = %client_id, "Unknown or already used authorization code");
            return Err(OAuthError::invalid_grant("unknown or already used authorization code"));
        };

        if record.is_expired() {
            return Err(OAuthError::invalid_grant("authorization code expired"));
        }
        if record.client_id != client_id {
            tracing::warn!(
                client_id = %client_id,
                issued_to = %record.client_id,
                "Authorization code presented by another client"
            );
            return Err(OAuthError::invalid_grant(
                "authorization code was issued to another client",
            ));
        }
        if record.redirect_uri != redirect_uri {
            return Err(OAuthError::invalid_grant(
                "redirect_uri does not match authorization request",
            ));
        }

        if let Some(challenge) = &record.pkce {
            let Some(verifier) = code_verifier else {
                return Err(OAuthError::invalid_grant("code_verifier is required"));
            };
            if !pkce::verify_with(verifier, &challenge.challenge, challenge.method) {
                tracing::warn!(client_id = %client_id, "PKCE verification failed");
                return Err(OAuthError::invalid_grant("PKCE verification failed"));
            }
        }

        self.issue_token_pair(client_id, &record.user_id, record.scopes).await
    }

    async fn refresh(
        &self,
        client_id: &str,
        refresh_token: &str,
        scope: Option<ScopeSet>,
    ) -> OAuthResult<TokenResponse> {
        // Rotation: the presented token is dead from this point on.
        let Some(old) = self.bounded(self.store.refresh_tokens().take(refresh_token)).await? else {
            tracing::debug!(client_id = %client_id, "Unknown or already used refresh token");
            return Err(OAuthError::invalid_grant("unknown or already used refresh token"));
        };

        // The sibling access token goes with it.
        self.bounded(self.store.access_tokens().delete(&old.access_token)).await?;

        if old.is_expired() {
            return Err(OAuthError::invalid_grant("refresh token expired"));
        }
        if old.client_id != client_id {
            tracing::warn!(
                client_id = %client_id,
                issued_to = %old.client_id,
                "Refresh token presented by another client"
            );
            return Err(OAuthError::invalid_grant("refresh token was issued to another client"));
        }

        let scopes = match scope {
            Some(narrowed) if narrowed.is_subset(&old.scopes) => narrowed,
            Some(_) => {
                return Err(OAuthError::InvalidScope(
                    "requested scope exceeds the original grant".to_string(),
                ));
            }
            None => old.scopes,
        };

        self.issue_token_pair(client_id, &old.user_id, scopes).await
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> OAuthResult<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OAuthError::invalid_request(format!("{name} is required")))
}
