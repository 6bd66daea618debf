//! Authorization endpoint (RFC 6749 §4.1.1, RFC 7636 §4.3).

use std::time::Instant;

use serde::Deserialize;

use super::AuthorizationServer;
use crate::crypto;
use crate::error::OAuthError;
use crate::models::{AuthorizationCode, Client, CodeChallengeMethod, PkceChallenge, ScopeSet};
use crate::pkce;

/// Parameters of an authorization request.
///
/// `user_id` is not a query parameter: it is filled in by whatever
/// authenticated the resource owner.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeRequest {
    pub response_type: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    #[serde(skip)]
    pub user_id: Option<String>,
}

/// A successful authorization: redirect the user agent back with a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeResponse {
    pub redirect_uri: String,
    pub code: String,
    pub state: Option<String>,
}

impl AuthorizeResponse {
    /// The `Location` to redirect to.
    #[must_use]
    pub fn location(&self) -> String {
        let mut params = vec![("code", self.code.as_str())];
        if let Some(state) = self.state.as_deref() {
            params.push(("state", state));
        }
        append_query(&self.redirect_uri, &params)
    }
}

/// A failed authorization request.
///
/// Errors detected before the redirect URI is known to belong to the client
/// are answered directly and never redirected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizeError {
    /// Respond to the user agent directly.
    Direct(OAuthError),
    /// Redirect back to the verified client redirect URI with error parameters.
    Redirect { redirect_uri: String, error: OAuthError, state: Option<String> },
}

impl AuthorizeError {
    #[must_use]
    pub const fn error(&self) -> &OAuthError {
        match self {
            Self::Direct(error) | Self::Redirect { error, .. } => error,
        }
    }

    /// The `Location` to redirect to, for redirect-style errors.
    #[must_use]
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Direct(_) => None,
            Self::Redirect { redirect_uri, error, state } => {
                let mut params =
                    vec![("error", error.error_code()), ("error_description", error.description())];
                if let Some(state) = state.as_deref() {
                    params.push(("state", state));
                }
                Some(append_query(redirect_uri, &params))
            }
        }
    }
}

impl AuthorizationServer {
    /// Validate an authorization request and issue a code.
    ///
    /// Checks run in a fixed order and the first failure wins. No code is
    /// stored unless every check passes.
    pub async fn authorize(
        &self,
        request: AuthorizeRequest,
    ) -> Result<AuthorizeResponse, AuthorizeError> {
        let AuthorizeRequest {
            response_type,
            client_id,
            redirect_uri,
            scope,
            state,
            code_challenge,
            code_challenge_method,
            user_id,
        } = request;

        if response_type.as_deref() != Some("code") {
            let error = OAuthError::UnsupportedResponseType(
                "response_type must be 'code'".to_string(),
            );
            // Only redirect when the target is already known to be safe.
            return Err(
                match self.trusted_redirect(client_id.as_deref(), redirect_uri.as_deref()) {
                    Some(redirect_uri) => AuthorizeError::Redirect { redirect_uri, error, state },
                    None => AuthorizeError::Direct(error),
                },
            );
        }

        let Some(client) = client_id.as_deref().and_then(|id| self.registry.lookup(id)) else {
            tracing::debug!(client_id = ?client_id, "Authorization request for unknown client");
            return Err(AuthorizeError::Direct(OAuthError::InvalidClient(
                "unknown client_id".to_string(),
            )));
        };

        let redirect_uri = match redirect_uri {
            Some(uri) if client.has_redirect_uri(&uri) => uri,
            Some(_) => {
                tracing::warn!(client_id = %client.client_id, "redirect_uri not registered");
                return Err(AuthorizeError::Direct(OAuthError::invalid_request(
                    "redirect_uri is not registered for this client",
                )));
            }
            None => {
                return Err(AuthorizeError::Direct(OAuthError::invalid_request(
                    "redirect_uri is required",
                )));
            }
        };

        // From here on errors go back to the client's verified redirect URI.
        let fail = |error: OAuthError| AuthorizeError::Redirect {
            redirect_uri: redirect_uri.clone(),
            error,
            state: state.clone(),
        };

        let scopes = requested_scopes(&client, scope.as_deref()).map_err(fail)?;
        let pkce = pkce_challenge(code_challenge, code_challenge_method.as_deref()).map_err(fail)?;

        let Some(user_id) = user_id.filter(|u| !u.is_empty()) else {
            return Err(fail(OAuthError::AccessDenied(
                "resource owner is not authenticated".to_string(),
            )));
        };

        let code = crypto::generate_code().map_err(|e| fail(e.into()))?;
        let record = AuthorizationCode {
            client_id: client.client_id.clone(),
            user_id,
            redirect_uri: redirect_uri.clone(),
            scopes,
            expires_at: Instant::now() + self.config.auth_code_ttl,
            pkce,
        };

        if let Err(e) = self.bounded(self.store.codes().put(code.clone(), record)).await {
            tracing::error!(client_id = %client.client_id, error = %e, "Failed to store code");
            return Err(fail(e.into()));
        }

        tracing::info!(client_id = %client.client_id, "Issued authorization code");

        Ok(AuthorizeResponse { redirect_uri, code, state })
    }

    /// The redirect URI, if it is registered for the given client.
    fn trusted_redirect(
        &self,
        client_id: Option<&str>,
        redirect_uri: Option<&str>,
    ) -> Option<String> {
        let client = self.registry.lookup(client_id?)?;
        let redirect_uri = redirect_uri?;
        client.has_redirect_uri(redirect_uri).then(|| redirect_uri.to_owned())
    }
}

/// Resolve the requested scope against the client's allowed set.
///
/// An absent or empty scope means the client's full allowed set.
fn requested_scopes(client: &Client, raw: Option<&str>) -> Result<ScopeSet, OAuthError> {
    let requested = raw.map(ScopeSet::parse).unwrap_or_default();
    if requested.is_empty() {
        return Ok(client.allowed_scopes.clone());
    }
    if !client.allows(&requested) {
        let rejected: Vec<&str> = requested.not_in(&client.allowed_scopes).collect();
        tracing::debug!(client_id = %client.client_id, rejected = ?rejected, "Scope not allowed");
        return Err(OAuthError::InvalidScope(format!(
            "scope not allowed for this client: {}",
            rejected.join(" ")
        )));
    }
    Ok(requested)
}

/// Validate the PKCE parameters, if any.
fn pkce_challenge(
    challenge: Option<String>,
    method: Option<&str>,
) -> Result<Option<PkceChallenge>, OAuthError> {
    let Some(challenge) = challenge.filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    let Some(method) = method.filter(|m| !m.is_empty()) else {
        return Err(OAuthError::invalid_request(
            "code_challenge_method is required with code_challenge",
        ));
    };
    let method: CodeChallengeMethod = method.parse().map_err(OAuthError::InvalidRequest)?;
    if !pkce::is_well_formed(&challenge) {
        return Err(OAuthError::invalid_request(
            "code_challenge must be 43-128 unreserved characters",
        ));
    }
    Ok(Some(PkceChallenge { challenge, method }))
}

/// Append form-encoded query parameters, keeping any query already present.
fn append_query(base: &str, params: &[(&str, &str)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in params {
        serializer.append_pair(name, value);
    }
    let query = serializer.finish();

    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{query}")
}
