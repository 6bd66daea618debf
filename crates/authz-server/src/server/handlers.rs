//! OAuth 2.0 endpoint handlers.
//!
//! Implements:
//! - RFC 6749 §4.1: Authorization Code Grant (`/authorize`, `/token`)
//! - RFC 6749 §6: Refreshing an Access Token (`/token`)
//! - RFC 7009: Token Revocation (`/revoke`)
//! - RFC 8414: Authorization Server Metadata

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{
        Query, State,
        rejection::{FormRejection, QueryRejection},
    },
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Basic};
use serde::Deserialize;

use super::transport::HttpState;
use crate::endpoints::{AuthorizeError, AuthorizeRequest, ClientCredentials, TokenRequest};
use crate::error::{OAuthError, OAuthResult};

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        if let Self::ServerError(detail) = &self {
            tracing::error!(error = %detail, "Request failed with server error");
        }

        let mut response = (self.status(), Json(self.to_response_body())).into_response();
        let headers = response.headers_mut();
        no_store(headers);
        if matches!(self, Self::InvalidClient(_)) {
            headers.insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"authz-server\""),
            );
        }
        response
    }
}

fn no_store(headers: &mut HeaderMap) {
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
}

// ─── RFC 8414: Authorization Server Metadata ─────────────────────────────────

/// `GET /.well-known/oauth-authorization-server`
pub async fn handle_auth_server_metadata(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let config = state.server.config();
    Json(serde_json::json!({
        "issuer": config.issuer,
        "authorization_endpoint": config.endpoint_url("/authorize"),
        "token_endpoint": config.endpoint_url("/token"),
        "revocation_endpoint": config.endpoint_url("/revoke"),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "token_endpoint_auth_methods_supported": ["client_secret_post", "client_secret_basic"],
        "revocation_endpoint_auth_methods_supported": ["client_secret_post", "client_secret_basic"],
        "code_challenge_methods_supported": ["S256", "plain"]
    }))
}

// ─── Authorization Endpoint ──────────────────────────────────────────────────

/// `GET /authorize`
///
/// The resource owner must already be authenticated by a fronting login
/// component, which passes the user id in the configured header.
pub async fn handle_authorize(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    query: Result<Query<AuthorizeRequest>, QueryRejection>,
) -> Response {
    let mut request = match query {
        Ok(Query(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Malformed authorization request");
            return direct_authorize_error(OAuthError::invalid_request(
                "malformed authorization request",
            ));
        }
    };

    request.user_id = headers
        .get(state.server.config().user_header.as_str())
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|user| !user.is_empty())
        .map(str::to_owned);

    match state.server.authorize(request).await {
        Ok(response) => redirect(response.location()),
        Err(AuthorizeError::Direct(error)) => direct_authorize_error(error),
        Err(error) => match error.location() {
            Some(location) => redirect(location),
            None => direct_authorize_error(error.error().clone()),
        },
    }
}

/// Errors answered to the user agent itself are always 400 unless the
/// server failed; there is no client authentication on this endpoint.
fn direct_authorize_error(error: OAuthError) -> Response {
    let status = match error.status() {
        StatusCode::INTERNAL_SERVER_ERROR => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    let mut response = error.into_response();
    *response.status_mut() = status;
    response.headers_mut().remove(header::WWW_AUTHENTICATE);
    response
}

fn redirect(location: String) -> Response {
    match HeaderValue::try_from(location) {
        Ok(location) => {
            let mut response = StatusCode::FOUND.into_response();
            response.headers_mut().insert(header::LOCATION, location);
            no_store(response.headers_mut());
            response
        }
        Err(e) => {
            OAuthError::ServerError(format!("invalid redirect location: {e}")).into_response()
        }
    }
}

// ─── Token Endpoint ──────────────────────────────────────────────────────────

/// `POST /token`
///
/// Exchange an authorization code for tokens, or rotate a refresh token.
pub async fn handle_token(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Response {
    let Form(request) = match form {
        Ok(form) => form,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Malformed token request");
            return OAuthError::invalid_request("malformed token request").into_response();
        }
    };

    let credentials = match client_credentials(
        &headers,
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    ) {
        Ok(credentials) => credentials,
        Err(e) => return e.into_response(),
    };

    match state.server.token_with_credentials(credentials, &request).await {
        Ok(tokens) => {
            let mut response = Json(tokens).into_response();
            no_store(response.headers_mut());
            response
        }
        Err(e) => e.into_response(),
    }
}

// ─── RFC 7009: Token Revocation ──────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct RevokeRequest {
    pub token: Option<String>,
    pub token_type_hint: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// `POST /revoke`
///
/// Answers 200 for any token once the client is authenticated, including
/// unknown tokens and tokens issued to another client.
pub async fn handle_revoke(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    form: Result<Form<RevokeRequest>, FormRejection>,
) -> Response {
    let Form(request) = match form {
        Ok(form) => form,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Malformed revocation request");
            return OAuthError::invalid_request("malformed revocation request").into_response();
        }
    };

    match revoke(&state, &headers, &request).await {
        Ok(_) => {
            let mut response = StatusCode::OK.into_response();
            no_store(response.headers_mut());
            response
        }
        Err(e) => e.into_response(),
    }
}

async fn revoke(
    state: &HttpState,
    headers: &HeaderMap,
    request: &RevokeRequest,
) -> OAuthResult<bool> {
    let credentials = client_credentials(
        headers,
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    )?;
    let client_id = state.server.authenticate_client(credentials.as_ref())?;
    let token = request
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| OAuthError::invalid_request("token is required"))?;

    let revoked = state
        .server
        .revoke_for_client(&client_id, token, request.token_type_hint.as_deref())
        .await?;
    if revoked {
        tracing::info!(client_id = %client_id, "Revoked token");
    }
    Ok(revoked)
}

// ─── Client Authentication ───────────────────────────────────────────────────

/// Collect client credentials from `Authorization: Basic` or the form body.
///
/// A client must use one method only. A `client_id` in the body alongside
/// Basic credentials is tolerated when it names the same client.
fn client_credentials(
    headers: &HeaderMap,
    form_id: Option<&str>,
    form_secret: Option<&str>,
) -> OAuthResult<Option<ClientCredentials>> {
    let basic = headers.typed_try_get::<Authorization<Basic>>().map_err(|_| {
        tracing::debug!("Unusable Authorization header on client endpoint");
        OAuthError::invalid_client()
    })?;

    match basic {
        Some(basic) => {
            if form_secret.is_some() {
                return Err(OAuthError::invalid_request(
                    "multiple client authentication methods",
                ));
            }
            if form_id.is_some_and(|id| id != basic.username()) {
                return Err(OAuthError::invalid_request("client_id does not match credentials"));
            }
            Ok(Some(ClientCredentials::new(basic.username(), basic.password())))
        }
        None => Ok(match (form_id, form_secret) {
            (Some(id), Some(secret)) => Some(ClientCredentials::new(id, secret)),
            _ => None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(user: &str, pass: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.typed_insert(Authorization::basic(user, pass));
        headers
    }

    #[test]
    fn test_credentials_from_basic() {
        let creds = client_credentials(&basic("c1", "s1"), None, None).unwrap().unwrap();
        assert_eq!(creds, ClientCredentials::new("c1", "s1"));

        // Same id in the body is fine.
        assert!(client_credentials(&basic("c1", "s1"), Some("c1"), None).unwrap().is_some());
    }

    #[test]
    fn test_credentials_from_form() {
        let creds = client_credentials(&HeaderMap::new(), Some("c1"), Some("s1")).unwrap();
        assert_eq!(creds, Some(ClientCredentials::new("c1", "s1")));

        assert_eq!(client_credentials(&HeaderMap::new(), Some("c1"), None).unwrap(), None);
    }

    #[test]
    fn test_credentials_conflicts() {
        let err = client_credentials(&basic("c1", "s1"), Some("c2"), None).unwrap_err();
        assert_eq!(err.error_code(), "invalid_request");

        let err = client_credentials(&basic("c1", "s1"), Some("c1"), Some("s1")).unwrap_err();
        assert_eq!(err.error_code(), "invalid_request");
    }

    #[test]
    fn test_error_response_headers() {
        let response = OAuthError::invalid_client().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");

        let response = OAuthError::invalid_grant("used").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!response.headers().contains_key(header::WWW_AUTHENTICATE));
        assert_eq!(response.headers()[header::PRAGMA], "no-cache");
    }

    #[test]
    fn test_direct_authorize_error_is_400() {
        let response =
            direct_authorize_error(OAuthError::InvalidClient("unknown client_id".into()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!response.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}
