//! Bearer token guard for resource servers (RFC 6750).
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/me", get(me))
//!     .layer(axum::middleware::from_fn_with_state(server.clone(), bearer_auth));
//! ```
//!
//! Handlers behind the guard read the grant with `Extension<AccessToken>`.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::endpoints::AuthorizationServer;
use crate::error::{OAuthError, TokenError};

/// Reject requests without a live access token; attach the grant otherwise.
pub async fn bearer_auth(
    State(server): State<AuthorizationServer>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(bearer) = request.headers().typed_get::<Authorization<Bearer>>() else {
        return challenge("Bearer");
    };

    match server.validate(bearer.token()).await {
        Ok(grant) => {
            request.extensions_mut().insert(grant);
            next.run(request).await
        }
        Err(TokenError::Store(e)) => OAuthError::from(e).into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            challenge("Bearer error=\"invalid_token\"")
        }
    }
}

fn challenge(value: &'static str) -> Response {
    let mut response = StatusCode::UNAUTHORIZED.into_response();
    response.headers_mut().insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(value));
    response
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{Extension, Router, body::Body, routing::get};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::endpoints::{AuthorizeRequest, TokenRequest};
    use crate::models::{AccessToken, Client};
    use crate::registry::ClientRegistry;
    use crate::store::CredentialStore;

    fn server_with(config: Config) -> AuthorizationServer {
        let registry =
            ClientRegistry::with_clients([Client::new("c1", "s1", ["https://a/cb"], ["read"])])
                .unwrap();
        AuthorizationServer::new(config, registry, CredentialStore::in_memory())
    }

    async fn access_token(server: &AuthorizationServer) -> String {
        let code = server
            .authorize(AuthorizeRequest {
                response_type: Some("code".into()),
                client_id: Some("c1".into()),
                redirect_uri: Some("https://a/cb".into()),
                user_id: Some("alice".into()),
                ..AuthorizeRequest::default()
            })
            .await
            .unwrap()
            .code;
        server
            .token(TokenRequest {
                grant_type: Some("authorization_code".into()),
                code: Some(code),
                redirect_uri: Some("https://a/cb".into()),
                client_id: Some("c1".into()),
                client_secret: Some("s1".into()),
                ..TokenRequest::default()
            })
            .await
            .unwrap()
            .access_token
    }

    fn app(server: AuthorizationServer) -> Router {
        Router::new()
            .route(
                "/me",
                get(|Extension(grant): Extension<AccessToken>| async move { grant.user_id }),
            )
            .layer(axum::middleware::from_fn_with_state(server, bearer_auth))
    }

    fn request(token: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/me");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_passes() {
        let server = server_with(Config::for_testing());
        let token = access_token(&server).await;

        let response = app(server).oneshot(request(Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"alice");
    }

    #[tokio::test]
    async fn test_missing_token() {
        let server = server_with(Config::for_testing());
        let response = app(server).oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[tokio::test]
    async fn test_unknown_and_expired_tokens() {
        let server = server_with(Config {
            access_token_ttl: Duration::from_millis(1),
            ..Config::for_testing()
        });
        let token = access_token(&server).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        for token in [token.as_str(), "made-up"] {
            let response = app(server.clone()).oneshot(request(Some(token))).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(
                response.headers()[header::WWW_AUTHENTICATE],
                "Bearer error=\"invalid_token\""
            );
        }
    }
}
