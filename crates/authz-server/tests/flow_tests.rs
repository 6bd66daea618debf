//! Authorization code and refresh flows against the core API.

use std::time::Duration;

use authz_server::endpoints::{AuthorizeError, AuthorizeRequest, TokenRequest, TokenResponse};
use authz_server::models::Client;
use authz_server::{
    AuthorizationServer, ClientRegistry, Config, CredentialStore, OAuthError, TokenError, pkce,
};

fn server_with(config: Config) -> AuthorizationServer {
    let registry = ClientRegistry::with_clients([
        Client::new("c1", "s1", ["https://a/cb"], ["read", "write"]).with_name("Client One"),
        Client::new("c2", "s2", ["https://b/cb"], ["read"]),
    ])
    .unwrap();
    AuthorizationServer::new(config, registry, CredentialStore::in_memory())
}

fn server() -> AuthorizationServer {
    server_with(Config::for_testing())
}

fn authorize_request(scope: &str) -> AuthorizeRequest {
    AuthorizeRequest {
        response_type: Some("code".into()),
        client_id: Some("c1".into()),
        redirect_uri: Some("https://a/cb".into()),
        scope: Some(scope.into()),
        state: Some("st".into()),
        user_id: Some("alice".into()),
        ..AuthorizeRequest::default()
    }
}

fn exchange(code: &str) -> TokenRequest {
    TokenRequest {
        grant_type: Some("authorization_code".into()),
        code: Some(code.into()),
        redirect_uri: Some("https://a/cb".into()),
        client_id: Some("c1".into()),
        client_secret: Some("s1".into()),
        ..TokenRequest::default()
    }
}

fn refresh(token: &str) -> TokenRequest {
    TokenRequest {
        grant_type: Some("refresh_token".into()),
        refresh_token: Some(token.into()),
        client_id: Some("c1".into()),
        client_secret: Some("s1".into()),
        ..TokenRequest::default()
    }
}

async fn tokens(server: &AuthorizationServer, scope: &str) -> TokenResponse {
    let code = server.authorize(authorize_request(scope)).await.unwrap().code;
    server.token(exchange(&code)).await.unwrap()
}

#[tokio::test]
async fn test_end_to_end() {
    let server = server();

    let authorized = server.authorize(authorize_request("read")).await.unwrap();
    assert_eq!(authorized.state.as_deref(), Some("st"));
    assert!(authorized.location().starts_with("https://a/cb?code="));

    let issued = server.token(exchange(&authorized.code)).await.unwrap();
    assert_eq!(issued.scope, "read");

    let grant = server.validate(&issued.access_token).await.unwrap();
    assert_eq!(grant.client_id, "c1");
    assert_eq!(grant.user_id, "alice");

    let replay = server.token(exchange(&authorized.code)).await.unwrap_err();
    assert_eq!(replay.error_code(), "invalid_grant");
    assert_eq!(replay.status(), axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rotation_chain() {
    let server = server();
    let mut current = tokens(&server, "read write").await;
    let mut seen = vec![current.refresh_token.clone()];

    for _ in 0..5 {
        let next = server.token(refresh(&current.refresh_token)).await.unwrap();
        assert!(!seen.contains(&next.refresh_token));
        seen.push(next.refresh_token.clone());
        current = next;
    }

    // Every earlier refresh token is dead.
    for old in &seen[..seen.len() - 1] {
        let err = server.token(refresh(old)).await.unwrap_err();
        assert_eq!(err.error_code(), "invalid_grant");
    }
    assert!(server.token(refresh(&current.refresh_token)).await.is_ok());
}

#[tokio::test]
async fn test_redirect_uri_binding() {
    let server = server();
    let code = server.authorize(authorize_request("read")).await.unwrap().code;

    let request = TokenRequest { redirect_uri: Some("https://a/cb/".into()), ..exchange(&code) };
    let err = server.token(request).await.unwrap_err();
    assert_eq!(err.error_code(), "invalid_grant");
}

#[tokio::test]
async fn test_scope_containment_stores_nothing() {
    let server = server();
    let err = server.authorize(authorize_request("read admin")).await.unwrap_err();

    assert!(matches!(err, AuthorizeError::Redirect { .. }));
    assert_eq!(err.error().error_code(), "invalid_scope");
    assert_eq!(server.store().codes().len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_empty_scope_grants_allowed_set() {
    let server = server();
    let issued = tokens(&server, "").await;
    assert_eq!(issued.scope, "read write");
}

#[tokio::test]
async fn test_pkce_round_trip() {
    let server = server();
    let verifier = "M25iVXpKU3puUjFaYWg3T1NDTDQtcW1ROUY5YXlwalNoc0hhakxifmZHag";
    let challenge = pkce::s256_challenge(verifier);

    let with_pkce = |server: &AuthorizationServer| {
        let server = server.clone();
        let challenge = challenge.clone();
        async move {
            server
                .authorize(AuthorizeRequest {
                    code_challenge: Some(challenge),
                    code_challenge_method: Some("S256".into()),
                    ..authorize_request("read")
                })
                .await
                .unwrap()
                .code
        }
    };

    let code = with_pkce(&server).await;
    let ok = TokenRequest { code_verifier: Some(verifier.into()), ..exchange(&code) };
    assert!(server.token(ok).await.is_ok());

    let code = with_pkce(&server).await;
    let missing = exchange(&code);
    assert_eq!(server.token(missing).await.unwrap_err().error_code(), "invalid_grant");

    let code = with_pkce(&server).await;
    let mut wrong_verifier = verifier.to_string();
    wrong_verifier.pop();
    wrong_verifier.push('x');
    let wrong = TokenRequest { code_verifier: Some(wrong_verifier), ..exchange(&code) };
    assert_eq!(server.token(wrong).await.unwrap_err().error_code(), "invalid_grant");
}

#[tokio::test]
async fn test_code_expiry() {
    let server =
        server_with(Config { auth_code_ttl: Duration::from_millis(1), ..Config::for_testing() });
    let code = server.authorize(authorize_request("read")).await.unwrap().code;

    tokio::time::sleep(Duration::from_millis(10)).await;

    let err = server.token(exchange(&code)).await.unwrap_err();
    assert_eq!(err.error_code(), "invalid_grant");
}

#[tokio::test]
async fn test_revoke_then_validate() {
    let server = server();
    let issued = tokens(&server, "read").await;

    assert!(server.revoke_any(&issued.access_token, Some("access_token")).await.unwrap());
    assert_eq!(server.validate(&issued.access_token).await, Err(TokenError::TokenNotFound));

    // The refresh token still works after its access token is revoked.
    assert!(server.token(refresh(&issued.refresh_token)).await.is_ok());
}

#[tokio::test]
async fn test_purge_leaves_live_credentials() {
    let server = server_with(Config {
        access_token_ttl: Duration::from_millis(1),
        ..Config::for_testing()
    });
    let issued = tokens(&server, "read").await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    let stats = server.store().purge_expired().await.unwrap();
    assert_eq!(stats.access_tokens, 1);
    assert_eq!(stats.refresh_tokens, 0);
    assert!(server.token(refresh(&issued.refresh_token)).await.is_ok());
}

#[tokio::test]
async fn test_errors_convert_to_server_error() {
    let err: OAuthError = authz_server::StoreError::Timeout(Duration::from_secs(2)).into();
    assert_eq!(err.error_code(), "server_error");
    assert!(err.is_retryable());
    assert!(!err.description().contains("timed out"));
}
