//! OAuth 2.0 Authorization Server
//!
//! An embeddable authorization server core implementing the authorization
//! code grant (RFC 6749 §4.1) with optional PKCE (RFC 7636), the refresh
//! token grant with rotation (RFC 6749 §6), and token revocation (RFC 7009).
//!
//! # Features
//!
//! - **Single-use codes**: codes and refresh tokens are removed atomically on
//!   first read, so concurrent replays get `invalid_grant`
//! - **Injected stores**: credentials live behind [`store::CredentialNamespace`]
//!   and clients behind [`registry::ClientStore`], with sharded in-memory
//!   implementations
//! - **Constant-time secrets**: client secrets and PKCE challenges are compared
//!   with `subtle`
//! - **axum transport**: `/authorize`, `/token`, `/revoke` and RFC 8414 metadata
//!
//! # Example
//!
//! ```no_run
//! use authz_server::{AuthorizationServer, ClientRegistry, Config, CredentialStore};
//! use authz_server::models::Client;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = ClientRegistry::new();
//!     registry.register(Client::new("c1", "s1", ["https://a/cb"], ["read"]))?;
//!
//!     let config = Config::from_env()?;
//!     let server = AuthorizationServer::new(config, registry, CredentialStore::in_memory());
//!     authz_server::server::serve(server, 8000).await
//! }
//! ```

pub mod config;
pub mod crypto;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod pkce;
pub mod registry;
pub mod server;
pub mod store;

pub use config::Config;
pub use endpoints::AuthorizationServer;
pub use error::{OAuthError, RegistryError, StoreError, TokenError};
pub use registry::{ClientRegistry, ClientStore};
pub use store::CredentialStore;
