//! Data models for clients, credentials and scopes.
//!
//! Codes and tokens reference their client by id and carry copies of the
//! user and scopes; nothing here holds a back-reference into the stores.

mod client;
mod credentials;
mod scope;

pub use client::Client;
pub use credentials::{
    AccessToken, AuthorizationCode, CodeChallengeMethod, Expiring, PkceChallenge, RefreshToken,
    TokenKind,
};
pub use scope::ScopeSet;
