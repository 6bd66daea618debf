//! Registered OAuth clients.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::scope::ScopeSet;

/// A registered confidential client.
///
/// Immutable once registered. The secret is never serialized and never
/// appears in `Debug` output.
#[derive(Clone, Serialize, Deserialize)]
pub struct Client {
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub redirect_uris: BTreeSet<String>,
    #[serde(default)]
    pub allowed_scopes: ScopeSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
}

impl Client {
    /// Build a client from its id, secret, redirect URIs and allowed scopes.
    pub fn new<U, S>(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uris: impl IntoIterator<Item = U>,
        allowed_scopes: impl IntoIterator<Item = S>,
    ) -> Self
    where
        U: Into<String>,
        S: Into<String>,
    {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uris: redirect_uris.into_iter().map(Into::into).collect(),
            allowed_scopes: allowed_scopes.into_iter().collect(),
            client_name: None,
        }
    }

    /// Attach a display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    /// Exact string match against the registered redirect URIs.
    #[must_use]
    pub fn has_redirect_uri(&self, redirect_uri: &str) -> bool {
        self.redirect_uris.contains(redirect_uri)
    }

    /// Returns true if every requested scope is allowed for this client.
    #[must_use]
    pub fn allows(&self, requested: &ScopeSet) -> bool {
        requested.is_subset(&self.allowed_scopes)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("client_id", &self.client_id)
            .field("client_name", &self.client_name)
            .field("redirect_uris", &self.redirect_uris)
            .field("allowed_scopes", &self.allowed_scopes)
            .finish_non_exhaustive()
    }
}
