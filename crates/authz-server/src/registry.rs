//! Registry of OAuth clients.
//!
//! The client table sits behind the [`ClientStore`] trait so a backend can be
//! injected. The default [`MemoryClientStore`] is a sharded concurrent map:
//! lookups on different clients never contend, and registration of a given
//! id is an atomic insert-if-absent.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::crypto::constant_time_eq;
use crate::error::RegistryError;
use crate::models::Client;

/// Compared against when the client id is unknown, so both failure modes
/// cost the same.
const DUMMY_SECRET: &[u8] = b"00000000000000000000000000000000";

/// Backing table for [`ClientRegistry`].
pub trait ClientStore: Send + Sync {
    /// Insert a client. Fails with `DuplicateClient` if the id is taken.
    fn insert(&self, client: Client) -> Result<(), RegistryError>;

    /// Look up a client by id.
    fn get(&self, client_id: &str) -> Option<Arc<Client>>;

    /// Number of stored clients.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory client table.
#[derive(Default)]
pub struct MemoryClientStore {
    clients: DashMap<String, Arc<Client>>,
}

impl ClientStore for MemoryClientStore {
    fn insert(&self, client: Client) -> Result<(), RegistryError> {
        match self.clients.entry(client.client_id.clone()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateClient(client.client_id)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(client));
                Ok(())
            }
        }
    }

    fn get(&self, client_id: &str) -> Option<Arc<Client>> {
        self.clients.get(client_id).map(|entry| Arc::clone(entry.value()))
    }

    fn len(&self) -> usize {
        self.clients.len()
    }
}

/// Registered OAuth clients.
#[derive(Clone)]
pub struct ClientRegistry {
    store: Arc<dyn ClientStore>,
}

impl ClientRegistry {
    /// Empty registry over a [`MemoryClientStore`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryClientStore::default()))
    }

    /// Registry over an injected client table.
    #[must_use]
    pub fn with_store(store: Arc<dyn ClientStore>) -> Self {
        Self { store }
    }

    /// Build a registry from an initial set of clients.
    pub fn with_clients(clients: impl IntoIterator<Item = Client>) -> Result<Self, RegistryError> {
        let registry = Self::new();
        for client in clients {
            registry.register(client)?;
        }
        Ok(registry)
    }

    /// Register a client.
    ///
    /// Fails with `InvalidClient` if the id, secret or redirect URI set is
    /// empty or a redirect URI is not an absolute URI without fragment, and
    /// with `DuplicateClient` if the id is taken.
    pub fn register(&self, client: Client) -> Result<(), RegistryError> {
        validate(&client)?;

        let client_id = client.client_id.clone();
        self.store.insert(client)?;
        tracing::info!(client_id = %client_id, "Registered OAuth client");
        Ok(())
    }

    /// Look up a client by id.
    #[must_use]
    pub fn lookup(&self, client_id: &str) -> Option<Arc<Client>> {
        self.store.get(client_id)
    }

    /// Check a supplied secret in constant time.
    ///
    /// Unknown ids still run a comparison so response timing does not reveal
    /// which ids exist.
    #[must_use]
    pub fn validate_secret(&self, client_id: &str, supplied_secret: &str) -> bool {
        match self.lookup(client_id) {
            Some(client) => {
                constant_time_eq(client.client_secret.as_bytes(), supplied_secret.as_bytes())
            }
            None => {
                let _ = constant_time_eq(DUMMY_SECRET, supplied_secret.as_bytes());
                false
            }
        }
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns true if no client is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry").field("clients", &self.store.len()).finish()
    }
}

fn validate(client: &Client) -> Result<(), RegistryError> {
    if client.client_id.is_empty() {
        return Err(RegistryError::InvalidClient("client_id is required".to_string()));
    }
    if client.client_secret.is_empty() {
        return Err(RegistryError::InvalidClient("client_secret is required".to_string()));
    }
    if client.redirect_uris.is_empty() {
        return Err(RegistryError::InvalidClient("redirect_uris is required".to_string()));
    }
    for uri in &client.redirect_uris {
        let parsed = url::Url::parse(uri).map_err(|e| {
            RegistryError::InvalidClient(format!("redirect_uri '{uri}' is not absolute: {e}"))
        })?;
        if parsed.fragment().is_some() {
            return Err(RegistryError::InvalidClient(format!(
                "redirect_uri '{uri}' must not contain a fragment"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: &str) -> Client {
        Client::new(id, "s1", ["https://a/cb"], ["read"])
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ClientRegistry::new();
        registry.register(client("c1")).unwrap();

        let found = registry.lookup("c1").unwrap();
        assert_eq!(found.client_id, "c1");
        assert!(registry.lookup("c2").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let registry = ClientRegistry::new();
        registry.register(client("c1")).unwrap();
        assert_eq!(
            registry.register(client("c1")),
            Err(RegistryError::DuplicateClient("c1".to_string()))
        );
    }

    #[test]
    fn test_incomplete_clients_rejected() {
        let registry = ClientRegistry::new();
        assert!(matches!(
            registry.register(Client::new("", "s", ["https://a/cb"], ["read"])),
            Err(RegistryError::InvalidClient(_))
        ));
        assert!(matches!(
            registry.register(Client::new("c", "", ["https://a/cb"], ["read"])),
            Err(RegistryError::InvalidClient(_))
        ));
        assert!(matches!(
            registry.register(Client::new("c", "s", Vec::<String>::new(), ["read"])),
            Err(RegistryError::InvalidClient(_))
        ));
        assert!(matches!(
            registry.register(Client::new("c", "s", ["/relative/cb"], ["read"])),
            Err(RegistryError::InvalidClient(_))
        ));
        assert!(matches!(
            registry.register(Client::new("c", "s", ["https://a/cb#frag"], ["read"])),
            Err(RegistryError::InvalidClient(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_validate_secret() {
        let registry = ClientRegistry::with_clients([client("c1")]).unwrap();
        assert!(registry.validate_secret("c1", "s1"));
        assert!(!registry.validate_secret("c1", "s2"));
        assert!(!registry.validate_secret("c1", ""));
        assert!(!registry.validate_secret("unknown", "s1"));
    }

    #[test]
    fn test_concurrent_registration_single_winner() {
        let registry = ClientRegistry::new();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.register(client("race")).is_ok())
            })
            .collect();
        let wins = handles.into_iter().map(|h| h.join().unwrap()).filter(|won| *won).count();
        assert_eq!(wins, 1);
        assert_eq!(registry.len(), 1);
    }

    /// A fixed table that refuses new registrations.
    struct ReadOnlyStore(Vec<Arc<Client>>);

    impl ClientStore for ReadOnlyStore {
        fn insert(&self, client: Client) -> Result<(), RegistryError> {
            Err(RegistryError::InvalidClient(format!("{} cannot be added", client.client_id)))
        }

        fn get(&self, client_id: &str) -> Option<Arc<Client>> {
            self.0.iter().find(|c| c.client_id == client_id).cloned()
        }

        fn len(&self) -> usize {
            self.0.len()
        }
    }

    #[test]
    fn test_injected_store() {
        let fixed = ReadOnlyStore(vec![Arc::new(client("fixed"))]);
        let registry = ClientRegistry::with_store(Arc::new(fixed));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("fixed").unwrap().client_id, "fixed");
        assert!(registry.validate_secret("fixed", "s1"));
        assert!(!registry.validate_secret("fixed", "s2"));
        assert!(matches!(registry.register(client("c1")), Err(RegistryError::InvalidClient(_))));
        assert!(registry.lookup("c1").is_none());
    }
}
