//! Per-authority identity client registry.
//!
//! Each distinct `authority/audience` pair gets exactly one identity client,
//! created on first use and shared by every later request. Entries are never
//! removed; the registry lives as long as whoever owns it, typically the
//! [`Authenticator`](crate::Authenticator) for the whole process.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::AuthenticatorConfig;
use crate::error::AuthError;
use crate::identity::{IdentityClient, IdentityClientFactory};

/// Registry key for an authority and audience.
#[must_use]
pub fn registry_key(authority: &str, audience: &str) -> String {
    format!("{authority}/{audience}")
}

/// Lazily populated map from `authority/audience` to identity client.
pub struct AuthorityRegistry {
    factory: Arc<dyn IdentityClientFactory>,
    clients: RwLock<HashMap<String, Arc<dyn IdentityClient>>>,
}

impl AuthorityRegistry {
    /// Create an empty registry that builds clients with `factory`.
    pub fn new(factory: Arc<dyn IdentityClientFactory>) -> Self {
        Self {
            factory,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Get the client for an authority, constructing it on first use.
    ///
    /// Construction happens under the write lock after a second lookup, so
    /// racing callers for the same absent key build a single client and all
    /// observe it. A construction failure leaves the key absent.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the factory rejects the
    /// authority or application identity.
    pub fn get_or_create(
        &self,
        authority: &str,
        audience: &str,
        identity: &AuthenticatorConfig,
    ) -> Result<Arc<dyn IdentityClient>, AuthError> {
        let key = registry_key(authority, audience);

        if let Some(client) = self.clients.read().get(&key) {
            tracing::trace!(key = %key, "identity client registry hit");
            return Ok(Arc::clone(client));
        }

        let mut clients = self.clients.write();
        if let Some(client) = clients.get(&key) {
            return Ok(Arc::clone(client));
        }

        let options = identity.client_options(authority, audience);
        let client = self.factory.create(&options).map_err(|e| {
            tracing::warn!(key = %key, error = %e, "identity client construction failed");
            AuthError::Configuration(format!("cannot create identity client for {key}: {e}"))
        })?;

        tracing::info!(key = %key, client_id = %identity.client_id, "created identity client");
        clients.insert(key, Arc::clone(&client));
        Ok(client)
    }

    /// Look up an existing client without constructing one.
    #[must_use]
    pub fn get(&self, authority: &str, audience: &str) -> Option<Arc<dyn IdentityClient>> {
        self.clients
            .read()
            .get(&registry_key(authority, audience))
            .map(Arc::clone)
    }

    /// Number of clients created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    /// Check if no client has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }
}

impl fmt::Debug for AuthorityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clients = self.clients.read();
        let mut keys: Vec<&String> = clients.keys().collect();
        keys.sort();
        f.debug_struct("AuthorityRegistry")
            .field("keys", &keys)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::identity::{Account, ClientOptions, IdentityError, SilentOutcome, TokenResponse};

    const AUTHORITY: &str = "https://login.microsoftonline.com";

    struct NullClient;

    #[async_trait]
    impl IdentityClient for NullClient {
        async fn accounts(&self) -> Result<Vec<Account>, IdentityError> {
            Ok(Vec::new())
        }

        async fn acquire_token_silent(&self, _: &[String], _: &Account) -> SilentOutcome {
            SilentOutcome::InteractionRequired {
                reason: "no cache".into(),
            }
        }

        async fn acquire_token_interactive(
            &self,
            _: &[String],
            _: Option<&str>,
        ) -> Result<TokenResponse, IdentityError> {
            Err(IdentityError::new("not available"))
        }
    }

    fn counting_registry() -> (AuthorityRegistry, Arc<AtomicUsize>) {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let factory = move |options: &ClientOptions| {
            if !options.authority.starts_with("https://") {
                return Err(IdentityError::new("authority must use https"));
            }
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(NullClient) as Arc<dyn IdentityClient>)
        };
        (AuthorityRegistry::new(Arc::new(factory)), created)
    }

    #[test]
    fn test_same_key_returns_same_client() {
        let (registry, created) = counting_registry();
        let identity = AuthenticatorConfig::default();

        let a = registry
            .get_or_create("https://login.microsoftonline.com", "common", &identity)
            .unwrap();
        let b = registry
            .get_or_create("https://login.microsoftonline.com", "common", &identity)
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_different_keys_get_different_clients() {
        let (registry, created) = counting_registry();
        let identity = AuthenticatorConfig::default();

        let common = registry
            .get_or_create("https://login.microsoftonline.com", "common", &identity)
            .unwrap();
        let tenant = registry
            .get_or_create("https://login.microsoftonline.com", "contoso", &identity)
            .unwrap();

        assert!(!Arc::ptr_eq(&common, &tenant));
        assert_eq!(created.load(Ordering::SeqCst), 2);
        assert!(registry.get(AUTHORITY, "contoso").is_some());
        assert!(registry.get(AUTHORITY, "fabrikam").is_none());
    }

    #[test]
    fn test_construction_failure_is_configuration_error() {
        let (registry, _) = counting_registry();
        let identity = AuthenticatorConfig::default();
        let err = registry
            .get_or_create("login.microsoftonline.com", "common", &identity)
            .err()
            .unwrap();

        let AuthError::Configuration(msg) = err else {
            panic!("expected configuration error, got {err:?}");
        };
        assert!(msg.contains("login.microsoftonline.com/common"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_key_concatenation() {
        assert_eq!(
            registry_key("https://login.microsoftonline.com", "common"),
            "https://login.microsoftonline.com/common"
        );
    }
}
