//! Credential storage boundary.
//!
//! The connection manager is the only consumer: it reads the stored token
//! right before opening a socket and fails fast when none is present. How
//! the token got there (login flow, keyring, env) is the app shell's
//! business.

use std::sync::Arc;

/// A bearer credential issued by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Opaque access token, attached to the socket URL as a query parameter.
    pub access_token: String,
    /// Token scheme, `"bearer"` in practice.
    pub token_type: String,
}

impl Credential {
    /// Create a bearer credential.
    #[must_use]
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "bearer".to_string(),
        }
    }
}

/// Storage for the current session credential.
pub trait CredentialProvider: Send + Sync {
    /// The stored credential, if any.
    fn get(&self) -> Option<Credential>;

    /// Replace the stored credential.
    fn set(&self, credential: Credential);

    /// Drop the stored credential (logout, token rejection).
    fn clear(&self);
}

/// In-memory credential store, lives for the session.
#[derive(Default)]
pub struct MemoryCredentials {
    slot: parking_lot::Mutex<Option<Credential>>,
}

impl MemoryCredentials {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `credential`.
    #[must_use]
    pub fn with(credential: Credential) -> Arc<Self> {
        let store = Self::new();
        store.set(credential);
        Arc::new(store)
    }
}

impl CredentialProvider for MemoryCredentials {
    fn get(&self) -> Option<Credential> {
        self.slot.lock().clone()
    }

    fn set(&self, credential: Credential) {
        *self.slot.lock() = Some(credential);
    }

    fn clear(&self) {
        *self.slot.lock() = None;
    }
}
