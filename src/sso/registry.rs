//! In-memory token verifier.
//!
//! Stands in for the SSO service's verification endpoint: raw tokens map to the
//! [`SsoToken`] they were issued for. The raw value is a ULID and is handled as a
//! secret everywhere except the map key.

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{collections::HashMap, fs, path::Path, sync::RwLock};
use tracing::{debug, warn};
use ulid::Ulid;

use super::{SsoToken, TokenVerifier};

#[derive(Default)]
pub struct TokenRegistry {
    tokens: RwLock<HashMap<String, SsoToken>>,
}

impl std::fmt::Debug for TokenRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRegistry")
            .field("tokens", &self.len())
            .finish()
    }
}

impl TokenRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry from a JSON object of `raw token -> token` entries.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read token file: {}", path.display()))?;
        let tokens: HashMap<String, SsoToken> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid token file: {}", path.display()))?;
        debug!("loaded {} SSO tokens", tokens.len());
        Ok(Self {
            tokens: RwLock::new(tokens),
        })
    }

    /// Issue a fresh raw token for `token`.
    pub fn issue(&self, token: SsoToken) -> SecretString {
        let raw = Ulid::new().to_string();
        self.insert(&raw, token);
        SecretString::from(raw)
    }

    pub fn insert(&self, raw: &str, token: SsoToken) {
        match self.tokens.write() {
            Ok(mut tokens) => {
                tokens.insert(raw.to_string(), token);
            }
            Err(_) => warn!("token registry lock poisoned; token not stored"),
        }
    }

    /// Revoke a raw token. Returns whether it was known.
    pub fn revoke(&self, raw: &SecretString) -> bool {
        self.tokens
            .write()
            .map(|mut tokens| tokens.remove(raw.expose_secret()).is_some())
            .unwrap_or(false)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.read().map_or(0, |tokens| tokens.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TokenVerifier for TokenRegistry {
    fn verify(&self, raw: &SecretString) -> Option<SsoToken> {
        let tokens = self.tokens.read().ok()?;
        tokens.get(raw.expose_secret()).cloned()
    }
}
