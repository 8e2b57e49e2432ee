//! Credential store — the opaque API key, kept in durable storage.
//!
//! Absence is a normal state; the pipeline only asks for a key when a
//! generation attempt needs one.  Nothing here contacts the service, so a
//! stored key is only proven wrong by a live request.

use std::fmt;

use thiserror::Error;

use super::kv::{SharedStore, StoreError};

/// Storage key of the credential record.
pub const CREDENTIAL_KEY: &str = "credential";

/// Keys of five characters or fewer are rejected.
pub const DEFAULT_MIN_CREDENTIAL_LEN: usize = 6;

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// An API key.  `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw secret, for the request header only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// A short hint safe to show on screen (`"AIza…"`).
    pub fn masked(&self) -> String {
        let head: String = self.0.chars().take(4).collect();
        format!("{head}…")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

// ---------------------------------------------------------------------------
// CredentialError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CredentialError {
    /// The supplied value is empty or implausibly short.
    #[error("invalid API key: it must be at least {min} characters long")]
    TooShort { min: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// CredentialStore
// ---------------------------------------------------------------------------

pub struct CredentialStore {
    kv: SharedStore,
    min_len: usize,
}

impl CredentialStore {
    pub fn new(kv: SharedStore) -> Self {
        Self::with_min_len(kv, DEFAULT_MIN_CREDENTIAL_LEN)
    }

    pub fn with_min_len(kv: SharedStore, min_len: usize) -> Self {
        Self { kv, min_len }
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// The stored credential, if any.
    ///
    /// A storage read failure is logged and reported as absent, which sends
    /// the operator to the credential prompt instead of failing the request.
    pub fn get(&self) -> Option<Credential> {
        match self.kv.get(CREDENTIAL_KEY) {
            Ok(Some(value)) => {
                let value = value.trim();
                (!value.is_empty()).then(|| Credential::new(value))
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("credential: cannot read stored key ({e}); treating as absent");
                None
            }
        }
    }

    /// Validate and persist a new credential.
    ///
    /// Surrounding whitespace is trimmed.  Values shorter than
    /// [`min_len`](Self::min_len) are rejected and nothing is written.
    pub fn set(&self, value: &str) -> Result<Credential, CredentialError> {
        let value = value.trim();
        if value.chars().count() < self.min_len {
            return Err(CredentialError::TooShort { min: self.min_len });
        }

        self.kv.set(CREDENTIAL_KEY, value)?;
        log::info!("credential: stored new API key");
        Ok(Credential::new(value))
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.kv.remove(CREDENTIAL_KEY)?;
        log::info!("credential: cleared");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
