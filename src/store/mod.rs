//! Persisted state: credential, style examples and alert history.
//!
//! All three stores sit on one [`KeyValueStore`] under independent keys
//! (`credential`, `style_examples`, `alert_history`).  They assume a single
//! writer (the pipeline) and hold no locks of their own.

pub mod credential;
pub mod history;
pub mod kv;
pub mod style;

pub use credential::{Credential, CredentialError, CredentialStore, DEFAULT_MIN_CREDENTIAL_LEN};
pub use history::{AlertRecord, HistoryStore, DEFAULT_HISTORY_CAPACITY};
pub use kv::{FileStore, KeyValueStore, MemoryStore, SharedStore, StoreError};
pub use style::{SharedSource, StyleError, StyleSnapshot, StyleStore};
