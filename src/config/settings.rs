//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files.  Every section is
//! `#[serde(default)]`, so a hand-edited `settings.toml` only needs the keys
//! it wants to override.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// GenerationConfig
// ---------------------------------------------------------------------------

/// Settings for the external generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Base URL of the Generative Language API.
    pub base_url: String,
    /// Model identifier used in `models/{model}:streamGenerateContent`.
    pub model: String,
    /// Upper bound for a whole request, stream included.
    pub timeout_secs: u64,
    /// Sampling temperature; `None` leaves the service default in place.
    pub temperature: Option<f32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            model: "gemini-3-flash-preview".into(),
            timeout_secs: 300,
            temperature: None,
        }
    }
}

// ---------------------------------------------------------------------------
// StyleSettings
// ---------------------------------------------------------------------------

/// Where the shared style-examples document lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSettings {
    /// `http(s)://` URL or local path of the shared JSON document.  `None`
    /// means only the locally cached style text is used.
    pub shared_source: Option<String>,
}

// ---------------------------------------------------------------------------
// LimitsConfig
// ---------------------------------------------------------------------------

/// Local preconditions checked before any network activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted audio payload in bytes.
    pub max_payload_bytes: u64,
    /// Number of alerts kept in the history.
    pub history_capacity: usize,
    /// Shortest credential accepted by the credential store.
    pub min_credential_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: crate::audio::MAX_PAYLOAD_BYTES,
            history_capacity: crate::store::DEFAULT_HISTORY_CAPACITY,
            min_credential_len: crate::store::DEFAULT_MIN_CREDENTIAL_LEN,
        }
    }
}

// ---------------------------------------------------------------------------
// ProgressConfig
// ---------------------------------------------------------------------------

/// Simulated progress indicator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Milliseconds between two progress ticks.
    pub tick_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { tick_ms: 200 }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use press_alert::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Write it back out
/// let path = std::env::temp_dir().join("settings.toml");
/// config.save_to(&path).unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Language used for the date embedded in the prompt (`"es"`, `"en"`).
    pub locale: String,
    /// External generation service settings.
    pub generation: GenerationConfig,
    /// Shared style document location.
    pub style: StyleSettings,
    /// Size and length limits.
    pub limits: LimitsConfig,
    /// Progress indicator settings.
    pub progress: ProgressConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            locale: "es".into(),
            generation: GenerationConfig::default(),
            style: StyleSettings::default(),
            limits: LimitsConfig::default(),
            progress: ProgressConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
