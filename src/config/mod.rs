//! Site configuration, read from a TOML file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Settings for the snapshot widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Recipient of the prefilled demo request.
    pub contact_recipient: String,
    /// Subject of the prefilled demo request.
    pub contact_subject: String,
    /// Quiet window before a burst of input changes triggers a recompute.
    pub debounce_ms: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            contact_recipient: "info@your-domain.com".to_string(),
            contact_subject: "Solicitud de demo - Snapshot".to_string(),
            debounce_ms: 220,
        }
    }
}

impl SnapshotConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the demo request recipient.
    #[must_use]
    pub fn with_contact_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.contact_recipient = recipient.into();
        self
    }

    /// Sets the debounce window in milliseconds.
    #[must_use]
    pub const fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// The debounce window as a [`Duration`].
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Where the local key-value store lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage file; the user data directory is used when unset.
    pub path: Option<PathBuf>,
}

/// Analytics tag settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Whether events are written to the log.
    pub enabled: bool,
    /// Measurement ID passed to the tag on start-up.
    pub measurement_id: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            measurement_id: "GA_MEASUREMENT_ID".to_string(),
        }
    }
}

/// Newsletter form settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscribeConfig {
    /// Form `action` URL the subscription is posted to.
    pub action: Option<String>,
}

/// Share button and CTA labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Appended to the page heading to form the shared text.
    pub title_suffix: String,
    /// Label reported for CTA clicks.
    pub cta_label: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            title_suffix: " — Automatización Inteligente".to_string(),
            cta_label: "Ver lo que pueden hacer".to_string(),
        }
    }
}

/// Offline cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Name of the current cache; any other cache is dropped on activation.
    pub name: String,
    /// Paths precached on install.
    pub assets: Vec<String>,
    /// Origin asset paths are resolved against for network fetches.
    pub origin: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "site-cache-v1".to_string(),
            assets: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/assets/og-image.svg".to_string(),
                "/manifest.json".to_string(),
                "/js/main.js".to_string(),
            ],
            origin: None,
        }
    }
}

/// Complete site configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub snapshot: SnapshotConfig,
    pub storage: StorageConfig,
    pub analytics: AnalyticsConfig,
    pub subscribe: SubscribeConfig,
    pub share: ShareConfig,
    pub cache: CacheConfig,
}

impl SiteConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("leadsite")
            .join("config.toml")
    }

    /// Loads configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or holds invalid values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`, writing a default template first if
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be written or the file cannot be parsed.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("Writing default config to {}", path.display());
            Self::default().save(path)?;
        }
        Self::load(path)
    }

    /// Writes the configuration to `path` as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Storage file, falling back to the user data directory.
    #[must_use]
    pub fn storage_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(crate::storage::FileStore::default_path)
    }

    /// Checks values that would break the page at run time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        if self.cache.name.trim().is_empty() {
            return Err(Error::Config("cache.name must not be empty".to_string()));
        }
        if self.snapshot.contact_recipient.trim().is_empty() {
            return Err(Error::Config(
                "snapshot.contact_recipient must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
