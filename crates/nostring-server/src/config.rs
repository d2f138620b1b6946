//! Server configuration — parsed from TOML file + environment variable overrides.
//!
//! Priority: environment variable > config file > defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// General server settings
    #[serde(default)]
    pub server: ServerSection,

    /// The single Nostr identity this daemon runs as
    pub identity: IdentitySection,

    /// Relay pool settings
    #[serde(default)]
    pub relays: RelaySection,

    /// P2P signaling settings
    #[serde(default)]
    pub p2p: P2pSection,

    /// Image cache settings
    #[serde(default)]
    pub cache: CacheSection,

    /// Release-manifest signing settings (optional: only needed by the
    /// release tooling, not the live daemon loop)
    pub manifest: Option<ManifestSection>,
}

/// General server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Data directory (SQLite DBs, image cache, seed/secret index files
    /// where the OS keychain itself falls back to file-backed storage)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { data_dir: default_data_dir(), log_level: default_log_level() }
    }
}

/// The identity this daemon runs as.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySection {
    /// Identity id used to key the seed/secret store refs
    /// (`"nostr-seed:{id}"`, `"nostr-secret:{id}"`).
    pub id: String,

    /// A BIP-39 mnemonic to derive from. If absent, a fresh mnemonic is
    /// generated on first run and the derived seed is persisted -- every
    /// later run reuses the persisted seed instead of re-reading this field.
    pub mnemonic: Option<String>,

    /// BIP-39 passphrase (the "25th word"); empty by default.
    #[serde(default)]
    pub passphrase: String,

    /// NIP-06 account index (`m/44'/1237'/{account_index}'/0/0`).
    #[serde(default)]
    pub account_index: i64,
}

/// Relay pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySection {
    /// Relay URLs to maintain connections to.
    #[serde(default = "default_relay_urls")]
    pub urls: Vec<String>,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self { urls: default_relay_urls() }
    }
}

/// P2P signaling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct P2pSection {
    /// Whether the signaling coordinator is enabled at all. When `false`,
    /// outbound attempts report `Unavailable` and inbound signals are
    /// dropped silently (spec §4.5 gating).
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for P2pSection {
    fn default() -> Self {
        Self { enabled: default_true() }
    }
}

/// Image cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSection {
    /// Maximum total bytes the disk cache may occupy.
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size_bytes: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self { max_cache_size_bytes: default_max_cache_size() }
    }
}

/// Release-manifest signing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestSection {
    /// Path to a PEM-encoded RSA private key used by the release tooling to
    /// sign distribution manifests. The daemon itself only checks that the
    /// file exists; actual signing happens out-of-band via `nostring-manifest`.
    pub signing_key_path: PathBuf,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("nostring")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_relay_urls() -> Vec<String> {
    vec!["wss://relay.damus.io".into(), "wss://relay.nostr.band".into(), "wss://nos.lol".into()]
}

fn default_true() -> bool {
    true
}

fn default_max_cache_size() -> u64 {
    256 * 1024 * 1024 // 256 MiB
}

// ============================================================================
// Loading & environment override
// ============================================================================

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: ServerConfig = toml::from_str(&contents).with_context(|| "Failed to parse TOML config")?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `NOSTRING_DATA_DIR` — spec §6's data-directory override: if set and
    ///   non-empty, replaces the OS-default user-data path for all storage.
    /// - `NOSTRING_LOG_LEVEL`
    /// - `NOSTRING_P2P_ENABLED`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("NOSTRING_DATA_DIR") {
            if !v.is_empty() {
                self.server.data_dir = PathBuf::from(v);
            }
        }
        if let Ok(v) = std::env::var("NOSTRING_LOG_LEVEL") {
            self.server.log_level = v;
        }
        if let Ok(v) = std::env::var("NOSTRING_P2P_ENABLED") {
            if let Ok(enabled) = v.parse::<bool>() {
                self.p2p.enabled = enabled;
            }
        }
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.identity.id.is_empty(), "identity.id must not be empty");
        anyhow::ensure!(!self.relays.urls.is_empty(), "relays.urls must not be empty");
        anyhow::ensure!(self.cache.max_cache_size_bytes > 0, "cache.max_cache_size_bytes must be > 0");
        if let Some(mnemonic) = &self.identity.mnemonic {
            anyhow::ensure!(!mnemonic.trim().is_empty(), "identity.mnemonic must not be blank if set");
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
