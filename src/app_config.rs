//! Application configuration from file and environment variables
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables (prefixed with ASHCAN_)
//! 2. Config file (config.toml)
//! 3. Default values
//!
//! Secrets like the poster-ID secret and S3 keys should be kept in
//! environment variables, not in the config file.

use crate::constants::{
    DEFAULT_AUDIT_RETENTION_DAYS, DEFAULT_BUMP_LIMIT, DEFAULT_JANITOR_INTERVAL_SECONDS,
    DEFAULT_MAX_ACTIVE_THREADS, DEFAULT_ORPHAN_GRACE_SECONDS, DEFAULT_RETENTION_DAYS,
};
use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Global application configuration
pub static APP_CONFIG: Lazy<RwLock<AppConfig>> = Lazy::new(|| {
    RwLock::new(AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config file, using defaults: {}", e);
        AppConfig::default()
    }))
});

/// Site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
    /// Secret mixed into poster-ID derivation
    /// (should be in env var ASHCAN_SITE_SECRET)
    #[serde(default)]
    pub secret: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Ashcan".to_string(),
            base_url: "http://localhost:8080".to_string(),
            secret: String::new(),
        }
    }
}

/// Content lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Replies after which a thread stops bumping (0 = unlimited)
    pub bump_limit: i32,
    /// Alive non-sticky threads a board may hold
    pub max_active_threads: i32,
    /// Days a retired thread is kept before the reaper destroys it
    pub retention_days: i64,
    /// Seconds a fresh unreferenced blob is spared by the reconciler
    pub orphan_grace_seconds: i64,
    /// Days audit-log entries are retained
    pub audit_retention_days: i64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            bump_limit: DEFAULT_BUMP_LIMIT,
            max_active_threads: DEFAULT_MAX_ACTIVE_THREADS,
            retention_days: DEFAULT_RETENTION_DAYS,
            orphan_grace_seconds: DEFAULT_ORPHAN_GRACE_SECONDS,
            audit_retention_days: DEFAULT_AUDIT_RETENTION_DAYS,
        }
    }
}

/// Janitor (periodic task) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JanitorConfig {
    /// Seconds between runs
    pub interval_seconds: u64,
    /// Disable to run the janitor externally (e.g. from a cron binary)
    pub enabled: bool,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_JANITOR_INTERVAL_SECONDS,
            enabled: true,
        }
    }
}

/// Moderation configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ModerationConfig {
    /// Shared key required by moderation endpoints
    /// (should be in env var ASHCAN_MODERATION_MOD_KEY)
    #[serde(default)]
    pub mod_key: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend: "local" or "s3"
    pub backend: String,
    /// Local storage path (used when backend = "local")
    pub local_path: String,
    /// S3 endpoint URL (used when backend = "s3")
    pub s3_endpoint: String,
    /// S3 region (used when backend = "s3")
    pub s3_region: String,
    /// S3 bucket name (used when backend = "s3")
    pub s3_bucket: String,
    /// S3 public URL for serving files (used when backend = "s3")
    pub s3_public_url: String,
    /// S3 access key (should be in env var ASHCAN_STORAGE_S3_ACCESS_KEY)
    #[serde(default)]
    pub s3_access_key: String,
    /// S3 secret key (should be in env var ASHCAN_STORAGE_S3_SECRET_KEY)
    #[serde(default)]
    pub s3_secret_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "local".to_string(),
            local_path: "./uploads".to_string(),
            s3_endpoint: "http://localhost:9000".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_bucket: "ashcan".to_string(),
            s3_public_url: "http://localhost:9000/ashcan".to_string(),
            s3_access_key: String::new(),
            s3_secret_key: String::new(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub lifecycle: LifecycleConfig,
    pub janitor: JanitorConfig,
    pub moderation: ModerationConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &str) -> Result<Self, ConfigError> {
        use config::FileFormat;

        let config = Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file (optional)
            .add_source(File::new(path, FileFormat::Toml).required(false))
            // Override with environment variables (ASHCAN_ prefix)
            // e.g., ASHCAN_LIFECYCLE_BUMP_LIMIT, ASHCAN_STORAGE_BACKEND
            .add_source(
                Environment::with_prefix("ASHCAN")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reload configuration from file
    pub fn reload() -> Result<(), ConfigError> {
        let new_config = Self::load()?;
        if let Ok(mut config) = APP_CONFIG.write() {
            *config = new_config;
            log::info!("Configuration reloaded");
        }
        Ok(())
    }
}

/// Initialize application configuration
///
/// This triggers the lazy loading of the config file and logs the result.
/// Should be called early in application startup.
pub fn init() {
    let config = APP_CONFIG.read().unwrap();
    log::info!("Configuration loaded: site.name = {}", config.site.name);
}

// Convenience functions for accessing global config

/// Get the current application configuration
pub fn get_config() -> AppConfig {
    APP_CONFIG.read().map(|c| c.clone()).unwrap_or_default()
}

/// Get site configuration
pub fn site() -> SiteConfig {
    get_config().site
}

/// Get lifecycle configuration
pub fn lifecycle() -> LifecycleConfig {
    get_config().lifecycle
}

/// Get janitor configuration
pub fn janitor() -> JanitorConfig {
    get_config().janitor
}

/// Get moderation configuration
pub fn moderation() -> ModerationConfig {
    get_config().moderation
}

/// Get storage configuration
pub fn storage() -> StorageConfig {
    get_config().storage
}
