//! # Service Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     QRDESK_QR_PREFIX=NBL                                               │
//! │     QRDESK_ENFORCE_KYC=false                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $QRDESK_CONFIG, else                                               │
//! │     ~/.config/qrdesk/qrdesk.toml (Linux)                               │
//! │     ~/Library/Application Support/com.qrdesk.qrdesk/qrdesk.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [qr]
//! prefix = "BNK"
//! max_generation_batch = 10000
//!
//! [workflow]
//! max_request_quantity = 5000
//! enforce_kyc_on_issue = true
//!
//! [dashboard]
//! top_n = 5
//!
//! [store]
//! seed_demo_data = true
//! snapshot_path = "./qrdesk_dev.json"
//! ```

use std::path::PathBuf;

use qrdesk_core::DEFAULT_TOP_N;
use qrdesk_store::StoreConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Sections
// =============================================================================

/// QR generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrSettings {
    /// Prefix of generated QR values (`{prefix}-S-20240101-000001`).
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Most codes one generate call may create.
    #[serde(default = "default_max_generation_batch")]
    pub max_generation_batch: u32,
}

fn default_prefix() -> String {
    "BNK".to_string()
}

fn default_max_generation_batch() -> u32 {
    10_000
}

impl Default for QrSettings {
    fn default() -> Self {
        QrSettings {
            prefix: default_prefix(),
            max_generation_batch: default_max_generation_batch(),
        }
    }
}

/// Approval workflow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// Largest quantity a request or pool allocation may ask for.
    #[serde(default = "default_max_request_quantity")]
    pub max_request_quantity: u32,

    /// Refuse issuing QR codes to merchants whose KYC is not verified.
    #[serde(default = "default_true")]
    pub enforce_kyc_on_issue: bool,
}

fn default_max_request_quantity() -> u32 {
    5_000
}

fn default_true() -> bool {
    true
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        WorkflowSettings {
            max_request_quantity: default_max_request_quantity(),
            enforce_kyc_on_issue: true,
        }
    }
}

/// Dashboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSettings {
    /// Entries in each top-N ranking.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

impl Default for DashboardSettings {
    fn default() -> Self {
        DashboardSettings {
            top_n: default_top_n(),
        }
    }
}

/// Store startup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_true")]
    pub seed_demo_data: bool,

    /// JSON snapshot written by the `seed` binary.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            seed_demo_data: true,
            snapshot_path: None,
        }
    }
}

// =============================================================================
// Service Configuration
// =============================================================================

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub qr: QrSettings,

    #[serde(default)]
    pub workflow: WorkflowSettings,

    #[serde(default)]
    pub dashboard: DashboardSettings,

    #[serde(default)]
    pub store: StoreSettings,
}

impl ServiceConfig {
    /// Loads configuration: defaults, then the TOML file, then `QRDESK_*`
    /// environment variables, then validation.
    ///
    /// `config_path` wins over `QRDESK_CONFIG`, which wins over the
    /// platform config directory. A missing file is not an error.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var_os("QRDESK_CONFIG").map(PathBuf::from))
            .or_else(Self::default_config_path);

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads configuration, falling back to defaults on any error.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "qrdesk", "qrdesk")
            .map(|dirs| dirs.config_dir().join("qrdesk.toml"))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(prefix) = std::env::var("QRDESK_QR_PREFIX") {
            debug!(prefix = %prefix, "Overriding QR prefix from environment");
            self.qr.prefix = prefix;
        }

        if let Ok(max) = std::env::var("QRDESK_MAX_GENERATION_BATCH") {
            if let Ok(n) = max.parse::<u32>() {
                self.qr.max_generation_batch = n;
            }
        }

        if let Ok(max) = std::env::var("QRDESK_MAX_REQUEST_QUANTITY") {
            if let Ok(n) = max.parse::<u32>() {
                self.workflow.max_request_quantity = n;
            }
        }

        if let Ok(flag) = std::env::var("QRDESK_ENFORCE_KYC") {
            match parse_bool(&flag) {
                Some(enforce) => {
                    debug!(enforce, "Overriding KYC enforcement from environment");
                    self.workflow.enforce_kyc_on_issue = enforce;
                }
                None => warn!(value = %flag, "Unknown QRDESK_ENFORCE_KYC value"),
            }
        }

        if let Ok(top_n) = std::env::var("QRDESK_TOP_N") {
            if let Ok(n) = top_n.parse::<usize>() {
                self.dashboard.top_n = n;
            }
        }

        if let Ok(flag) = std::env::var("QRDESK_SEED_DEMO_DATA") {
            if let Some(seed) = parse_bool(&flag) {
                self.store.seed_demo_data = seed;
            }
        }

        if let Ok(path) = std::env::var("QRDESK_SNAPSHOT_PATH") {
            self.store.snapshot_path = Some(PathBuf::from(path));
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let prefix = self.qr.prefix.trim();
        if prefix.is_empty() || prefix.len() > 10 || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::Invalid(format!(
                "qr.prefix must be 1-10 ASCII letters or digits, got: '{}'",
                self.qr.prefix
            )));
        }

        if self.qr.max_generation_batch == 0 {
            return Err(ConfigError::Invalid(
                "qr.max_generation_batch must be greater than 0".into(),
            ));
        }

        if self.workflow.max_request_quantity == 0 {
            return Err(ConfigError::Invalid(
                "workflow.max_request_quantity must be greater than 0".into(),
            ));
        }

        if self.dashboard.top_n == 0 {
            return Err(ConfigError::Invalid(
                "dashboard.top_n must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Store settings in the store crate's builder form.
    pub fn to_store_config(&self) -> StoreConfig {
        let config = StoreConfig::default()
            .seed_demo_data(self.store.seed_demo_data)
            .qr_prefix(self.qr.prefix.clone());

        match &self.store.snapshot_path {
            Some(path) => config.snapshot_path(path.clone()),
            None => config,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
