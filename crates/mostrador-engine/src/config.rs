//! # Billing Configuration
//!
//! Store identity and the payment-method price list.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MOSTRADOR_STORE_NAME="Repuestos La Uruca"                          │
//! │     MOSTRADOR_TERMINAL_ID=caja-2                                       │
//! │     MOSTRADOR_CARD_BPS=10500                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/mostrador/billing.toml (Linux)                           │
//! │     ~/Library/Application Support/cr.mostrador.mostrador/billing.toml  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     card ×1.05, every other method ×1.00                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # billing.toml
//! [store]
//! name = "Repuestos La Uruca"
//! terminal_id = "caja-2"
//! currency = "CRC"
//!
//! [pricing]
//! cash_bps = 10000
//! card_bps = 10500
//! transfer_bps = 10000
//! sinpe_mobile_bps = 10000
//! ```
//!
//! The 13% tax rate, the 1 cent split tolerance and the 30-day proforma
//! validity are not configurable.

use mostrador_core::pricing::MultiplierTable;
use mostrador_core::{PaymentMethod, PriceMultiplier};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Store Configuration
// =============================================================================

/// Who is issuing the documents. Printed on receipts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Human-readable store name.
    #[serde(default = "default_store_name")]
    pub name: String,

    /// Counter or cash register identifier.
    #[serde(default = "default_terminal_id")]
    pub terminal_id: String,

    /// ISO currency code (display only; amounts are always cents).
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_store_name() -> String {
    "Mostrador".to_string()
}

fn default_terminal_id() -> String {
    "counter-1".to_string()
}

fn default_currency() -> String {
    "CRC".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            name: default_store_name(),
            terminal_id: default_terminal_id(),
            currency: default_currency(),
        }
    }
}

// =============================================================================
// Pricing Settings
// =============================================================================

/// Payment-method multipliers in basis points (10000 = ×1.00).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSettings {
    #[serde(default = "default_neutral_bps")]
    pub cash_bps: u32,

    #[serde(default = "default_card_bps")]
    pub card_bps: u32,

    #[serde(default = "default_neutral_bps")]
    pub transfer_bps: u32,

    #[serde(default = "default_neutral_bps")]
    pub sinpe_mobile_bps: u32,
}

fn default_neutral_bps() -> u32 {
    PriceMultiplier::IDENTITY.bps()
}

fn default_card_bps() -> u32 {
    10_500
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            cash_bps: default_neutral_bps(),
            card_bps: default_card_bps(),
            transfer_bps: default_neutral_bps(),
            sinpe_mobile_bps: default_neutral_bps(),
        }
    }
}

impl PricingSettings {
    fn bps_for(&self, method: PaymentMethod) -> u32 {
        match method {
            PaymentMethod::Cash => self.cash_bps,
            PaymentMethod::Card => self.card_bps,
            PaymentMethod::Transfer => self.transfer_bps,
            PaymentMethod::SinpeMobile => self.sinpe_mobile_bps,
        }
    }

    /// The multiplier table the pricing calculator uses.
    pub fn multiplier_table(&self) -> MultiplierTable {
        MultiplierTable {
            cash: PriceMultiplier::from_bps(self.cash_bps),
            card: PriceMultiplier::from_bps(self.card_bps),
            transfer: PriceMultiplier::from_bps(self.transfer_bps),
            sinpe_mobile: PriceMultiplier::from_bps(self.sinpe_mobile_bps),
        }
    }
}

// =============================================================================
// Main Engine Configuration
// =============================================================================

/// Complete billing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub pricing: PricingSettings,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (billing.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading billing config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load billing config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> EngineResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| EngineError::InvalidConfig("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Billing config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.store.terminal_id.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "terminal_id must not be empty".into(),
            ));
        }

        for method in PaymentMethod::ALL {
            if self.pricing.bps_for(method) == 0 {
                return Err(EngineError::InvalidConfig(format!(
                    "multiplier for {} must be greater than 0",
                    method.label()
                )));
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(name) = std::env::var("MOSTRADOR_STORE_NAME") {
            self.store.name = name;
        }

        if let Ok(id) = std::env::var("MOSTRADOR_TERMINAL_ID") {
            debug!(terminal_id = %id, "Overriding terminal ID from environment");
            self.store.terminal_id = id;
        }

        for (var, slot) in [
            ("MOSTRADOR_CASH_BPS", &mut self.pricing.cash_bps),
            ("MOSTRADOR_CARD_BPS", &mut self.pricing.card_bps),
            ("MOSTRADOR_TRANSFER_BPS", &mut self.pricing.transfer_bps),
            ("MOSTRADOR_SINPE_MOBILE_BPS", &mut self.pricing.sinpe_mobile_bps),
        ] {
            if let Ok(raw) = std::env::var(var) {
                match raw.parse::<u32>() {
                    Ok(bps) => {
                        debug!(var, bps, "Overriding multiplier from environment");
                        *slot = bps;
                    }
                    Err(_) => warn!(var, value = %raw, "Ignoring non-numeric multiplier"),
                }
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("cr", "mostrador", "mostrador")
            .map(|dirs| dirs.config_dir().join("billing.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn store_name(&self) -> &str {
        &self.store.name
    }

    pub fn terminal_id(&self) -> &str {
        &self.store.terminal_id
    }

    pub fn multiplier_table(&self) -> MultiplierTable {
        self.pricing.multiplier_table()
    }
}
