//! Environment-based Configuration for zBridge
//!
//! Protocol parameters and service settings are loaded from environment
//! variables (a `.env` file is honored). Every value has a default suitable
//! for regtest; mainnet deployments are checked by
//! [`BridgeSettings::validate_for_production`].
//!
//! # Environment Variables
//!
//! ## Backing chain
//! - `ZBRIDGE_NETWORK` - "mainnet", "testnet" or "regtest" (default: "regtest")
//! - `ZBRIDGE_MIN_CONFIRMATIONS` - confirmations before a block is usable (default: 6)
//! - `ZBRIDGE_MERKLE_DEPTH` - note commitment tree depth (default: 32)
//!
//! ## Protocol timing (seconds)
//! - `ZBRIDGE_PERMIT_TTL` - lock permit lifetime (default: 3600)
//! - `ZBRIDGE_CONFIRMATION_WINDOW` - vault response window after a mint (default: 86400)
//! - `ZBRIDGE_RELEASE_WINDOW` - vault release window after a burn (default: 86400)
//!
//! ## Economics
//! - `ZBRIDGE_REQUESTER_WARRANTY` - deposit per lock request (default: 1000)
//! - `ZBRIDGE_VAULT_WARRANTY` - vault collateral at stake per issue (default: 1000)
//! - `ZBRIDGE_FEE_BPS` - issue/redeem fee in basis points (default: 10)
//! - `ZBRIDGE_COLLATERAL_RATIO` - "numerator/denominator" (default: "150/100")
//!
//! ## Service
//! - `ZBRIDGE_DATABASE_PATH` - SQLite file (default: "zbridge.db")
//! - `ZBRIDGE_WATCHER_INTERVAL` - timeout watcher period in seconds (default: 30)
//! - `ZBRIDGE_LOG_LEVEL` - trace, debug, info, warn, error (default: "info")

use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::bridge::BridgeConfig;
use crate::crypto::hash::{
    Personalization, HEADER_MAINNET_PERSONALIZATION, HEADER_REGTEST_PERSONALIZATION,
    HEADER_TESTNET_PERSONALIZATION,
};
use crate::crypto::merkle::TREE_DEPTH;
use crate::relay::RelayConfig;
use crate::service::ServiceConfig;
use crate::vault::VaultConfig;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("network mismatch: expected {0}, got {1}")]
    NetworkMismatch(String, String),

    #[error("inconsistent configuration: {0}")]
    Inconsistent(String),
}

/// Backing-chain network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            "regtest" | "reg" => Ok(Network::Regtest),
            _ => Err(ConfigError::InvalidValue(
                "ZBRIDGE_NETWORK".to_string(),
                format!("unknown network: {}", s),
            )),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        };
        write!(f, "{}", s)
    }
}

impl Network {
    /// Personalization used when hashing block headers
    pub fn header_personalization(&self) -> &'static Personalization {
        match self {
            Network::Mainnet => HEADER_MAINNET_PERSONALIZATION,
            Network::Testnet => HEADER_TESTNET_PERSONALIZATION,
            Network::Regtest => HEADER_REGTEST_PERSONALIZATION,
        }
    }
}

/// All settings, flat, as loaded from the environment
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub network: Network,
    pub min_confirmations: u64,
    pub merkle_depth: usize,

    pub permit_ttl_secs: u64,
    pub confirmation_window_secs: u64,
    pub release_window_secs: u64,

    pub requester_warranty: u128,
    pub vault_warranty: u128,
    pub fee_bps: u64,
    pub collateral_ratio_num: u128,
    pub collateral_ratio_den: u128,

    pub database_path: String,
    pub watcher_interval_secs: u64,
    pub log_level: String,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            network: Network::Regtest,
            min_confirmations: 6,
            merkle_depth: TREE_DEPTH,
            permit_ttl_secs: 3600,
            confirmation_window_secs: 86_400,
            release_window_secs: 86_400,
            requester_warranty: 1_000,
            vault_warranty: 1_000,
            fee_bps: 10,
            collateral_ratio_num: 150,
            collateral_ratio_den: 100,
            database_path: "zbridge.db".to_string(),
            watcher_interval_secs: 30,
            log_level: "info".to_string(),
        }
    }
}

impl BridgeSettings {
    /// Load settings from the environment (and `.env` if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        let network: Network = env::var("ZBRIDGE_NETWORK")
            .unwrap_or_else(|_| "regtest".to_string())
            .parse()?;

        let (collateral_ratio_num, collateral_ratio_den) = match env::var("ZBRIDGE_COLLATERAL_RATIO") {
            Ok(raw) => parse_ratio(&raw)?,
            Err(_) => (defaults.collateral_ratio_num, defaults.collateral_ratio_den),
        };

        let settings = Self {
            network,
            min_confirmations: parse_or("ZBRIDGE_MIN_CONFIRMATIONS", defaults.min_confirmations)?,
            merkle_depth: parse_or("ZBRIDGE_MERKLE_DEPTH", defaults.merkle_depth)?,
            permit_ttl_secs: parse_or("ZBRIDGE_PERMIT_TTL", defaults.permit_ttl_secs)?,
            confirmation_window_secs: parse_or(
                "ZBRIDGE_CONFIRMATION_WINDOW",
                defaults.confirmation_window_secs,
            )?,
            release_window_secs: parse_or("ZBRIDGE_RELEASE_WINDOW", defaults.release_window_secs)?,
            requester_warranty: parse_or("ZBRIDGE_REQUESTER_WARRANTY", defaults.requester_warranty)?,
            vault_warranty: parse_or("ZBRIDGE_VAULT_WARRANTY", defaults.vault_warranty)?,
            fee_bps: parse_or("ZBRIDGE_FEE_BPS", defaults.fee_bps)?,
            collateral_ratio_num,
            collateral_ratio_den,
            database_path: env::var("ZBRIDGE_DATABASE_PATH").unwrap_or(defaults.database_path),
            watcher_interval_secs: parse_or(
                "ZBRIDGE_WATCHER_INTERVAL",
                defaults.watcher_interval_secs,
            )?,
            log_level: env::var("ZBRIDGE_LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the protocol cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collateral_ratio_den == 0 {
            return Err(ConfigError::Inconsistent(
                "collateral ratio denominator is zero".to_string(),
            ));
        }
        if self.collateral_ratio_num < self.collateral_ratio_den {
            return Err(ConfigError::Inconsistent(
                "collateral ratio below 100%".to_string(),
            ));
        }
        if self.fee_bps >= 10_000 {
            return Err(ConfigError::InvalidValue(
                "ZBRIDGE_FEE_BPS".to_string(),
                "must be below 10000".to_string(),
            ));
        }
        if self.merkle_depth == 0 || self.merkle_depth > 64 {
            return Err(ConfigError::InvalidValue(
                "ZBRIDGE_MERKLE_DEPTH".to_string(),
                "must be between 1 and 64".to_string(),
            ));
        }
        if self.permit_ttl_secs == 0 || self.confirmation_window_secs == 0 || self.release_window_secs == 0 {
            return Err(ConfigError::Inconsistent(
                "protocol windows must be non-zero".to_string(),
            ));
        }
        if self.watcher_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "ZBRIDGE_WATCHER_INTERVAL".to_string(),
                "must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Stricter checks for a mainnet deployment
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if self.network != Network::Mainnet {
            return Err(ConfigError::NetworkMismatch(
                "mainnet".to_string(),
                self.network.to_string(),
            ));
        }
        if self.min_confirmations < 6 {
            return Err(ConfigError::InvalidValue(
                "ZBRIDGE_MIN_CONFIRMATIONS".to_string(),
                "mainnet needs at least 6".to_string(),
            ));
        }
        if self.requester_warranty == 0 || self.vault_warranty == 0 {
            return Err(ConfigError::Inconsistent(
                "warranties must be non-zero on mainnet".to_string(),
            ));
        }
        Ok(())
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            network: self.network,
            min_confirmations: self.min_confirmations,
            merkle_depth: self.merkle_depth,
        }
    }

    pub fn vault_config(&self) -> VaultConfig {
        VaultConfig {
            collateral_ratio_num: self.collateral_ratio_num,
            collateral_ratio_den: self.collateral_ratio_den,
        }
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            permit_ttl_secs: self.permit_ttl_secs,
            confirmation_window_secs: self.confirmation_window_secs,
            release_window_secs: self.release_window_secs,
            requester_warranty: self.requester_warranty,
            vault_warranty: self.vault_warranty,
            fee_bps: self.fee_bps,
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            watcher_interval_secs: self.watcher_interval_secs,
        }
    }

    pub fn print_summary(&self) {
        println!("=== zBridge Configuration ===");
        println!("Network: {}", self.network);
        println!("Min Confirmations: {}", self.min_confirmations);
        println!("Merkle Depth: {}", self.merkle_depth);
        println!("Permit TTL: {}s", self.permit_ttl_secs);
        println!("Confirmation Window: {}s", self.confirmation_window_secs);
        println!("Release Window: {}s", self.release_window_secs);
        println!(
            "Warranties: requester {}, vault {}",
            self.requester_warranty, self.vault_warranty
        );
        println!("Fee: {} bps", self.fee_bps);
        println!(
            "Collateral Ratio: {}/{}",
            self.collateral_ratio_num, self.collateral_ratio_den
        );
        println!("Database: {}", self.database_path);
        println!("Watcher Interval: {}s", self.watcher_interval_secs);
        println!("Log Level: {}", self.log_level);
        println!("=============================");
    }
}

fn parse_or<T: FromStr>(var_name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(var_name) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            ConfigError::InvalidValue(var_name.to_string(), format!("cannot parse '{}'", raw))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_ratio(raw: &str) -> Result<(u128, u128), ConfigError> {
    let invalid = || {
        ConfigError::InvalidValue(
            "ZBRIDGE_COLLATERAL_RATIO".to_string(),
            format!("expected 'num/den', got '{}'", raw),
        )
    };
    let (num, den) = raw.split_once('/').ok_or_else(invalid)?;
    let num = num.trim().parse().map_err(|_| invalid())?;
    let den = den.trim().parse().map_err(|_| invalid())?;
    Ok((num, den))
}
