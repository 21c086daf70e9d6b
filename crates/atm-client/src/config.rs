use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use chain_eth::address::validate_address;

use crate::conversion::{RateEntry, RateTable};
use crate::error::ClientError;

/// Address of the deployed ATM contract (first deployment on a local
/// Hardhat node).
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

/// Gas limit attached to every deposit and withdraw.
pub const DEFAULT_GAS_LIMIT: u64 = 100_000;

pub const DEFAULT_RECEIPT_POLL_MS: u64 = 1_000;

pub const DEFAULT_CURRENCY: &str = "ETH";

/// Index of the account used when the provider reports several; the rest
/// are ignored.
pub const SELECTED_ACCOUNT_INDEX: usize = 0;

/// Static conversion table shipped with the client.
pub fn default_rates() -> Vec<RateEntry> {
    vec![
        RateEntry::new("ETH", "1"),
        RateEntry::new("SOL", "100"),
        RateEntry::new("BTC", "0.01"),
        RateEntry::new("MATIC", "1000"),
        RateEntry::new("AVAX", "400"),
        RateEntry::new("ADA", "200"),
        RateEntry::new("DOT", "50"),
    ]
}

/// Client configuration. Every field has a default, so `{}` is a valid
/// configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AtmConfig {
    pub contract_address: String,
    /// Compiled contract artifact; the built-in interface is used when unset.
    pub artifact_path: Option<PathBuf>,
    pub gas_limit: u64,
    /// Upper bound on the confirmation wait; `None` waits indefinitely.
    pub confirmation_timeout_secs: Option<u64>,
    pub receipt_poll_interval_ms: u64,
    pub default_currency: String,
    pub rates: Vec<RateEntry>,
}

impl Default for AtmConfig {
    fn default() -> Self {
        Self {
            contract_address: DEFAULT_CONTRACT_ADDRESS.into(),
            artifact_path: None,
            gas_limit: DEFAULT_GAS_LIMIT,
            confirmation_timeout_secs: None,
            receipt_poll_interval_ms: DEFAULT_RECEIPT_POLL_MS,
            default_currency: DEFAULT_CURRENCY.into(),
            rates: default_rates(),
        }
    }
}

impl AtmConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ClientError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_json_str(&json)?;
        log::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        match validate_address(&self.contract_address) {
            Ok(true) => {}
            Ok(false) => {
                return Err(ClientError::Config(format!(
                    "contract_address {} has an invalid checksum",
                    self.contract_address
                )))
            }
            Err(e) => return Err(ClientError::Config(format!("contract_address: {e}"))),
        }

        if self.gas_limit == 0 {
            return Err(ClientError::Config("gas_limit must be non-zero".into()));
        }
        if self.receipt_poll_interval_ms == 0 {
            return Err(ClientError::Config(
                "receipt_poll_interval_ms must be non-zero".into(),
            ));
        }
        if self.confirmation_timeout_secs == Some(0) {
            return Err(ClientError::Config(
                "confirmation_timeout_secs must be non-zero when set".into(),
            ));
        }

        let table = self.rate_table()?;
        if !table.contains(&self.default_currency) {
            return Err(ClientError::Config(format!(
                "default_currency {} is not in the rate table",
                self.default_currency
            )));
        }

        Ok(())
    }

    pub fn rate_table(&self) -> Result<RateTable, ClientError> {
        RateTable::from_entries(&self.rates)
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_secs.map(Duration::from_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}
