use std::fmt;

use alloy_primitives::U256;

use chain_eth::units::{format_ether, parse_ether};

use crate::contract::ContractHandle;
use crate::error::ClientError;

/// A contract balance in base units (wei).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Balance(U256);

impl Balance {
    pub fn from_wei(wei: U256) -> Self {
        Self(wei)
    }

    pub fn from_ether(text: &str) -> Result<Self, ClientError> {
        Ok(Self(parse_ether(text)?))
    }

    pub fn wei(&self) -> U256 {
        self.0
    }
}

/// Whole-unit decimal, e.g. `3.0`.
impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_ether(self.0))
    }
}

/// Owns the last fetched contract balance.
///
/// The value is unknown until the first successful refresh. Refreshing
/// borrows the session's contract handle; without one it is a no-op.
#[derive(Debug, Clone, Default)]
pub struct BalanceTracker {
    balance: Option<Balance>,
}

impl BalanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self) -> Option<Balance> {
        self.balance
    }

    pub fn is_known(&self) -> bool {
        self.balance.is_some()
    }

    /// Queries `getBalance()` through `contract`.
    ///
    /// Returns `Ok(None)` without touching state when no contract is bound.
    /// On failure the previous value is kept.
    pub async fn refresh<C: ContractHandle>(
        &mut self,
        contract: Option<&C>,
    ) -> Result<Option<Balance>, ClientError> {
        let Some(contract) = contract else {
            log::debug!("balance refresh skipped: no contract bound");
            return Ok(None);
        };

        let wei = contract
            .get_balance()
            .await
            .map_err(|e| ClientError::BalanceQueryFailed(e.to_string()))?;

        let balance = Balance::from_wei(wei);
        log::debug!("balance refreshed: {balance}");
        self.balance = Some(balance);
        Ok(Some(balance))
    }
}
