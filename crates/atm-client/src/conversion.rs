//! Static currency conversion for balance display.

use std::fmt;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use chain_eth::units::{format_units, parse_units, ten_pow, ETHER_DECIMALS};

use crate::balance::Balance;
use crate::error::ClientError;

/// Symbol of the contract's native unit.
pub const NATIVE_SYMBOL: &str = "ETH";

/// Fixed-point scale of conversion rates.
const RATE_DECIMALS: u8 = 18;

/// Digits shown after the decimal point.
const DISPLAY_DECIMALS: u8 = 2;

/// Multiplier from the native unit into a display currency, held as an
/// exact fixed-point value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rate(U256);

impl Rate {
    pub fn parse(text: &str) -> Result<Self, ClientError> {
        parse_units(text, RATE_DECIMALS)
            .map(Rate)
            .map_err(|e| ClientError::Config(format!("rate {text:?}: {e}")))
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = format_units(self.0, RATE_DECIMALS);
        f.write_str(text.strip_suffix(".0").unwrap_or(&text))
    }
}

/// One row of the conversion table as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEntry {
    pub currency: String,
    pub rate: String,
}

impl RateEntry {
    pub fn new(currency: &str, rate: &str) -> Self {
        Self {
            currency: currency.into(),
            rate: rate.into(),
        }
    }
}

/// Ordered, read-only mapping from currency code to [`Rate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateTable {
    entries: Vec<(String, Rate)>,
}

impl RateTable {
    pub fn from_entries(entries: &[RateEntry]) -> Result<Self, ClientError> {
        let mut parsed: Vec<(String, Rate)> = Vec::with_capacity(entries.len());

        for entry in entries {
            let code = entry.currency.trim();
            if code.is_empty() {
                return Err(ClientError::Config("empty currency code".into()));
            }
            if parsed.iter().any(|(c, _)| c == code) {
                return Err(ClientError::Config(format!("duplicate currency {code}")));
            }
            parsed.push((code.to_string(), Rate::parse(&entry.rate)?));
        }

        if parsed.is_empty() {
            return Err(ClientError::Config("rate table is empty".into()));
        }

        Ok(Self { entries: parsed })
    }

    pub fn rate(&self, currency: &str) -> Option<Rate> {
        self.entries
            .iter()
            .find(|(code, _)| code == currency)
            .map(|(_, rate)| *rate)
    }

    pub fn contains(&self, currency: &str) -> bool {
        self.rate(currency).is_some()
    }

    /// Currency codes in table order.
    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(code, _)| code.as_str())
    }

    /// One `1 ETH = <rate> <currency>` line per entry, in table order.
    pub fn price_ticker(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(code, rate)| format!("1 {NATIVE_SYMBOL} = {rate} {code}"))
            .collect()
    }
}

/// Converts `balance` into `currency`, rounded half-up to two decimal
/// places.
pub fn display(balance: &Balance, table: &RateTable, currency: &str) -> Result<String, ClientError> {
    let rate = table
        .rate(currency)
        .ok_or_else(|| ClientError::UnknownCurrency(currency.to_string()))?;

    let product = balance
        .wei()
        .checked_mul(rate.0)
        .ok_or_else(|| ClientError::DisplayOverflow(currency.to_string()))?;

    // product carries ETHER_DECIMALS + RATE_DECIMALS fractional digits.
    let drop = ETHER_DECIMALS + RATE_DECIMALS - DISPLAY_DECIMALS;
    let divisor = ten_pow(drop);
    let half = divisor / U256::from(2u8);
    let cents = (product + half) / divisor;

    let scale = ten_pow(DISPLAY_DECIMALS);
    Ok(format!(
        "{}.{:0>width$}",
        cents / scale,
        (cents % scale).to_string(),
        width = DISPLAY_DECIMALS as usize
    ))
}

/// [`display`] followed by the currency code, e.g. `"2.00 ETH"`.
pub fn display_with_code(
    balance: &Balance,
    table: &RateTable,
    currency: &str,
) -> Result<String, ClientError> {
    Ok(format!("{} {currency}", display(balance, table, currency)?))
}
