//! Exact conversion between decimal strings and integer base units.
//!
//! Amounts never pass through floating point: a decimal with more
//! fractional digits than the unit allows is rejected, not truncated.

use alloy_primitives::U256;

use crate::error::EthError;

/// Decimals of the native unit (1 ether = 10^18 wei).
pub const ETHER_DECIMALS: u8 = 18;

/// Largest supported decimal scale; keeps `10^decimals` well inside U256.
const MAX_DECIMALS: u8 = 36;

/// Returns `10^decimals`.
pub fn ten_pow(decimals: u8) -> U256 {
    let ten = U256::from(10u8);
    (0..decimals).fold(U256::from(1u8), |acc, _| acc * ten)
}

/// Parses a non-negative decimal string into base units with the given
/// number of decimals.
///
/// Accepts `"1"`, `"1.5"`, `".5"` and `"1."`. Rejects signs, exponents,
/// empty input, and any fractional part finer than `decimals`.
pub fn parse_units(input: &str, decimals: u8) -> Result<U256, EthError> {
    if decimals > MAX_DECIMALS {
        return Err(EthError::InvalidAmount(format!(
            "unsupported decimal scale {decimals}"
        )));
    }

    let input = input.trim();
    if input.is_empty() {
        return Err(EthError::InvalidAmount("amount is empty".into()));
    }
    if input.starts_with('-') {
        return Err(EthError::InvalidAmount("amount must not be negative".into()));
    }

    let (int_part, frac_part) = match input.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (input, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(EthError::InvalidAmount(format!("not a number: {input}")));
    }
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(EthError::InvalidAmount(format!("not a number: {input}")));
    }
    if frac_part.len() > decimals as usize {
        return Err(EthError::InvalidAmount(format!(
            "{input} has more than {decimals} decimal places"
        )));
    }

    let overflow = || EthError::InvalidAmount(format!("{input} is too large"));

    let whole = if int_part.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(int_part, 10).map_err(|_| overflow())?
    };

    let frac = if frac_part.is_empty() {
        U256::ZERO
    } else {
        let padded = format!("{frac_part:0<width$}", width = decimals as usize);
        U256::from_str_radix(&padded, 10).map_err(|_| overflow())?
    };

    whole
        .checked_mul(ten_pow(decimals))
        .and_then(|scaled| scaled.checked_add(frac))
        .ok_or_else(overflow)
}

/// Formats base units as a decimal string.
///
/// Trailing fractional zeros are trimmed but at least one fractional digit
/// is kept, so whole amounts render as `"3.0"`.
pub fn format_units(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }

    let base = ten_pow(decimals);
    let whole = value / base;
    let frac = value % base;

    let frac_digits = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    let trimmed = frac_digits.trim_end_matches('0');
    let trimmed = if trimmed.is_empty() { "0" } else { trimmed };

    format!("{whole}.{trimmed}")
}

/// Parses an ether amount into wei.
pub fn parse_ether(input: &str) -> Result<U256, EthError> {
    parse_units(input, ETHER_DECIMALS)
}

/// Formats wei as an ether amount.
pub fn format_ether(wei: U256) -> String {
    format_units(wei, ETHER_DECIMALS)
}

/// Parses a JSON-RPC hex quantity such as `"0x3b9aca00"`.
pub fn parse_quantity(input: &str) -> Result<U256, EthError> {
    let body = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .ok_or_else(|| EthError::InvalidQuantity(input.to_string()))?;

    if body.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(body, 16).map_err(|_| EthError::InvalidQuantity(input.to_string()))
}

/// Formats a value as a JSON-RPC hex quantity (no leading zeros).
pub fn to_quantity(value: U256) -> String {
    format!("0x{value:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ether(n: u64) -> U256 {
        U256::from(n) * ten_pow(18)
    }

    #[test]
    fn parse_whole_ether() {
        assert_eq!(parse_ether("2").unwrap(), ether(2));
        assert_eq!(parse_ether("2.0").unwrap(), ether(2));
        assert_eq!(parse_ether("2.").unwrap(), ether(2));
    }

    #[test]
    fn parse_fractional_ether() {
        assert_eq!(
            parse_ether("1.5").unwrap(),
            U256::from(1_500_000_000_000_000_000u128)
        );
        assert_eq!(
            parse_ether(".25").unwrap(),
            U256::from(250_000_000_000_000_000u128)
        );
    }

    #[test]
    fn parse_smallest_unit_is_exact() {
        assert_eq!(parse_ether("0.000000000000000001").unwrap(), U256::from(1u8));
    }

    #[test]
    fn parse_rejects_finer_than_wei() {
        assert!(parse_ether("0.0000000000000000001").is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", " ", ".", "-1", "1e18", "1,5", "abc", "1.2.3", "+1"] {
            assert!(parse_ether(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn parse_rejects_overflow() {
        let huge = "9".repeat(80);
        assert!(parse_ether(&huge).is_err());
    }

    #[test]
    fn format_whole_keeps_one_decimal() {
        assert_eq!(format_ether(ether(3)), "3.0");
        assert_eq!(format_ether(U256::ZERO), "0.0");
    }

    #[test]
    fn format_trims_trailing_zeros() {
        assert_eq!(format_ether(U256::from(1_500_000_000_000_000_000u128)), "1.5");
        assert_eq!(format_ether(U256::from(1u8)), "0.000000000000000001");
    }

    #[test]
    fn format_units_zero_decimals() {
        assert_eq!(format_units(U256::from(42u8), 0), "42");
    }

    #[test]
    fn quantity_parsing() {
        assert_eq!(parse_quantity("0x3b9aca00").unwrap(), U256::from(1_000_000_000u64));
        assert_eq!(parse_quantity("0x").unwrap(), U256::ZERO);
        assert!(parse_quantity("1000").is_err());
        assert!(parse_quantity("0xnope").is_err());
    }

    #[test]
    fn quantity_formatting() {
        assert_eq!(to_quantity(U256::from(100_000u64)), "0x186a0");
        assert_eq!(to_quantity(U256::ZERO), "0x0");
    }
}
