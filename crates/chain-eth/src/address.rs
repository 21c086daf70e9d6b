use alloy_primitives::Address;
use sha3::{Digest, Keccak256};

use crate::error::EthError;

/// Strips the `0x` prefix and checks the remainder is 40 hex characters.
fn hex_body(address: &str) -> Result<&str, EthError> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| EthError::InvalidAddress("address must start with 0x".into()))?;

    if hex_part.len() != 40 {
        return Err(EthError::InvalidAddress(format!(
            "expected 40 hex characters, got {}",
            hex_part.len()
        )));
    }

    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EthError::InvalidAddress(
            "address contains non-hex characters".into(),
        ));
    }

    Ok(hex_part)
}

/// Validates an Ethereum address string.
///
/// Checks that the address has the correct format (0x + 40 hex characters).
/// If the address contains mixed case, the EIP-55 checksum is verified and
/// `Ok(false)` is returned on mismatch.
pub fn validate_address(address: &str) -> Result<bool, EthError> {
    let hex_part = hex_body(address)?;

    let is_all_lower = hex_part.chars().all(|c| !c.is_ascii_uppercase());
    let is_all_upper = hex_part.chars().all(|c| !c.is_ascii_lowercase());

    if is_all_lower || is_all_upper {
        return Ok(true);
    }

    let checksummed = checksum_address(&format!("0x{}", hex_part.to_lowercase()))?;
    Ok(checksummed[2..] == *hex_part)
}

/// Applies EIP-55 mixed-case checksum encoding to an Ethereum address.
pub fn checksum_address(address: &str) -> Result<String, EthError> {
    let hex_part = hex_body(address)?.to_lowercase();

    // EIP-55: hash the lowercase hex address (without 0x).
    let hash = Keccak256::digest(hex_part.as_bytes());

    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");

    for (i, c) in hex_part.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }

    Ok(checksummed)
}

/// Parses an address reported by a wallet or read from configuration.
///
/// Mixed-case input must carry a valid EIP-55 checksum.
pub fn parse_address(address: &str) -> Result<Address, EthError> {
    let address = address.trim();
    if !validate_address(address)? {
        return Err(EthError::InvalidAddress(format!(
            "checksum mismatch for {address}"
        )));
    }

    let bytes = hex::decode(&address[2..])
        .map_err(|e| EthError::InvalidAddress(format!("invalid hex: {e}")))?;
    Ok(Address::from_slice(&bytes))
}

/// Formats an address in its EIP-55 checksummed form.
pub fn to_checksum(address: &Address) -> String {
    address.to_checksum(None)
}
