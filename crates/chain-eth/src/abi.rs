//! Minimal ABI encoding for EVM function calls.
//!
//! Just enough to build calldata for static-argument contract calls and to
//! decode single-word return values, without pulling in a full ABI parser.

use alloy_primitives::{Address, U256};
use sha3::{Digest, Keccak256};

use crate::error::EthError;

/// A single static ABI parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiParam {
    /// A 20-byte address, left-padded to 32 bytes.
    Address(Address),
    /// A 256-bit unsigned integer, big-endian.
    Uint256(U256),
}

impl AbiParam {
    /// The canonical ABI type name of this parameter.
    pub fn type_name(&self) -> &'static str {
        match self {
            AbiParam::Address(_) => "address",
            AbiParam::Uint256(_) => "uint256",
        }
    }
}

/// Computes the 4-byte selector of a canonical function signature such as
/// `deposit(uint256)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Encodes a function call as `selector || word(params[0]) || ...`.
pub fn encode_function_call(selector: [u8; 4], params: &[AbiParam]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + params.len() * 32);
    data.extend_from_slice(&selector);

    for param in params {
        data.extend_from_slice(&encode_param(param));
    }

    data
}

/// Encodes a single [`AbiParam`] as a 32-byte ABI word.
fn encode_param(param: &AbiParam) -> [u8; 32] {
    match param {
        AbiParam::Address(addr) => {
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(addr.as_slice());
            word
        }
        AbiParam::Uint256(value) => value.to_be_bytes::<32>(),
    }
}

/// Decodes a single uint256 return value from ABI-encoded data.
pub fn decode_uint256(data: &[u8]) -> Result<U256, EthError> {
    if data.len() < 32 {
        return Err(EthError::EncodingError(format!(
            "expected at least 32 bytes for uint256, got {}",
            data.len()
        )));
    }

    Ok(U256::from_be_slice(&data[..32]))
}

/// Decodes `0x`-prefixed hex return data, as delivered by `eth_call`.
pub fn decode_hex_data(data: &str) -> Result<Vec<u8>, EthError> {
    let body = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(body).map_err(|e| EthError::EncodingError(format!("invalid hex data: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_known_vectors() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("balanceOf(address)")), "70a08231");
        assert_eq!(hex::encode(selector("getBalance()")), "12065fe0");
    }

    #[test]
    fn encode_address_param_left_pads() {
        let mut raw = [0u8; 20];
        raw[0] = 0xde;
        raw[19] = 0xad;

        let word = encode_param(&AbiParam::Address(Address::from(raw)));

        assert_eq!(&word[..12], &[0u8; 12]);
        assert_eq!(&word[12..], &raw);
    }

    #[test]
    fn encode_uint256_param_is_big_endian() {
        let word = encode_param(&AbiParam::Uint256(U256::from(0x0102u64)));
        assert_eq!(word[30], 0x01);
        assert_eq!(word[31], 0x02);
        assert_eq!(&word[..30], &[0u8; 30]);
    }

    #[test]
    fn encode_function_call_with_selector_only() {
        let data = encode_function_call(selector("getBalance()"), &[]);
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn encode_function_call_one_ether() {
        let one_ether = U256::from(1_000_000_000_000_000_000u128);
        let data = encode_function_call(
            selector("deposit(uint256)"),
            &[AbiParam::Uint256(one_ether)],
        );

        assert_eq!(data.len(), 36);
        assert!(hex::encode(&data[4..]).ends_with("0de0b6b3a7640000"));
    }

    #[test]
    fn decode_uint256_ignores_extra_bytes() {
        let mut data = vec![0u8; 64];
        data[31] = 42;
        data[63] = 99;

        assert_eq!(decode_uint256(&data).unwrap(), U256::from(42u64));
    }

    #[test]
    fn decode_uint256_too_short() {
        assert!(decode_uint256(&[0u8; 16]).is_err());
    }

    #[test]
    fn decode_hex_data_accepts_prefix() {
        assert_eq!(decode_hex_data("0x2a").unwrap(), vec![0x2a]);
        assert!(decode_hex_data("0xzz").is_err());
    }
}
