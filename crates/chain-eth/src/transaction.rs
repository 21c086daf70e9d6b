use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::error::EthError;
use crate::units::{parse_quantity, to_quantity};

/// A legacy-priced contract call, shaped for `eth_sendTransaction`.
///
/// The wallet fills in nonce and chain id and signs on its side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    /// Gas limit as a hex quantity.
    pub gas: String,
    /// Gas price in wei as a hex quantity.
    pub gas_price: String,
    /// Value in wei as a hex quantity.
    pub value: String,
    /// `0x`-prefixed calldata.
    pub data: String,
}

/// Builds a contract call request carrying no ether value.
pub fn build_contract_call(
    from: &Address,
    to: &Address,
    data: &[u8],
    gas_limit: u64,
    gas_price: U256,
) -> Result<TransactionRequest, EthError> {
    if gas_limit == 0 {
        return Err(EthError::EncodingError("gas limit must be non-zero".into()));
    }

    Ok(TransactionRequest {
        from: from.to_checksum(None),
        to: to.to_checksum(None),
        gas: to_quantity(U256::from(gas_limit)),
        gas_price: to_quantity(gas_price),
        value: to_quantity(U256::ZERO),
        data: format!("0x{}", hex::encode(data)),
    })
}

/// Receipt of a mined transaction, as returned by
/// `eth_getTransactionReceipt`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReceipt {
    pub transaction_hash: String,
    pub block_number: Option<String>,
    pub gas_used: Option<String>,
    pub status: Option<String>,
}

/// Decoded transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    pub gas_used: U256,
    /// `false` when the transaction was mined but reverted.
    pub success: bool,
}

impl TryFrom<RawReceipt> for TransactionReceipt {
    type Error = EthError;

    fn try_from(raw: RawReceipt) -> Result<Self, Self::Error> {
        let transaction_hash = parse_hash(&raw.transaction_hash)?;

        let block_number = match raw.block_number.as_deref() {
            Some(n) => u64::try_from(parse_quantity(n)?)
                .map_err(|_| EthError::InvalidQuantity(n.to_string()))?,
            None => 0,
        };

        let gas_used = match raw.gas_used.as_deref() {
            Some(g) => parse_quantity(g)?,
            None => U256::ZERO,
        };

        // Pre-Byzantium receipts carry no status; treat them as successful.
        let success = match raw.status.as_deref() {
            Some(s) => parse_quantity(s)? == U256::from(1u8),
            None => true,
        };

        Ok(Self {
            transaction_hash,
            block_number,
            gas_used,
            success,
        })
    }
}

/// Parses a `0x`-prefixed 32-byte transaction hash.
pub fn parse_hash(input: &str) -> Result<B256, EthError> {
    let body = input.strip_prefix("0x").unwrap_or(input);
    let bytes = hex::decode(body)
        .map_err(|e| EthError::EncodingError(format!("invalid transaction hash: {e}")))?;

    if bytes.len() != 32 {
        return Err(EthError::EncodingError(format!(
            "transaction hash must be 32 bytes, got {}",
            bytes.len()
        )));
    }

    Ok(B256::from_slice(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::parse_address;

    const ACCOUNT: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
    const HASH: &str = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";

    #[test]
    fn contract_call_serializes_as_rpc_object() {
        let from = parse_address(ACCOUNT).unwrap();
        let to = parse_address(CONTRACT).unwrap();

        let tx = build_contract_call(&from, &to, &[0x12, 0x06, 0x5f, 0xe0], 100_000, U256::from(1_000_000_000u64))
            .unwrap();
        let json = serde_json::to_value(&tx).unwrap();

        assert_eq!(json["from"], ACCOUNT);
        assert_eq!(json["to"], CONTRACT);
        assert_eq!(json["gas"], "0x186a0");
        assert_eq!(json["gasPrice"], "0x3b9aca00");
        assert_eq!(json["value"], "0x0");
        assert_eq!(json["data"], "0x12065fe0");
    }

    #[test]
    fn zero_gas_limit_is_rejected() {
        let addr = parse_address(CONTRACT).unwrap();
        assert!(build_contract_call(&addr, &addr, &[], 0, U256::ZERO).is_err());
    }

    #[test]
    fn receipt_decodes_success() {
        let raw: RawReceipt = serde_json::from_value(serde_json::json!({
            "transactionHash": HASH,
            "blockNumber": "0x2",
            "gasUsed": "0x5208",
            "status": "0x1"
        }))
        .unwrap();

        let receipt = TransactionReceipt::try_from(raw).unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.block_number, 2);
        assert_eq!(receipt.gas_used, U256::from(21_000u64));
    }

    #[test]
    fn receipt_decodes_revert() {
        let raw: RawReceipt = serde_json::from_value(serde_json::json!({
            "transactionHash": HASH,
            "status": "0x0"
        }))
        .unwrap();

        assert!(!TransactionReceipt::try_from(raw).unwrap().success);
    }

    #[test]
    fn parse_hash_rejects_short_input() {
        assert!(parse_hash("0xdead").is_err());
        assert!(parse_hash(HASH).is_ok());
    }
}
