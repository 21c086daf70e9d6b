//! The injected wallet's request/response surface.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use chain_eth::address::parse_address;
use chain_eth::units::parse_quantity;

/// EIP-1193 "user rejected request".
pub const USER_REJECTED: i64 = 4001;

/// Internal JSON-RPC error, also used for malformed provider responses.
pub const INTERNAL_ERROR: i64 = -32603;

/// An error returned by the wallet provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("provider error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED
    }

    fn malformed(method: &str, detail: impl std::fmt::Display) -> Self {
        Self::new(INTERNAL_ERROR, format!("malformed {method} response: {detail}"))
    }
}

/// How accounts are requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRequest {
    /// Non-mutating lookup of already-authorized accounts (`eth_accounts`).
    Discover,
    /// Mutating authorization that may prompt the user (`eth_requestAccounts`).
    Authorize,
}

impl AccountRequest {
    pub fn method(&self) -> &'static str {
        match self {
            AccountRequest::Discover => "eth_accounts",
            AccountRequest::Authorize => "eth_requestAccounts",
        }
    }
}

/// An injected wallet exposing EIP-1193 `request`.
///
/// All futures run on one logical thread, so implementations need not be
/// `Send`.
#[async_trait(?Send)]
pub trait WalletProvider {
    /// Issues a raw JSON-RPC request and returns its `result` value.
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    /// Lists accounts, either passively or by asking the user to authorize.
    async fn request_accounts(&self, mode: AccountRequest) -> Result<Vec<Address>, RpcError> {
        let method = mode.method();
        let result = self.request(method, json!([])).await?;

        let Value::Array(items) = result else {
            return Err(RpcError::malformed(method, "expected an array"));
        };

        items
            .iter()
            .map(|item| {
                let text = item
                    .as_str()
                    .ok_or_else(|| RpcError::malformed(method, "account is not a string"))?;
                parse_address(text).map_err(|e| RpcError::malformed(method, e))
            })
            .collect()
    }

    /// Current gas price in wei (`eth_gasPrice`).
    async fn gas_price(&self) -> Result<U256, RpcError> {
        let result = self.request("eth_gasPrice", json!([])).await?;
        let text = result
            .as_str()
            .ok_or_else(|| RpcError::malformed("eth_gasPrice", "expected a hex quantity"))?;
        parse_quantity(text).map_err(|e| RpcError::malformed("eth_gasPrice", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(Value);

    #[async_trait(?Send)]
    impl WalletProvider for Canned {
        async fn request(&self, _method: &str, _params: Value) -> Result<Value, RpcError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn account_request_methods() {
        assert_eq!(AccountRequest::Discover.method(), "eth_accounts");
        assert_eq!(AccountRequest::Authorize.method(), "eth_requestAccounts");
    }

    #[test]
    fn rejection_code() {
        assert!(RpcError::new(4001, "User rejected the request.").is_user_rejection());
        assert!(!RpcError::new(-32603, "boom").is_user_rejection());
    }

    #[tokio::test]
    async fn parses_account_list() {
        let provider = Canned(json!(["0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"]));
        let accounts = provider.request_accounts(AccountRequest::Discover).await.unwrap();
        assert_eq!(accounts.len(), 1);
    }

    #[tokio::test]
    async fn malformed_accounts_are_errors() {
        let err = Canned(json!(["not-an-address"]))
            .request_accounts(AccountRequest::Discover)
            .await
            .unwrap_err();
        assert_eq!(err.code, INTERNAL_ERROR);

        assert!(Canned(json!({}))
            .request_accounts(AccountRequest::Authorize)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn gas_price_needs_hex_quantity() {
        assert_eq!(Canned(json!("0x3b9aca00")).gas_price().await.unwrap(), U256::from(1_000_000_000u64));
        assert!(Canned(json!(12)).gas_price().await.is_err());
    }
}
