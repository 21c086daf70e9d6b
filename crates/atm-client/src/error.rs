use std::time::Duration;

use thiserror::Error;

use crate::provider::RpcError;

/// Errors surfaced to the presentation layer.
///
/// Guarded operations invoked without their required prior state are not
/// errors; they return a no-op outcome instead.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("A browser wallet is required to use this ATM")]
    ProviderAbsent,

    #[error("Wallet connection was rejected: {0}")]
    AuthorizationDenied(String),

    #[error("Wallet connection failed: {0}")]
    AuthorizationFailed(String),

    #[error("Gas price query failed: {0}")]
    GasQueryFailed(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Transaction rejected: {0}")]
    SubmissionRejected(String),

    #[error("Transaction failed to confirm: {0}")]
    ConfirmationFailed(String),

    #[error("Transaction not confirmed within {0:?}")]
    ConfirmationTimedOut(Duration),

    #[error("Balance query failed: {0}")]
    BalanceQueryFailed(String),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Balance cannot be shown in {0}: value out of range")]
    DisplayOverflow(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Contract binding failed: {0}")]
    Binding(String),
}

impl ClientError {
    /// Maps a failed `eth_requestAccounts` call; code 4001 is the EIP-1193
    /// "user rejected request" code.
    pub(crate) fn from_authorization(err: RpcError) -> Self {
        if err.is_user_rejection() {
            ClientError::AuthorizationDenied(err.message)
        } else {
            ClientError::AuthorizationFailed(err.to_string())
        }
    }
}

impl From<chain_eth::error::EthError> for ClientError {
    fn from(e: chain_eth::error::EthError) -> Self {
        match e {
            chain_eth::error::EthError::InvalidAmount(msg) => ClientError::InvalidAmount(msg),
            other => ClientError::Binding(other.to_string()),
        }
    }
}
