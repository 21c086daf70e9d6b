use thiserror::Error;

/// Ethereum primitive errors.
#[derive(Debug, Error)]
pub enum EthError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("invalid contract interface: {0}")]
    InvalidInterface(String),

    #[error("unknown contract function: {0}")]
    UnknownFunction(String),
}
