//! Ethereum/EVM primitives for the ATM client.
//!
//! This crate provides:
//! - Address validation with EIP-55 checksums
//! - Keccak-256 function selectors and minimal ABI word encoding
//! - Exact decimal <-> base-unit conversion (ether <-> wei)
//! - The deployed contract's interface description
//! - JSON-RPC transaction request and receipt shapes

pub mod abi;
pub mod address;
pub mod error;
pub mod interface;
pub mod transaction;
pub mod units;
