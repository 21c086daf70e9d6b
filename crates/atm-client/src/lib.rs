//! Wallet session and transaction coordination for the ATM dApp.
//!
//! The client finds an injected EIP-1193 wallet, authorizes one account,
//! binds the ATM contract through the wallet, and drives deposits and
//! withdrawals from gas lookup to a confirmed, refreshed balance. Balances
//! are shown in a user-selected currency through a static rate table.

pub mod app;
pub mod balance;
pub mod config;
pub mod contract;
pub mod conversion;
pub mod coordinator;
pub mod error;
pub mod provider;
pub mod session;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use app::{AtmApp, Dashboard, UiState, View};
pub use balance::{Balance, BalanceTracker};
pub use config::AtmConfig;
pub use contract::{ContractHandle, ContractTarget, PendingTransaction, RpcContractBinder};
pub use coordinator::{TransactionCoordinator, TransactionIntent, TransactionKind};
pub use error::ClientError;
pub use provider::{RpcError, WalletProvider};
pub use session::{SessionState, WalletSession};
