use std::fmt;
use std::time::Duration;

use alloy_primitives::U256;

use chain_eth::units::parse_ether;

use crate::balance::BalanceTracker;
use crate::config::AtmConfig;
use crate::contract::{
    ContractBinder, ContractHandle, GasParameters, PendingTransaction, TransactionReceipt,
};
use crate::error::ClientError;
use crate::provider::WalletProvider;
use crate::session::WalletSession;

/// Contract method invoked by an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Deposit,
    Withdraw,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Deposit => f.write_str("deposit"),
            TransactionKind::Withdraw => f.write_str("withdraw"),
        }
    }
}

/// A single user action: move `amount` (whole-unit decimal text) in or out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionIntent {
    pub kind: TransactionKind,
    pub amount: String,
}

impl TransactionIntent {
    pub fn deposit(amount: impl Into<String>) -> Self {
        Self {
            kind: TransactionKind::Deposit,
            amount: amount.into(),
        }
    }

    pub fn withdraw(amount: impl Into<String>) -> Self {
        Self {
            kind: TransactionKind::Withdraw,
            amount: amount.into(),
        }
    }
}

/// Exact whole-unit -> base-unit conversion; zero and sub-wei precision are
/// rejected.
fn to_base_units(amount: &str) -> Result<U256, ClientError> {
    let wei = parse_ether(amount)?;
    if wei.is_zero() {
        return Err(ClientError::InvalidAmount("amount must be positive".into()));
    }
    Ok(wei)
}

/// Drives one intent from gas lookup to confirmed balance.
///
/// Holds no per-submission state. Callers must not start a second
/// submission while one is pending.
#[derive(Debug, Clone)]
pub struct TransactionCoordinator {
    gas_limit: u64,
    confirmation_timeout: Option<Duration>,
}

impl TransactionCoordinator {
    pub fn new(gas_limit: u64, confirmation_timeout: Option<Duration>) -> Self {
        Self {
            gas_limit,
            confirmation_timeout,
        }
    }

    pub fn from_config(config: &AtmConfig) -> Self {
        Self::new(config.gas_limit, config.confirmation_timeout())
    }

    /// Submits `intent` and waits for confirmation, then refreshes the
    /// balance once.
    ///
    /// Returns `Ok(None)` as a no-op when the session has no bound contract.
    /// Any failure before confirmation leaves the balance untouched.
    pub async fn submit<P, B>(
        &self,
        session: &WalletSession<P, B>,
        tracker: &mut BalanceTracker,
        intent: TransactionIntent,
    ) -> Result<Option<TransactionReceipt>, ClientError>
    where
        P: WalletProvider + Clone,
        B: ContractBinder<P>,
    {
        let (Some(provider), Some(contract)) = (session.provider(), session.contract()) else {
            log::debug!("{} skipped: no contract bound", intent.kind);
            return Ok(None);
        };

        let price = provider
            .gas_price()
            .await
            .map_err(|e| ClientError::GasQueryFailed(e.to_string()))?;
        let gas = GasParameters {
            limit: self.gas_limit,
            price,
        };
        log::debug!("gas for {}: limit {}, price {} wei", intent.kind, gas.limit, gas.price);

        let amount = to_base_units(&intent.amount)?;

        let submitted = match intent.kind {
            TransactionKind::Deposit => contract.deposit(amount, gas).await,
            TransactionKind::Withdraw => contract.withdraw(amount, gas).await,
        };
        let pending = submitted.map_err(|e| ClientError::SubmissionRejected(e.to_string()))?;
        log::info!("{} of {} submitted: {}", intent.kind, intent.amount, pending.hash());

        let confirmed = match self.confirmation_timeout {
            Some(limit) => tokio::time::timeout(limit, pending.confirmation())
                .await
                .map_err(|_| ClientError::ConfirmationTimedOut(limit))?,
            None => pending.confirmation().await,
        };
        let receipt = confirmed.map_err(|e| ClientError::ConfirmationFailed(e.to_string()))?;
        log::info!(
            "{} confirmed in block {}",
            receipt.transaction_hash,
            receipt.block_number
        );

        tracker.refresh(Some(contract)).await?;
        Ok(Some(receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::Balance;
    use crate::contract::{ContractTarget, RpcContractBinder};
    use crate::testing::{Devnet, DevnetProvider};

    type Session = WalletSession<DevnetProvider, RpcContractBinder>;

    async fn connected(devnet: &Devnet) -> (Session, BalanceTracker) {
        let config = AtmConfig {
            receipt_poll_interval_ms: 5,
            ..AtmConfig::default()
        };
        let mut session = WalletSession::discover(
            Some(devnet.provider()),
            RpcContractBinder::from_config(&config),
            ContractTarget::from_config(&config).unwrap(),
        );
        session.authorize().await.unwrap();

        let mut tracker = BalanceTracker::new();
        tracker.refresh(session.contract()).await.unwrap();
        (session, tracker)
    }

    fn ether(text: &str) -> Option<Balance> {
        Some(Balance::from_ether(text).unwrap())
    }

    #[test]
    fn base_unit_conversion_is_exact() {
        assert_eq!(
            to_base_units("1.000000000000000001").unwrap(),
            chain_eth::units::ten_pow(18) + U256::from(1u8)
        );
        assert!(matches!(to_base_units("0"), Err(ClientError::InvalidAmount(_))));
        assert!(matches!(
            to_base_units("0.0000000000000000001"),
            Err(ClientError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn submit_without_contract_is_noop() {
        let devnet = Devnet::with_balance("2");
        let config = AtmConfig::default();
        let session: Session = WalletSession::discover(
            Some(devnet.provider()),
            RpcContractBinder::from_config(&config),
            ContractTarget::from_config(&config).unwrap(),
        );
        let mut tracker = BalanceTracker::new();

        let outcome = TransactionCoordinator::from_config(&config)
            .submit(&session, &mut tracker, TransactionIntent::deposit("1"))
            .await
            .unwrap();

        assert!(outcome.is_none());
        assert_eq!(devnet.calls("eth_gasPrice"), 0);
    }

    #[tokio::test]
    async fn deposit_refreshes_balance() {
        let devnet = Devnet::with_balance("2");
        let (session, mut tracker) = connected(&devnet).await;

        let receipt = TransactionCoordinator::new(100_000, None)
            .submit(&session, &mut tracker, TransactionIntent::deposit("1.0"))
            .await
            .unwrap()
            .unwrap();

        assert!(receipt.success);
        assert_eq!(tracker.balance(), ether("3"));
        assert_eq!(devnet.calls("eth_gasPrice"), 1);
    }

    #[tokio::test]
    async fn deposit_increases_balance_by_exact_wei() {
        let devnet = Devnet::with_balance("2");
        let (session, mut tracker) = connected(&devnet).await;
        let coordinator = TransactionCoordinator::new(100_000, None);

        for (amount, wei) in [
            ("0.000000000000000001", U256::from(1u8)),
            ("1.234567890123456789", U256::from(1_234_567_890_123_456_789u64)),
            ("0.1", U256::from(100_000_000_000_000_000u64)),
        ] {
            let before = tracker.balance().unwrap().wei();
            coordinator
                .submit(&session, &mut tracker, TransactionIntent::deposit(amount))
                .await
                .unwrap()
                .unwrap();

            let after = tracker.balance().unwrap().wei();
            assert_eq!(after - before, wei, "deposit of {amount}");
            assert_eq!(devnet.contract_balance(), after);
        }
    }

    #[tokio::test]
    async fn gas_price_is_queried_per_submission() {
        let devnet = Devnet::with_balance("5");
        let (session, mut tracker) = connected(&devnet).await;
        let coordinator = TransactionCoordinator::new(100_000, None);

        devnet.set_gas_price(U256::from(7u8));
        coordinator
            .submit(&session, &mut tracker, TransactionIntent::withdraw("1"))
            .await
            .unwrap();
        assert_eq!(devnet.last_transaction().unwrap()["gasPrice"], "0x7");

        devnet.set_gas_price(U256::from(9u8));
        coordinator
            .submit(&session, &mut tracker, TransactionIntent::withdraw("1"))
            .await
            .unwrap();
        assert_eq!(devnet.last_transaction().unwrap()["gasPrice"], "0x9");
        assert_eq!(devnet.calls("eth_gasPrice"), 2);
        assert_eq!(tracker.balance(), ether("3"));
    }

    #[tokio::test]
    async fn gas_query_failure_aborts() {
        let devnet = Devnet::with_balance("2");
        let (session, mut tracker) = connected(&devnet).await;
        devnet.fail_next("eth_gasPrice");

        let err = TransactionCoordinator::new(100_000, None)
            .submit(&session, &mut tracker, TransactionIntent::deposit("1"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::GasQueryFailed(_)));
        assert_eq!(devnet.calls("eth_sendTransaction"), 0);
        assert_eq!(tracker.balance(), ether("2"));
    }

    #[tokio::test]
    async fn overdrawn_withdraw_is_rejected() {
        let devnet = Devnet::with_balance("3");
        let (session, mut tracker) = connected(&devnet).await;

        let err = TransactionCoordinator::new(100_000, None)
            .submit(&session, &mut tracker, TransactionIntent::withdraw("10"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::SubmissionRejected(_)));
        assert_eq!(tracker.balance(), ether("3"));
    }

    #[tokio::test]
    async fn reverted_transaction_fails_confirmation() {
        let devnet = Devnet::with_balance("2");
        let (session, mut tracker) = connected(&devnet).await;
        devnet.revert_next_transaction();

        let err = TransactionCoordinator::new(100_000, None)
            .submit(&session, &mut tracker, TransactionIntent::deposit("1"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::ConfirmationFailed(_)));
        assert_eq!(tracker.balance(), ether("2"));
    }

    #[tokio::test]
    async fn too_precise_amount_is_rejected_before_submission() {
        let devnet = Devnet::with_balance("2");
        let (session, mut tracker) = connected(&devnet).await;

        let err = TransactionCoordinator::new(100_000, None)
            .submit(&session, &mut tracker, TransactionIntent::deposit("0.0000000000000000001"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::InvalidAmount(_)));
        assert_eq!(devnet.calls("eth_sendTransaction"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn confirmation_timeout_is_enforced() {
        let devnet = Devnet::with_balance("2");
        let (session, mut tracker) = connected(&devnet).await;
        devnet.set_confirmation_delay(u32::MAX);

        let err = TransactionCoordinator::new(100_000, Some(Duration::from_secs(30)))
            .submit(&session, &mut tracker, TransactionIntent::deposit("1"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::ConfirmationTimedOut(_)));
        assert_eq!(tracker.balance(), ether("2"));
    }
}
