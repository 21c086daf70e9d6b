//! Contract binding: a callable handle on the deployed ATM contract.
//!
//! [`ContractHandle`] and [`PendingTransaction`] are the seam towards the
//! chain. [`RpcContract`] implements them over the wallet's own EIP-1193
//! surface, so the wallet signs and broadcasts every state-changing call.

use std::fs;
use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use chain_eth::abi::{decode_hex_data, decode_uint256, AbiParam};
use chain_eth::address::{parse_address, to_checksum};
use chain_eth::error::EthError;
use chain_eth::interface::ContractInterface;
use chain_eth::transaction::{build_contract_call, parse_hash, RawReceipt};

pub use chain_eth::transaction::TransactionReceipt;

use crate::config::AtmConfig;
use crate::error::ClientError;
use crate::provider::{RpcError, WalletProvider};

/// Errors raised by a contract call or confirmation wait.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("transaction {0} reverted")]
    Reverted(B256),

    #[error(transparent)]
    Encoding(#[from] EthError),
}

/// Gas settings attached to one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasParameters {
    pub limit: u64,
    /// Price in wei, queried fresh for every submission.
    pub price: U256,
}

/// Signing context: the provider that signs, on behalf of `account`.
#[derive(Debug, Clone)]
pub struct Signer<P> {
    pub provider: P,
    pub account: Address,
}

impl<P> Signer<P> {
    pub fn new(provider: P, account: Address) -> Self {
        Self { provider, account }
    }
}

/// Where the contract lives and what it exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractTarget {
    pub address: Address,
    pub interface: ContractInterface,
}

impl ContractTarget {
    pub fn new(address: Address, interface: ContractInterface) -> Self {
        Self { address, interface }
    }

    /// Resolves the configured address, reading the interface from the
    /// compiled artifact when one is configured.
    pub fn from_config(config: &AtmConfig) -> Result<Self, ClientError> {
        let address = parse_address(&config.contract_address)
            .map_err(|e| ClientError::Config(format!("contract_address: {e}")))?;

        let interface = match &config.artifact_path {
            Some(path) => {
                let json = fs::read_to_string(path).map_err(|e| {
                    ClientError::Config(format!("artifact {}: {e}", path.display()))
                })?;
                ContractInterface::from_artifact_json(&json)
                    .map_err(|e| ClientError::Config(format!("artifact {}: {e}", path.display())))?
            }
            None => ContractInterface::assessment(),
        };

        for name in ["getBalance", "deposit", "withdraw"] {
            interface
                .function(name)
                .map_err(|e| ClientError::Config(e.to_string()))?;
        }

        Ok(Self::new(address, interface))
    }
}

/// A submitted but not yet confirmed state-changing call.
#[async_trait(?Send)]
pub trait PendingTransaction {
    fn hash(&self) -> B256;

    /// Resolves once the transaction is mined. Fails if it reverted.
    async fn confirmation(self) -> Result<TransactionReceipt, ContractError>;
}

/// Callable methods of the bound ATM contract.
#[async_trait(?Send)]
pub trait ContractHandle {
    type Pending: PendingTransaction;

    /// Read-only balance in base units; no gas, no confirmation.
    async fn get_balance(&self) -> Result<U256, ContractError>;

    async fn deposit(&self, amount: U256, gas: GasParameters) -> Result<Self::Pending, ContractError>;

    async fn withdraw(&self, amount: U256, gas: GasParameters) -> Result<Self::Pending, ContractError>;
}

/// Builds contract handles for a signer.
pub trait ContractBinder<P> {
    type Handle: ContractHandle;

    fn bind(&self, target: &ContractTarget, signer: Signer<P>) -> Result<Self::Handle, ClientError>;
}

/// Binds [`RpcContract`]s that poll receipts at a fixed interval.
#[derive(Debug, Clone)]
pub struct RpcContractBinder {
    poll_interval: Duration,
}

impl RpcContractBinder {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn from_config(config: &AtmConfig) -> Self {
        Self::new(config.receipt_poll_interval())
    }
}

impl<P: WalletProvider + Clone> ContractBinder<P> for RpcContractBinder {
    type Handle = RpcContract<P>;

    fn bind(&self, target: &ContractTarget, signer: Signer<P>) -> Result<RpcContract<P>, ClientError> {
        log::debug!(
            "binding contract {} for {}",
            to_checksum(&target.address),
            to_checksum(&signer.account)
        );

        Ok(RpcContract {
            provider: signer.provider,
            account: signer.account,
            target: target.clone(),
            poll_interval: self.poll_interval,
        })
    }
}

/// Contract handle that talks JSON-RPC through the wallet provider.
#[derive(Debug, Clone)]
pub struct RpcContract<P> {
    provider: P,
    account: Address,
    target: ContractTarget,
    poll_interval: Duration,
}

impl<P: WalletProvider + Clone> RpcContract<P> {
    pub fn account(&self) -> Address {
        self.account
    }

    pub fn address(&self) -> Address {
        self.target.address
    }

    async fn send(
        &self,
        function: &str,
        amount: U256,
        gas: GasParameters,
    ) -> Result<RpcPendingTransaction<P>, ContractError> {
        let data = self
            .target
            .interface
            .encode_call(function, &[AbiParam::Uint256(amount)])?;
        let tx = build_contract_call(&self.account, &self.target.address, &data, gas.limit, gas.price)?;

        let params = serde_json::to_value([tx])
            .map_err(|e| EthError::EncodingError(e.to_string()))?;
        let result = self.provider.request("eth_sendTransaction", params).await?;

        let hash_text = result
            .as_str()
            .ok_or_else(|| EthError::EncodingError("eth_sendTransaction did not return a hash".into()))?;
        let hash = parse_hash(hash_text)?;

        Ok(RpcPendingTransaction {
            provider: self.provider.clone(),
            hash,
            poll_interval: self.poll_interval,
        })
    }
}

#[async_trait(?Send)]
impl<P: WalletProvider + Clone> ContractHandle for RpcContract<P> {
    type Pending = RpcPendingTransaction<P>;

    async fn get_balance(&self) -> Result<U256, ContractError> {
        let data = self.target.interface.encode_call("getBalance", &[])?;
        let call = json!({
            "from": to_checksum(&self.account),
            "to": to_checksum(&self.target.address),
            "data": format!("0x{}", hex::encode(data)),
        });

        let result = self.provider.request("eth_call", json!([call, "latest"])).await?;
        let text = result
            .as_str()
            .ok_or_else(|| EthError::EncodingError("eth_call did not return hex data".into()))?;

        Ok(decode_uint256(&decode_hex_data(text)?)?)
    }

    async fn deposit(&self, amount: U256, gas: GasParameters) -> Result<Self::Pending, ContractError> {
        self.send("deposit", amount, gas).await
    }

    async fn withdraw(&self, amount: U256, gas: GasParameters) -> Result<Self::Pending, ContractError> {
        self.send("withdraw", amount, gas).await
    }
}

/// Pending transaction resolved by polling `eth_getTransactionReceipt`.
#[derive(Debug, Clone)]
pub struct RpcPendingTransaction<P> {
    provider: P,
    hash: B256,
    poll_interval: Duration,
}

#[async_trait(?Send)]
impl<P: WalletProvider + Clone> PendingTransaction for RpcPendingTransaction<P> {
    fn hash(&self) -> B256 {
        self.hash
    }

    async fn confirmation(self) -> Result<TransactionReceipt, ContractError> {
        let hash_hex = format!("0x{}", hex::encode(self.hash));

        loop {
            let result = self
                .provider
                .request("eth_getTransactionReceipt", json!([hash_hex]))
                .await?;

            if result.is_null() {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }

            let raw: RawReceipt = serde_json::from_value::<RawReceipt>(result)
                .map_err(|e| EthError::EncodingError(format!("receipt: {e}")))?;
            let receipt = TransactionReceipt::try_from(raw)?;

            if !receipt.success {
                return Err(ContractError::Reverted(self.hash));
            }
            return Ok(receipt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Devnet, DEVNET_ACCOUNT};
    use chain_eth::units::parse_ether;

    fn gas() -> GasParameters {
        GasParameters {
            limit: 100_000,
            price: U256::from(1_000_000_000u64),
        }
    }

    fn bind(devnet: &Devnet) -> RpcContract<crate::testing::DevnetProvider> {
        devnet.authorize_accounts(vec![DEVNET_ACCOUNT]);
        let config = AtmConfig::default();
        let target = ContractTarget::from_config(&config).unwrap();
        RpcContractBinder::new(Duration::from_millis(10))
            .bind(&target, Signer::new(devnet.provider(), DEVNET_ACCOUNT))
            .unwrap()
    }

    #[test]
    fn target_from_default_config() {
        let target = ContractTarget::from_config(&AtmConfig::default()).unwrap();
        assert_eq!(
            to_checksum(&target.address),
            "0x5FbDB2315678afecb367f032d93F642f64180aa3"
        );
        assert_eq!(target.interface, ContractInterface::assessment());
    }

    #[test]
    fn target_rejects_missing_artifact() {
        let config = AtmConfig {
            artifact_path: Some("/nonexistent/Assessment.json".into()),
            ..AtmConfig::default()
        };
        assert!(matches!(
            ContractTarget::from_config(&config),
            Err(ClientError::Config(_))
        ));
    }

    #[tokio::test]
    async fn get_balance_uses_eth_call() {
        let devnet = Devnet::with_balance("2");
        let contract = bind(&devnet);

        assert_eq!(contract.get_balance().await.unwrap(), parse_ether("2").unwrap());
        assert_eq!(devnet.calls("eth_call"), 1);
    }

    #[tokio::test]
    async fn deposit_sends_and_confirms() {
        let devnet = Devnet::with_balance("2");
        let contract = bind(&devnet);

        let pending = contract.deposit(parse_ether("1").unwrap(), gas()).await.unwrap();
        let hash = pending.hash();
        let receipt = pending.confirmation().await.unwrap();

        assert_eq!(receipt.transaction_hash, hash);
        assert!(receipt.success);
        assert_eq!(contract.get_balance().await.unwrap(), parse_ether("3").unwrap());

        let sent = devnet.last_transaction().unwrap();
        assert_eq!(sent["gas"], "0x186a0");
        assert_eq!(sent["gasPrice"], "0x3b9aca00");
    }

    #[tokio::test]
    async fn confirmation_polls_until_mined() {
        let devnet = Devnet::with_balance("2");
        devnet.set_confirmation_delay(3);
        let contract = bind(&devnet);

        let pending = contract.deposit(parse_ether("1").unwrap(), gas()).await.unwrap();
        pending.confirmation().await.unwrap();

        assert_eq!(devnet.calls("eth_getTransactionReceipt"), 4);
    }

    #[tokio::test]
    async fn overdrawn_withdraw_is_rejected_at_send() {
        let devnet = Devnet::with_balance("2");
        let contract = bind(&devnet);

        let err = contract.withdraw(parse_ether("10").unwrap(), gas()).await.unwrap_err();
        assert!(matches!(err, ContractError::Rpc(_)));
        assert_eq!(contract.get_balance().await.unwrap(), parse_ether("2").unwrap());
    }

    #[tokio::test]
    async fn reverted_receipt_fails_confirmation() {
        let devnet = Devnet::with_balance("2");
        devnet.revert_next_transaction();
        let contract = bind(&devnet);

        let pending = contract.deposit(parse_ether("1").unwrap(), gas()).await.unwrap();
        let err = pending.confirmation().await.unwrap_err();

        assert!(matches!(err, ContractError::Reverted(_)));
        assert_eq!(contract.get_balance().await.unwrap(), parse_ether("2").unwrap());
    }
}
