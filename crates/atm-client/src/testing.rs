//! In-memory EIP-1193 wallet and chain for tests.
//!
//! [`Devnet`] plays both the injected wallet and the node behind it: it
//! answers account, gas, call and transaction requests and keeps the ATM
//! contract's balance. Knobs inject failures, reverts and mining delay.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use alloy_primitives::{address, Address, B256, U256};
use async_trait::async_trait;
use serde_json::{json, Value};

use chain_eth::abi::{decode_hex_data, decode_uint256};
use chain_eth::address::{parse_address, to_checksum};
use chain_eth::interface::ContractInterface;
use chain_eth::units::{parse_ether, to_quantity};

use crate::config::DEFAULT_CONTRACT_ADDRESS;
use crate::provider::{RpcError, WalletProvider, INTERNAL_ERROR, USER_REJECTED};

/// First Hardhat development account.
pub const DEVNET_ACCOUNT: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");

/// Second Hardhat development account.
pub const DEVNET_SECOND_ACCOUNT: Address = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");

const UNAUTHORIZED: i64 = 4100;
const METHOD_NOT_FOUND: i64 = -32601;
const GAS_USED: u64 = 21_000;

#[derive(Debug)]
struct MinedTx {
    hash: B256,
    request: Value,
    success: bool,
    block_number: u64,
    polls_until_mined: u32,
}

#[derive(Debug)]
struct DevnetState {
    wallet_accounts: Vec<Address>,
    authorized: Vec<Address>,
    reject_authorization: bool,
    gas_price: U256,
    contract: Address,
    interface: ContractInterface,
    contract_balance: U256,
    failures: Vec<String>,
    revert_next: bool,
    confirmation_delay: u32,
    transactions: Vec<MinedTx>,
    calls: HashMap<String, usize>,
    block_number: u64,
}

/// Handle for configuring and inspecting the simulated chain.
#[derive(Debug, Clone)]
pub struct Devnet {
    state: Rc<RefCell<DevnetState>>,
}

/// The wallet side of a [`Devnet`], as injected into a session.
#[derive(Debug, Clone)]
pub struct DevnetProvider {
    state: Rc<RefCell<DevnetState>>,
}

impl Devnet {
    /// A devnet whose ATM contract holds `balance` ether and whose wallet
    /// will authorize [`DEVNET_ACCOUNT`] on request.
    ///
    /// Panics if `balance` is not a valid ether amount.
    pub fn with_balance(balance: &str) -> Self {
        let contract_balance = parse_ether(balance)
            .unwrap_or_else(|e| panic!("devnet balance {balance:?}: {e}"));
        let contract = parse_address(DEFAULT_CONTRACT_ADDRESS)
            .expect("default contract address is checksummed");

        Self {
            state: Rc::new(RefCell::new(DevnetState {
                wallet_accounts: vec![DEVNET_ACCOUNT],
                authorized: Vec::new(),
                reject_authorization: false,
                gas_price: U256::from(1_000_000_000u64),
                contract,
                interface: ContractInterface::assessment(),
                contract_balance,
                failures: Vec::new(),
                revert_next: false,
                confirmation_delay: 0,
                transactions: Vec::new(),
                calls: HashMap::new(),
                block_number: 0,
            })),
        }
    }

    pub fn provider(&self) -> DevnetProvider {
        DevnetProvider {
            state: self.state.clone(),
        }
    }

    /// Marks accounts as already authorized, as after a previous visit.
    pub fn authorize_accounts(&self, accounts: Vec<Address>) {
        let mut state = self.state.borrow_mut();
        state.authorized = accounts.clone();
        state.wallet_accounts = accounts;
    }

    /// Accounts the wallet hands out on the next authorization request.
    pub fn set_wallet_accounts(&self, accounts: Vec<Address>) {
        self.state.borrow_mut().wallet_accounts = accounts;
    }

    /// The user declines every authorization prompt.
    pub fn reject_authorization(&self) {
        self.state.borrow_mut().reject_authorization = true;
    }

    /// The next request for `method` fails with an internal error.
    pub fn fail_next(&self, method: &str) {
        self.state.borrow_mut().failures.push(method.to_string());
    }

    /// The next transaction is mined but reverts.
    pub fn revert_next_transaction(&self) {
        self.state.borrow_mut().revert_next = true;
    }

    /// Receipt polls answered with `null` before a transaction is mined.
    pub fn set_confirmation_delay(&self, polls: u32) {
        self.state.borrow_mut().confirmation_delay = polls;
    }

    pub fn set_gas_price(&self, price: U256) {
        self.state.borrow_mut().gas_price = price;
    }

    pub fn contract_balance(&self) -> U256 {
        self.state.borrow().contract_balance
    }

    /// Number of requests seen for `method`.
    pub fn calls(&self, method: &str) -> usize {
        self.state.borrow().calls.get(method).copied().unwrap_or(0)
    }

    /// The transaction object of the most recent `eth_sendTransaction`.
    pub fn last_transaction(&self) -> Option<Value> {
        self.state
            .borrow()
            .transactions
            .last()
            .map(|tx| tx.request.clone())
    }
}

fn selector_of(data: &[u8]) -> Option<[u8; 4]> {
    data.get(..4).and_then(|s| s.try_into().ok())
}

fn tx_hash(index: usize) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[0] = 0xa7;
    bytes[24..].copy_from_slice(&(index as u64 + 1).to_be_bytes());
    B256::from(bytes)
}

impl DevnetState {
    fn call_data(params: &Value) -> Result<(Option<Address>, Address, Vec<u8>), RpcError> {
        let call = params
            .get(0)
            .ok_or_else(|| RpcError::new(INTERNAL_ERROR, "missing call object"))?;
        let field = |name: &str| call.get(name).and_then(Value::as_str);

        let from = field("from").map(parse_address).transpose();
        let to = field("to").map(parse_address).transpose();
        let (Ok(from), Ok(Some(to))) = (from, to) else {
            return Err(RpcError::new(INTERNAL_ERROR, "invalid from/to"));
        };
        let data = decode_hex_data(field("data").unwrap_or("0x"))
            .map_err(|e| RpcError::new(INTERNAL_ERROR, e.to_string()))?;

        Ok((from, to, data))
    }

    fn selector(&self, name: &str) -> Option<[u8; 4]> {
        self.interface.function(name).ok().map(|f| f.selector())
    }

    fn eth_call(&self, params: &Value) -> Result<Value, RpcError> {
        let (_, to, data) = Self::call_data(params)?;
        if to != self.contract {
            return Ok(json!("0x"));
        }
        if selector_of(&data) != self.selector("getBalance") {
            return Err(RpcError::new(INTERNAL_ERROR, "execution reverted"));
        }

        let word = self.contract_balance.to_be_bytes::<32>();
        Ok(json!(format!("0x{}", hex::encode(word))))
    }

    fn send_transaction(&mut self, params: &Value) -> Result<Value, RpcError> {
        let (from, to, data) = Self::call_data(params)?;
        match from {
            Some(from) if self.authorized.contains(&from) => {}
            _ => return Err(RpcError::new(UNAUTHORIZED, "account not authorized")),
        }
        if to != self.contract {
            return Err(RpcError::new(INTERNAL_ERROR, "unknown contract"));
        }

        let selector = selector_of(&data);
        let amount = decode_uint256(data.get(4..).unwrap_or_default())
            .map_err(|e| RpcError::new(INTERNAL_ERROR, e.to_string()))?;

        let new_balance = if selector == self.selector("deposit") {
            self.contract_balance
                .checked_add(amount)
                .ok_or_else(|| RpcError::new(INTERNAL_ERROR, "execution reverted: overflow"))?
        } else if selector == self.selector("withdraw") {
            if amount > self.contract_balance {
                return Err(RpcError::new(
                    INTERNAL_ERROR,
                    format!(
                        "execution reverted: InsufficientBalance({}, {})",
                        self.contract_balance, amount
                    ),
                ));
            }
            self.contract_balance - amount
        } else {
            return Err(RpcError::new(INTERNAL_ERROR, "execution reverted"));
        };

        let success = !std::mem::take(&mut self.revert_next);
        if success {
            self.contract_balance = new_balance;
        }
        self.block_number += 1;

        let hash = tx_hash(self.transactions.len());
        self.transactions.push(MinedTx {
            hash,
            request: params.get(0).cloned().unwrap_or(Value::Null),
            success,
            block_number: self.block_number,
            polls_until_mined: self.confirmation_delay,
        });

        Ok(json!(format!("0x{}", hex::encode(hash))))
    }

    fn receipt(&mut self, params: &Value) -> Result<Value, RpcError> {
        let hash = params
            .get(0)
            .and_then(Value::as_str)
            .and_then(|h| chain_eth::transaction::parse_hash(h).ok())
            .ok_or_else(|| RpcError::new(INTERNAL_ERROR, "invalid transaction hash"))?;

        let Some(tx) = self.transactions.iter_mut().find(|tx| tx.hash == hash) else {
            return Ok(Value::Null);
        };

        if tx.polls_until_mined > 0 {
            tx.polls_until_mined -= 1;
            return Ok(Value::Null);
        }

        Ok(json!({
            "transactionHash": format!("0x{}", hex::encode(tx.hash)),
            "blockNumber": to_quantity(U256::from(tx.block_number)),
            "gasUsed": to_quantity(U256::from(GAS_USED)),
            "status": if tx.success { "0x1" } else { "0x0" },
        }))
    }
}

#[async_trait(?Send)]
impl WalletProvider for DevnetProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let mut state = self.state.borrow_mut();
        *state.calls.entry(method.to_string()).or_insert(0) += 1;

        if let Some(pos) = state.failures.iter().position(|m| m == method) {
            state.failures.remove(pos);
            return Err(RpcError::new(INTERNAL_ERROR, format!("simulated {method} failure")));
        }

        let checksummed = |accounts: &[Address]| -> Vec<String> {
            accounts.iter().map(to_checksum).collect()
        };

        match method {
            "eth_accounts" => Ok(json!(checksummed(&state.authorized))),
            "eth_requestAccounts" => {
                if state.reject_authorization {
                    return Err(RpcError::new(USER_REJECTED, "User rejected the request."));
                }
                state.authorized = state.wallet_accounts.clone();
                Ok(json!(checksummed(&state.authorized)))
            }
            "eth_gasPrice" => Ok(json!(to_quantity(state.gas_price))),
            "eth_call" => state.eth_call(&params),
            "eth_sendTransaction" => state.send_transaction(&params),
            "eth_getTransactionReceipt" => state.receipt(&params),
            other => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("method {other} not supported"),
            )),
        }
    }
}
