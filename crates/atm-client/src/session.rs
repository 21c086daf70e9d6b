use alloy_primitives::Address;

use chain_eth::address::to_checksum;

use crate::config::SELECTED_ACCOUNT_INDEX;
use crate::contract::{ContractBinder, ContractTarget, Signer};
use crate::error::ClientError;
use crate::provider::{AccountRequest, WalletProvider};

/// Lifecycle of a wallet session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No injected wallet; permanent for this session.
    NoProvider,
    /// Wallet present, no account known yet.
    ProviderFound,
    /// An account is known but no contract handle is bound.
    AccountDiscovered,
    /// Account authorized and contract handle bound.
    Connected,
}

/// Owns the account and the contract handle.
///
/// A contract handle only ever exists once an account is known, and is
/// rebuilt from scratch on every (re)authorization.
pub struct WalletSession<P, B: ContractBinder<P>> {
    provider: Option<P>,
    binder: B,
    target: ContractTarget,
    account: Option<Address>,
    contract: Option<B::Handle>,
}

impl<P, B> WalletSession<P, B>
where
    P: WalletProvider + Clone,
    B: ContractBinder<P>,
{
    /// Starts a session from whatever wallet the host injected, if any.
    ///
    /// Provider discovery happens exactly once; an absent wallet is never
    /// polled for again.
    pub fn discover(injected: Option<P>, binder: B, target: ContractTarget) -> Self {
        if injected.is_some() {
            log::info!("wallet provider found");
        } else {
            log::warn!("no wallet provider injected; session limited to guidance");
        }

        Self {
            provider: injected,
            binder,
            target,
            account: None,
            contract: None,
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.provider, &self.account, &self.contract) {
            (None, _, _) => SessionState::NoProvider,
            (Some(_), None, _) => SessionState::ProviderFound,
            (Some(_), Some(_), None) => SessionState::AccountDiscovered,
            (Some(_), Some(_), Some(_)) => SessionState::Connected,
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn provider(&self) -> Option<&P> {
        self.provider.as_ref()
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn contract(&self) -> Option<&B::Handle> {
        self.contract.as_ref()
    }

    pub fn target(&self) -> &ContractTarget {
        &self.target
    }

    /// Asks the wallet for already-authorized accounts without prompting.
    ///
    /// Failures are logged and leave the session unchanged. Returns the
    /// selected account when one was found. A different account than the
    /// current one invalidates the bound contract handle.
    pub async fn discover_accounts(&mut self) -> Option<Address> {
        let provider = self.provider.as_ref()?;

        match provider.request_accounts(AccountRequest::Discover).await {
            Ok(accounts) => match select_account(&accounts) {
                Some(account) => {
                    log::info!("account discovered: {}", to_checksum(&account));
                    if self.account != Some(account) && self.contract.take().is_some() {
                        log::info!("account changed; contract handle dropped");
                    }
                    self.account = Some(account);
                    Some(account)
                }
                None => {
                    log::info!("no authorized account yet");
                    None
                }
            },
            Err(e) => {
                log::warn!("account discovery failed: {e}");
                None
            }
        }
    }

    /// User-initiated connect: requests authorization, then binds the
    /// contract for the authorized account.
    ///
    /// Every failure is returned to the caller; nothing is swallowed.
    pub async fn authorize(&mut self) -> Result<Address, ClientError> {
        let provider = self.provider.as_ref().ok_or(ClientError::ProviderAbsent)?;

        let accounts = provider
            .request_accounts(AccountRequest::Authorize)
            .await
            .map_err(ClientError::from_authorization)?;

        let account = select_account(&accounts).ok_or_else(|| {
            ClientError::AuthorizationFailed("wallet returned no accounts".into())
        })?;

        log::info!("account authorized: {}", to_checksum(&account));
        self.account = Some(account);
        self.contract = None;
        self.bind_contract()?;

        Ok(account)
    }

    /// Builds a fresh contract handle for the current account.
    ///
    /// Returns `Ok(false)` without side effects when no account is known.
    pub fn bind_contract(&mut self) -> Result<bool, ClientError> {
        let (Some(provider), Some(account)) = (self.provider.as_ref(), self.account) else {
            log::debug!("contract binding skipped: no account");
            return Ok(false);
        };

        let handle = self
            .binder
            .bind(&self.target, Signer::new(provider.clone(), account))?;
        self.contract = Some(handle);
        log::info!("contract bound at {}", to_checksum(&self.target.address));
        Ok(true)
    }
}

/// Single-account model: the first reported account wins.
fn select_account(accounts: &[Address]) -> Option<Address> {
    if accounts.len() > SELECTED_ACCOUNT_INDEX + 1 {
        log::debug!("ignoring {} additional accounts", accounts.len() - 1);
    }
    accounts.get(SELECTED_ACCOUNT_INDEX).copied()
}
