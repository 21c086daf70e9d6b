//! Presentation-facing aggregate of the ATM client.
//!
//! [`AtmApp`] owns the session, the balance tracker, the coordinator and the
//! UI fields, and turns them into a [`View`] for whatever front end renders
//! it. Every method takes `&self`, so a view can be rendered while a
//! connect or a submission is still pending.

use std::cell::RefCell;

use tokio::sync::RwLock;

use chain_eth::address::to_checksum;

use crate::balance::{Balance, BalanceTracker};
use crate::config::AtmConfig;
use crate::contract::{ContractBinder, ContractTarget, RpcContractBinder, TransactionReceipt};
use crate::conversion::{display_with_code, RateTable};
use crate::coordinator::{TransactionCoordinator, TransactionIntent, TransactionKind};
use crate::error::ClientError;
use crate::provider::WalletProvider;
use crate::session::{SessionState, WalletSession};

/// Guidance shown when no wallet is injected.
pub const INSTALL_WALLET_MESSAGE: &str =
    "Please install a browser wallet such as MetaMask to use this ATM.";

/// Plain field storage behind the controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    selected_currency: String,
    amount_input: String,
    ticker_visible: bool,
    in_flight: bool,
}

impl UiState {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            selected_currency: currency.into(),
            amount_input: String::new(),
            ticker_visible: false,
            in_flight: false,
        }
    }

    pub fn selected_currency(&self) -> &str {
        &self.selected_currency
    }

    pub fn amount_input(&self) -> &str {
        &self.amount_input
    }

    pub fn ticker_visible(&self) -> bool {
        self.ticker_visible
    }

    /// True while a deposit or withdraw awaits confirmation.
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }
}

/// Everything a connected front end displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    /// EIP-55 checksummed account.
    pub account: String,
    /// `None` until the first successful balance fetch.
    pub balance_display: Option<String>,
    pub currency: String,
    pub currencies: Vec<String>,
    pub controls_enabled: bool,
    /// Present only while the ticker is toggled on.
    pub ticker: Option<Vec<String>>,
}

/// Render model derived from the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    InstallWallet { message: &'static str },
    ConnectPrompt,
    /// Discovery or authorization is in progress.
    Connecting,
    Dashboard(Dashboard),
}

pub struct AtmApp<P, B: ContractBinder<P>> {
    // Written only by `start` and `connect`; submissions hold a read lock.
    session: RwLock<WalletSession<P, B>>,
    // Never borrowed across an await.
    tracker: RefCell<BalanceTracker>,
    coordinator: TransactionCoordinator,
    rates: RateTable,
    ui: RefCell<UiState>,
}

/// Clears the in-flight flag when a submission ends, however it ends.
struct InFlight<'a>(&'a RefCell<UiState>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.borrow_mut().in_flight = false;
    }
}

impl<P> AtmApp<P, RpcContractBinder>
where
    P: WalletProvider + Clone,
{
    /// App bound over the wallet's own JSON-RPC surface.
    pub fn from_config(injected: Option<P>, config: &AtmConfig) -> Result<Self, ClientError> {
        Self::new(injected, RpcContractBinder::from_config(config), config)
    }
}

impl<P, B> AtmApp<P, B>
where
    P: WalletProvider + Clone,
    B: ContractBinder<P>,
{
    pub fn new(injected: Option<P>, binder: B, config: &AtmConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let target = ContractTarget::from_config(config)?;

        Ok(Self {
            session: RwLock::new(WalletSession::discover(injected, binder, target)),
            tracker: RefCell::new(BalanceTracker::new()),
            coordinator: TransactionCoordinator::from_config(config),
            rates: config.rate_table()?,
            ui: RefCell::new(UiState::new(config.default_currency.clone())),
        })
    }

    /// Snapshot of the UI fields.
    pub fn ui(&self) -> UiState {
        self.ui.borrow().clone()
    }

    pub fn balance(&self) -> Option<Balance> {
        self.tracker.borrow().balance()
    }

    /// `None` while a connect is in progress.
    pub fn session_state(&self) -> Option<SessionState> {
        self.session.try_read().ok().map(|session| session.state())
    }

    /// Discovers an already-authorized account and, when there is one,
    /// binds the contract and fetches the balance.
    pub async fn start(&self) -> Result<SessionState, ClientError> {
        let state = {
            let mut session = self.session.write().await;
            if session.discover_accounts().await.is_some() {
                session.bind_contract()?;
            }
            session.state()
        };

        if state == SessionState::Connected {
            self.refresh_if_unknown().await?;
        }
        Ok(state)
    }

    /// User-initiated connect. Always re-reads the balance, since the
    /// authorized account may have changed.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.session.write().await.authorize().await?;
        self.refresh().await?;
        Ok(())
    }

    /// Fetches the balance only when none is known yet.
    pub async fn refresh_if_unknown(&self) -> Result<Option<Balance>, ClientError> {
        if let Some(balance) = self.tracker.borrow().balance() {
            return Ok(Some(balance));
        }
        self.refresh().await
    }

    async fn refresh(&self) -> Result<Option<Balance>, ClientError> {
        let session = self.session.read().await;
        let mut tracker = self.tracker.borrow().clone();

        let fetched = tracker.refresh(session.contract()).await?;
        if fetched.is_some() {
            *self.tracker.borrow_mut() = tracker;
        }
        Ok(fetched)
    }

    pub async fn deposit(&self) -> Result<Option<TransactionReceipt>, ClientError> {
        self.submit(TransactionKind::Deposit).await
    }

    pub async fn withdraw(&self) -> Result<Option<TransactionReceipt>, ClientError> {
        self.submit(TransactionKind::Withdraw).await
    }

    async fn submit(&self, kind: TransactionKind) -> Result<Option<TransactionReceipt>, ClientError> {
        let intent = {
            let mut ui = self.ui.borrow_mut();
            if ui.in_flight {
                log::debug!("{kind} ignored: a transaction is already pending");
                return Ok(None);
            }
            ui.in_flight = true;
            TransactionIntent {
                kind,
                amount: ui.amount_input.trim().to_string(),
            }
        };
        let _in_flight = InFlight(&self.ui);

        let session = self.session.read().await;
        let mut tracker = self.tracker.borrow().clone();
        let outcome = self.coordinator.submit(&*session, &mut tracker, intent).await;

        match &outcome {
            Ok(Some(_)) => *self.tracker.borrow_mut() = tracker,
            Ok(None) => {}
            Err(e) => log::warn!("{kind} failed: {e}"),
        }
        outcome
    }

    pub fn select_currency(&self, currency: &str) -> Result<(), ClientError> {
        if !self.rates.contains(currency) {
            return Err(ClientError::UnknownCurrency(currency.to_string()));
        }
        self.ui.borrow_mut().selected_currency = currency.to_string();
        Ok(())
    }

    pub fn set_amount_input(&self, text: impl Into<String>) {
        self.ui.borrow_mut().amount_input = text.into();
    }

    /// Flips ticker visibility and returns the new value.
    pub fn toggle_price_ticker(&self) -> bool {
        let mut ui = self.ui.borrow_mut();
        ui.ticker_visible = !ui.ticker_visible;
        ui.ticker_visible
    }

    pub fn view(&self) -> View {
        let Ok(session) = self.session.try_read() else {
            return View::Connecting;
        };

        let account = match session.state() {
            SessionState::NoProvider => {
                return View::InstallWallet {
                    message: INSTALL_WALLET_MESSAGE,
                }
            }
            SessionState::ProviderFound | SessionState::AccountDiscovered => {
                return View::ConnectPrompt
            }
            SessionState::Connected => match session.account() {
                Some(account) => account,
                None => return View::ConnectPrompt,
            },
        };

        let ui = self.ui.borrow();
        let balance_display = self.tracker.borrow().balance().and_then(|balance| {
            display_with_code(&balance, &self.rates, &ui.selected_currency)
                .map_err(|e| log::warn!("cannot display balance: {e}"))
                .ok()
        });

        View::Dashboard(Dashboard {
            account: to_checksum(&account),
            balance_display,
            currency: ui.selected_currency.clone(),
            currencies: self.rates.currencies().map(str::to_string).collect(),
            controls_enabled: !ui.in_flight,
            ticker: ui.ticker_visible.then(|| self.rates.price_ticker()),
        })
    }
}
