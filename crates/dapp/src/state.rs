//! Session state of the client.
//!
//! [`AppState`] is a plain value: [`AppState::reduce`] consumes it together with an [`Action`]
//! and returns the next state plus the [`Effect`]s the event loop has to run. Effect outcomes
//! come back as actions tagged with the session generation that requested them, results of an
//! older generation are dropped.

use std::{collections::BTreeSet, sync::Arc};

use alloy_primitives::{Address, TxHash};
use petshop_common::{Catalog, PetId};
use petshop_wallets::ConnectionError;

use crate::gateway::{GatewayHandle, TxFailure, TxReceipt};

/// Inputs to the reducer.
#[derive(Debug)]
pub enum Action {
    /// The environment was probed for a wallet.
    Probed { wallet: bool },
    /// The user asked to connect the wallet.
    ConnectRequested,
    /// The wallet connector finished.
    Connected(Result<Address, ConnectionError>),
    /// The wallet reported a new account list.
    AccountsChanged(Vec<Address>),
    /// The catalog finished loading.
    CatalogLoaded(Result<Arc<Catalog>, String>),
    /// The contract was bound to the session's account.
    GatewayReady { generation: u64, result: Result<Arc<GatewayHandle>, String> },
    /// The on-chain adoption set was read.
    AdoptedLoaded { generation: u64, result: Result<BTreeSet<PetId>, String> },
    /// The user asked to adopt a pet.
    AdoptRequested(PetId),
    /// The wallet accepted the adoption transaction.
    AdoptionSent { generation: u64, pet: PetId, tx_hash: TxHash },
    /// The adoption transaction was mined or failed.
    AdoptionResolved { generation: u64, pet: PetId, result: Result<TxReceipt, TxFailure> },
    /// The user dismissed the transaction error.
    DismissError,
}

/// Work requested by the reducer.
#[derive(Clone, Debug)]
pub enum Effect {
    /// Load the catalog.
    LoadCatalog,
    /// Run the wallet connector.
    Connect,
    /// Bind the contract to `address`.
    Initialize { generation: u64, address: Address },
    /// Read the adoption set.
    FetchAdopted { generation: u64, gateway: Arc<GatewayHandle> },
    /// Send an adoption and wait for it.
    Submit { generation: u64, gateway: Arc<GatewayHandle>, pet: PetId },
}

/// The single in-flight adoption.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingTransaction {
    pub pet: PetId,
    /// Set once the wallet returns the hash.
    pub tx_hash: Option<TxHash>,
}

/// A connected account and everything fetched for it.
#[derive(Clone, Debug)]
pub struct Session {
    pub generation: u64,
    pub address: Address,
    pub gateway: Option<Arc<GatewayHandle>>,
    /// The contract is being bound to the account.
    pub initializing: bool,
    pub adopted: Option<BTreeSet<PetId>>,
    pub pending: Option<PendingTransaction>,
    pub tx_error: Option<String>,
}

impl Session {
    fn new(generation: u64, address: Address) -> Self {
        Self {
            generation,
            address,
            gateway: None,
            initializing: true,
            adopted: None,
            pending: None,
            tx_error: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub enum Phase {
    /// The environment has not been probed yet.
    #[default]
    Uninitialized,
    /// No wallet provider exists. Terminal.
    WalletMissing,
    /// A wallet exists but no account is connected.
    Disconnected,
    Connected(Session),
}

/// What the user currently sees, derived from [`AppState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Uninitialized,
    WalletMissing,
    Disconnected,
    /// Connected, waiting for the catalog, the contract or the adoption set.
    Loading,
    Browsing,
    AdoptionPending,
}

#[derive(Clone, Debug, Default)]
pub struct AppState {
    phase: Phase,
    catalog: Option<Arc<Catalog>>,
    catalog_loading: bool,
    connecting: bool,
    notice: Option<String>,
    generation: u64,
}

impl AppState {
    /// The current phase.
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// The connected session, if any.
    pub fn session(&self) -> Option<&Session> {
        match &self.phase {
            Phase::Connected(session) => Some(session),
            _ => None,
        }
    }

    /// The loaded catalog.
    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_deref()
    }

    /// The adoption set of the current session, once read.
    pub fn adopted(&self) -> Option<&BTreeSet<PetId>> {
        self.session().and_then(|session| session.adopted.as_ref())
    }

    /// The last connection or loading problem.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Returns true while the wallet connector runs.
    pub fn is_connecting(&self) -> bool {
        self.connecting
    }

    pub fn status(&self) -> Status {
        match &self.phase {
            Phase::Uninitialized => Status::Uninitialized,
            Phase::WalletMissing => Status::WalletMissing,
            Phase::Disconnected => Status::Disconnected,
            Phase::Connected(session) if session.pending.is_some() => Status::AdoptionPending,
            Phase::Connected(session) => {
                if self.catalog.is_some() && session.gateway.is_some() && session.adopted.is_some()
                {
                    Status::Browsing
                } else {
                    Status::Loading
                }
            }
        }
    }

    /// Applies `action`, returning the next state and the effects to run.
    pub fn reduce(mut self, action: Action) -> (Self, Vec<Effect>) {
        let mut effects = Vec::new();
        match action {
            Action::Probed { wallet } => {
                if !matches!(self.phase, Phase::Uninitialized) {
                    return (self, effects);
                }
                if wallet {
                    self.phase = Phase::Disconnected;
                    self.load_catalog(&mut effects);
                } else {
                    self.phase = Phase::WalletMissing;
                }
            }
            Action::ConnectRequested => match &mut self.phase {
                Phase::Disconnected if !self.connecting => {
                    self.connecting = true;
                    self.notice = None;
                    effects.push(Effect::Connect);
                }
                // Binding the contract failed, try again with the same session.
                Phase::Connected(session) if session.gateway.is_none() && !session.initializing => {
                    session.initializing = true;
                    self.notice = None;
                    effects.push(Effect::Initialize {
                        generation: session.generation,
                        address: session.address,
                    });
                }
                _ => {}
            },
            Action::Connected(result) => {
                self.connecting = false;
                match result {
                    Ok(address) => self.start_session(address, &mut effects),
                    Err(err) if err.is_terminal() => {
                        self.phase = Phase::WalletMissing;
                    }
                    Err(err) => {
                        debug!(%err, "connection failed");
                        self.notice = Some(err.to_string());
                    }
                }
            }
            Action::AccountsChanged(accounts) => {
                if matches!(self.phase, Phase::Uninitialized | Phase::WalletMissing) {
                    return (self, effects);
                }
                match accounts.first() {
                    None => {
                        if let Phase::Connected(session) = &self.phase {
                            debug!(address = %session.address, "wallet exposes no account");
                        }
                        self.phase = Phase::Disconnected;
                    }
                    Some(address) => self.start_session(*address, &mut effects),
                }
            }
            Action::CatalogLoaded(result) => {
                self.catalog_loading = false;
                match result {
                    Ok(catalog) => {
                        self.catalog = Some(catalog);
                        self.retain_catalog_ids();
                    }
                    Err(err) => self.notice = Some(format!("failed to load pets: {err}")),
                }
            }
            Action::GatewayReady { generation, result } => {
                let Some(session) = self.current(generation) else { return (self, effects) };
                session.initializing = false;
                match result {
                    Ok(gateway) => {
                        session.gateway = Some(Arc::clone(&gateway));
                        effects.push(Effect::FetchAdopted { generation, gateway });
                    }
                    Err(err) => self.notice = Some(format!("failed to load contract: {err}")),
                }
            }
            Action::AdoptedLoaded { generation, result } => {
                let Some(session) = self.current(generation) else { return (self, effects) };
                let ids = result.unwrap_or_else(|err| {
                    warn!(%err, "failed to read adopted pets");
                    BTreeSet::new()
                });
                session.adopted.get_or_insert_default().extend(ids);
                self.retain_catalog_ids();
            }
            Action::AdoptRequested(pet) => {
                if let Some(effect) = self.begin_adoption(pet) {
                    effects.push(effect);
                } else {
                    debug!(pet, status = ?self.status(), "ignoring adoption request");
                }
            }
            Action::AdoptionSent { generation, pet, tx_hash } => {
                let Some(session) = self.current(generation) else { return (self, effects) };
                if let Some(pending) = session.pending.as_mut().filter(|p| p.pet == pet) {
                    pending.tx_hash = Some(tx_hash);
                }
            }
            Action::AdoptionResolved { generation, pet, result } => {
                let Some(session) = self.current(generation) else { return (self, effects) };
                if session.pending.is_none_or(|pending| pending.pet != pet) {
                    return (self, effects);
                }
                session.pending = None;
                match result {
                    Ok(receipt) => {
                        debug!(pet, tx_hash = ?receipt.tx_hash, "adoption confirmed");
                        session.adopted.get_or_insert_default().insert(pet);
                    }
                    Err(err) => session.tx_error = Some(err.reason().to_string()),
                }
            }
            Action::DismissError => {
                if let Phase::Connected(session) = &mut self.phase {
                    session.tx_error = None;
                }
            }
        }
        (self, effects)
    }

    /// Replaces the session for `address`, unless it is already the connected one.
    fn start_session(&mut self, address: Address, effects: &mut Vec<Effect>) {
        if self.session().is_some_and(|session| session.address == address) {
            return;
        }
        self.generation += 1;
        let generation = self.generation;
        self.phase = Phase::Connected(Session::new(generation, address));
        self.notice = None;
        effects.push(Effect::Initialize { generation, address });
        self.load_catalog(effects);
    }

    fn load_catalog(&mut self, effects: &mut Vec<Effect>) {
        if self.catalog.is_none() && !self.catalog_loading {
            self.catalog_loading = true;
            effects.push(Effect::LoadCatalog);
        }
    }

    fn begin_adoption(&mut self, pet: PetId) -> Option<Effect> {
        if self.status() != Status::Browsing || !self.catalog.as_ref()?.contains(pet) {
            return None;
        }
        let Phase::Connected(session) = &mut self.phase else { return None };
        let gateway = Arc::clone(session.gateway.as_ref()?);
        if session.adopted.as_ref()?.contains(&pet) {
            return None;
        }
        session.pending = Some(PendingTransaction { pet, tx_hash: None });
        Some(Effect::Submit { generation: session.generation, gateway, pet })
    }

    /// The session, if it is still the one of `generation`.
    fn current(&mut self, generation: u64) -> Option<&mut Session> {
        match &mut self.phase {
            Phase::Connected(session) if session.generation == generation => Some(session),
            _ => {
                trace!(generation, "dropping stale result");
                None
            }
        }
    }

    fn retain_catalog_ids(&mut self) {
        let (Some(catalog), Phase::Connected(session)) = (&self.catalog, &mut self.phase) else {
            return;
        };
        if let Some(adopted) = &mut session.adopted {
            adopted.retain(|id| {
                let known = catalog.contains(*id);
                if !known {
                    debug!(id, "dropping adopted id missing from the catalog");
                }
                known
            });
        }
    }
}
