//! The event loop driving [`AppState`].

use std::sync::Arc;

use petshop_common::{Catalog, CatalogSource, PetshopConfig};
use petshop_wallets::{AccountEvents, SharedProvider, WalletConnector};
use tokio::{sync::mpsc, task::JoinSet};

use crate::{
    gateway::ContractGateway,
    state::{Action, AppState, Effect},
    view::View,
};

/// Owns the state and runs the effects the reducer asks for.
///
/// Effects run as tasks on the current runtime, their results and the wallet's account events
/// are fed back into the reducer one at a time by [`next`](Self::next).
#[derive(Debug)]
pub struct App {
    state: AppState,
    connector: Arc<WalletConnector>,
    gateway: ContractGateway,
    catalog: CatalogSource,
    tasks: JoinSet<Action>,
    actions: mpsc::UnboundedReceiver<Action>,
    sender: mpsc::UnboundedSender<Action>,
    accounts: AccountEvents,
}

impl App {
    /// Creates the app and probes for a wallet.
    ///
    /// Must be called from within a tokio runtime, the catalog starts loading right away.
    pub fn new(config: &PetshopConfig, provider: Option<SharedProvider>) -> Self {
        let Ok(catalog) = config.catalog.parse::<CatalogSource>();
        let (connector, accounts) = WalletConnector::new(provider, config.chain_id);
        let (sender, actions) = mpsc::unbounded_channel();
        let mut app = Self {
            state: AppState::default(),
            connector: Arc::new(connector),
            gateway: ContractGateway::new(config),
            catalog,
            tasks: JoinSet::new(),
            actions,
            sender,
            accounts,
        };
        let wallet = app.connector.has_wallet();
        app.dispatch(Action::Probed { wallet });
        app
    }

    /// The current state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The view of the current state.
    pub fn view(&self) -> View {
        View::new(&self.state)
    }

    /// Applies `action` and starts the resulting effects.
    pub fn dispatch(&mut self, action: Action) {
        trace!(?action, "dispatch");
        let (state, effects) = std::mem::take(&mut self.state).reduce(action);
        self.state = state;
        for effect in effects {
            self.run(effect);
        }
    }

    /// Waits for the next effect result or account event and applies it.
    ///
    /// Returns false once nothing can produce further actions.
    pub async fn next(&mut self) -> bool {
        let action = tokio::select! {
            biased;
            Some(action) = self.actions.recv() => action,
            Some(joined) = self.tasks.join_next() => match joined {
                Ok(action) => action,
                Err(err) => {
                    error!(%err, "effect task failed");
                    return true;
                }
            },
            Some(accounts) = self.accounts.recv() => Action::AccountsChanged(accounts),
            else => return false,
        };
        self.dispatch(action);
        true
    }

    /// Applies actions until no effect is running.
    pub async fn settle(&mut self) {
        while !self.tasks.is_empty() || !self.actions.is_empty() {
            if !self.next().await {
                break;
            }
        }
    }

    /// Applies actions until `done` holds for the state.
    pub async fn wait_for(&mut self, mut done: impl FnMut(&AppState) -> bool) {
        while !done(&self.state) {
            if !self.next().await {
                break;
            }
        }
    }

    fn run(&mut self, effect: Effect) {
        debug!(?effect, "running effect");
        match effect {
            Effect::LoadCatalog => {
                let source = self.catalog.clone();
                self.tasks.spawn(async move {
                    let catalog = Catalog::load(&source).await;
                    Action::CatalogLoaded(catalog.map(Arc::new).map_err(|err| err.to_string()))
                });
            }
            Effect::Connect => {
                let connector = Arc::clone(&self.connector);
                self.tasks.spawn(async move { Action::Connected(connector.connect().await) });
            }
            Effect::Initialize { generation, address } => {
                let result = match self.connector.provider() {
                    Some(provider) => self
                        .gateway
                        .initialize(Arc::clone(provider), address)
                        .map(Arc::new)
                        .map_err(|err| err.to_string()),
                    None => Err("no wallet provider".to_string()),
                };
                let _ = self.sender.send(Action::GatewayReady { generation, result });
            }
            Effect::FetchAdopted { generation, gateway } => {
                self.tasks.spawn(async move {
                    let result = gateway.fetch_adopted().await.map_err(|err| err.to_string());
                    Action::AdoptedLoaded { generation, result }
                });
            }
            Effect::Submit { generation, gateway, pet } => {
                let sender = self.sender.clone();
                self.tasks.spawn(async move {
                    let result = match gateway.send_adoption(pet).await {
                        Ok(tx_hash) => {
                            let _ = sender.send(Action::AdoptionSent { generation, pet, tx_hash });
                            gateway.confirm(pet, tx_hash).await
                        }
                        Err(err) => Err(err),
                    };
                    Action::AdoptionResolved { generation, pet, result }
                });
            }
        }
    }
}
