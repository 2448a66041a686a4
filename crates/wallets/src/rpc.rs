use std::time::Duration;

use alloy_primitives::Address;
use alloy_provider::{Provider, RootProvider};
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use url::Url;

use crate::{
    error::RpcError,
    provider::{AccountEvents, WalletProvider},
    request::{self, WalletRequest},
};

/// A [`WalletProvider`] backed by a JSON-RPC node with unlocked accounts, such as anvil or a
/// hardhat node.
///
/// The node signs `eth_sendTransaction` itself. Wallet-only methods are emulated:
///
/// - `eth_requestAccounts` returns the node's accounts, narrowed to the configured account.
/// - `wallet_switchEthereumChain` succeeds only if the node already runs the requested chain,
///   otherwise it fails with [`RpcError::UNRECOGNIZED_CHAIN`].
/// - account changes are detected by polling `eth_accounts`.
#[derive(Clone, Debug)]
pub struct RpcWalletProvider {
    provider: RootProvider,
    account: Option<Address>,
    poll_interval: Duration,
}

impl RpcWalletProvider {
    /// Creates a provider for the node at `url`.
    pub fn new(url: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(url)?;
        Ok(Self {
            provider: RootProvider::new_http(url),
            account: None,
            poll_interval: Duration::from_millis(500),
        })
    }

    /// Only expose `account`, as a wallet with a selected account would.
    pub fn with_account(mut self, account: Option<Address>) -> Self {
        self.account = account;
        self
    }

    /// Sets the interval used to poll for account changes.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn raw(&self, method: &'static str, params: Value) -> Result<Value, RpcError> {
        trace!(method, %params, "wallet request");
        self.provider
            .raw_request::<_, Value>(method.into(), params)
            .await
            .map_err(RpcError::from_transport)
    }

    async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        let value = self.raw("eth_accounts", json!([])).await?;
        let accounts = request::accounts(value)
            .map_err(|err| RpcError::new(RpcError::INTERNAL, err.to_string()))?;
        Ok(match self.account {
            Some(selected) => accounts.into_iter().filter(|acc| *acc == selected).collect(),
            None => accounts,
        })
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<Value, RpcError> {
        let value = self.raw("eth_chainId", json!([])).await?;
        let current = request::chain_id(value)
            .map_err(|err| RpcError::new(RpcError::INTERNAL, err.to_string()))?;
        if current == chain_id {
            Ok(Value::Null)
        } else {
            Err(RpcError::unrecognized_chain(chain_id))
        }
    }
}

#[async_trait]
impl WalletProvider for RpcWalletProvider {
    async fn request(&self, request: WalletRequest) -> Result<Value, RpcError> {
        match request {
            WalletRequest::RequestAccounts | WalletRequest::Accounts => {
                Ok(json!(self.accounts().await?))
            }
            WalletRequest::SwitchChain { chain_id } => self.switch_chain(chain_id).await,
            other => self.raw(other.method(), other.params()).await,
        }
    }

    fn subscribe_accounts(&self) -> AccountEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        let this = self.clone();
        tokio::spawn(async move {
            let mut last = this.accounts().await.ok();
            let mut interval = tokio::time::interval(this.poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.is_closed() {
                    break;
                }
                match this.accounts().await {
                    Ok(accounts) if last.as_ref() != Some(&accounts) => {
                        debug!(?accounts, "wallet accounts changed");
                        if tx.send(accounts.clone()).is_err() {
                            break;
                        }
                        last = Some(accounts);
                    }
                    Ok(_) => {}
                    Err(err) => debug!(%err, "failed to poll wallet accounts"),
                }
            }
        });
        rx
    }
}
