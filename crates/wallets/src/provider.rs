use std::{fmt, sync::Arc};

use alloy_primitives::Address;
use async_trait::async_trait;
use petshop_common::PetshopConfig;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{error::RpcError, request::WalletRequest, rpc::RpcWalletProvider};

/// Stream of account lists reported by the wallet. An empty list means the wallet no longer
/// exposes any account.
pub type AccountEvents = mpsc::UnboundedReceiver<Vec<Address>>;

/// A provider shared between the connector and the contract gateway.
pub type SharedProvider = Arc<dyn WalletProvider>;

/// The injected wallet provider.
#[async_trait]
pub trait WalletProvider: fmt::Debug + Send + Sync {
    /// Sends a request to the wallet.
    async fn request(&self, request: WalletRequest) -> Result<Value, RpcError>;

    /// Subscribes to account changes.
    ///
    /// Every call creates a new subscription, callers that need a single listener must call
    /// this once.
    fn subscribe_accounts(&self) -> AccountEvents;
}

/// Probes the environment for a wallet.
///
/// Returns `None` when no wallet endpoint is configured.
pub fn detect_provider(config: &PetshopConfig) -> Result<Option<SharedProvider>, url::ParseError> {
    let Some(url) = config.wallet_url.as_deref() else {
        debug!("no wallet endpoint configured");
        return Ok(None);
    };
    let account = config.account.as_deref().map(str::parse::<Address>).transpose().ok().flatten();
    if config.account.is_some() && account.is_none() {
        warn!(account = ?config.account, "ignoring invalid account");
    }
    let provider = RpcWalletProvider::new(url)?
        .with_account(account)
        .with_poll_interval(config.poll_interval());
    Ok(Some(Arc::new(provider)))
}
