use alloy_primitives::Address;
use parking_lot::Mutex;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    error::ConnectionError,
    provider::{AccountEvents, SharedProvider},
    request::{self, WalletRequest},
};

/// Authorizes an account and keeps the wallet on the required chain.
///
/// The connector owns the only account-change subscription: it is registered on the first
/// successful [`connect`](Self::connect) and forwarded into the [`AccountEvents`] returned by
/// [`new`](Self::new). Later connects reuse it.
#[derive(Debug)]
pub struct WalletConnector {
    provider: Option<SharedProvider>,
    chain_id: u64,
    events: mpsc::UnboundedSender<Vec<Address>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl WalletConnector {
    /// Creates a connector for the probed `provider` that requires `chain_id`.
    pub fn new(provider: Option<SharedProvider>, chain_id: u64) -> (Self, AccountEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { provider, chain_id, events, listener: Mutex::new(None) }, rx)
    }

    /// Returns true if the environment has a wallet at all.
    pub fn has_wallet(&self) -> bool {
        self.provider.is_some()
    }

    /// The detected provider.
    pub fn provider(&self) -> Option<&SharedProvider> {
        self.provider.as_ref()
    }

    /// The chain the wallet is required to be on.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Returns true once the account-change listener is registered.
    pub fn is_listening(&self) -> bool {
        self.listener.lock().is_some()
    }

    /// Requests account access, switches the wallet to the required chain if needed and returns
    /// the primary account.
    pub async fn connect(&self) -> Result<Address, ConnectionError> {
        let provider = self.provider.as_ref().ok_or(ConnectionError::NoWalletDetected)?;

        let req = WalletRequest::RequestAccounts;
        let accounts = provider.request(req.clone()).await.map_err(|err| {
            if err.is_user_rejected() {
                ConnectionError::UserRejected
            } else {
                ConnectionError::Rpc(err)
            }
        })?;
        let accounts: Vec<Address> = request::decode(&req, accounts)?;
        let address = *accounts.first().ok_or(ConnectionError::NoAccounts)?;

        self.ensure_chain(provider).await?;
        self.register_listener(provider);

        info!(%address, chain_id = self.chain_id, "wallet connected");
        Ok(address)
    }

    async fn ensure_chain(&self, provider: &SharedProvider) -> Result<(), ConnectionError> {
        let req = WalletRequest::ChainId;
        let current = provider.request(req.clone()).await.map_err(ConnectionError::Rpc)?;
        let current = request::chain_id(current).map_err(|err| {
            ConnectionError::InvalidResponse { method: req.method(), reason: err.to_string() }
        })?;
        if current == self.chain_id {
            return Ok(());
        }

        warn!(from = current, to = self.chain_id, "wallet is on the wrong chain, switching");
        let chain_id = self.chain_id;
        match provider.request(WalletRequest::SwitchChain { chain_id }).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_user_rejected() => {
                Err(ConnectionError::ChainSwitchRejected { chain_id })
            }
            Err(err) => Err(ConnectionError::ChainSwitchFailed { chain_id, reason: err.reason() }),
        }
    }

    fn register_listener(&self, provider: &SharedProvider) {
        let mut listener = self.listener.lock();
        if listener.is_some() {
            return;
        }
        let mut accounts = provider.subscribe_accounts();
        let events = self.events.clone();
        *listener = Some(tokio::spawn(async move {
            while let Some(update) = accounts.recv().await {
                if events.send(update).is_err() {
                    break;
                }
            }
        }));
        debug!("registered account listener");
    }
}

impl Drop for WalletConnector {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get_mut().take() {
            listener.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RpcError, WalletProvider};
    use alloy_primitives::address;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::{
        collections::VecDeque,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    const ALICE: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const BOB: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");

    /// Answers requests from a fixed script and records the methods it saw.
    #[derive(Debug, Default)]
    struct Scripted {
        replies: Mutex<VecDeque<Result<Value, RpcError>>>,
        seen: Mutex<Vec<&'static str>>,
        subscriptions: AtomicUsize,
        senders: Mutex<Vec<mpsc::UnboundedSender<Vec<Address>>>>,
    }

    impl Scripted {
        fn new(replies: impl IntoIterator<Item = Result<Value, RpcError>>) -> Arc<Self> {
            Arc::new(Self { replies: Mutex::new(replies.into_iter().collect()), ..Default::default() })
        }

        fn seen(&self) -> Vec<&'static str> {
            self.seen.lock().clone()
        }
    }

    #[async_trait]
    impl WalletProvider for Scripted {
        async fn request(&self, request: WalletRequest) -> Result<Value, RpcError> {
            self.seen.lock().push(request.method());
            self.replies.lock().pop_front().expect("unexpected request")
        }

        fn subscribe_accounts(&self) -> AccountEvents {
            self.subscriptions.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::unbounded_channel();
            self.senders.lock().push(tx);
            rx
        }
    }

    fn connector(provider: &Arc<Scripted>) -> (WalletConnector, AccountEvents) {
        WalletConnector::new(Some(provider.clone() as SharedProvider), 31337)
    }

    #[tokio::test]
    async fn no_wallet_is_terminal() {
        let (connector, _events) = WalletConnector::new(None, 31337);
        let err = connector.connect().await.unwrap_err();
        assert_eq!(err, ConnectionError::NoWalletDetected);
        assert!(err.is_terminal());
        assert!(!connector.is_listening());
    }

    #[tokio::test]
    async fn connects_on_the_right_chain() {
        let wallet = Scripted::new([Ok(json!([ALICE, BOB])), Ok(json!("0x7a69"))]);
        let (connector, _events) = self::connector(&wallet);

        assert_eq!(connector.connect().await.unwrap(), ALICE);
        assert_eq!(wallet.seen(), ["eth_requestAccounts", "eth_chainId"]);
        assert!(connector.is_listening());
    }

    #[tokio::test]
    async fn switches_chain_when_mismatched() {
        let wallet = Scripted::new([Ok(json!([ALICE])), Ok(json!("0x1")), Ok(Value::Null)]);
        let (connector, _events) = self::connector(&wallet);

        assert_eq!(connector.connect().await.unwrap(), ALICE);
        assert_eq!(
            wallet.seen(),
            ["eth_requestAccounts", "eth_chainId", "wallet_switchEthereumChain"]
        );
    }

    #[tokio::test]
    async fn rejections() {
        let wallet = Scripted::new([Err(RpcError::user_rejected())]);
        let (connector, _events) = self::connector(&wallet);
        assert_eq!(connector.connect().await.unwrap_err(), ConnectionError::UserRejected);
        assert!(!connector.is_listening());

        let wallet =
            Scripted::new([Ok(json!([ALICE])), Ok(json!("0x1")), Err(RpcError::user_rejected())]);
        let (connector, _events) = self::connector(&wallet);
        assert_eq!(
            connector.connect().await.unwrap_err(),
            ConnectionError::ChainSwitchRejected { chain_id: 31337 }
        );

        let wallet = Scripted::new([
            Ok(json!([ALICE])),
            Ok(json!("0x1")),
            Err(RpcError::unrecognized_chain(31337)),
        ]);
        let (connector, _events) = self::connector(&wallet);
        let err = connector.connect().await.unwrap_err();
        assert!(
            matches!(err, ConnectionError::ChainSwitchFailed { chain_id: 31337, ref reason } if reason.contains("Unrecognized chain")),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn empty_account_list() {
        let wallet = Scripted::new([Ok(json!([]))]);
        let (connector, _events) = self::connector(&wallet);
        assert_eq!(connector.connect().await.unwrap_err(), ConnectionError::NoAccounts);
    }

    #[tokio::test]
    async fn listener_is_registered_once_and_forwards() {
        let wallet = Scripted::new([
            Ok(json!([ALICE])),
            Ok(json!("0x7a69")),
            Ok(json!([ALICE])),
            Ok(json!("0x7a69")),
        ]);
        let (connector, mut events) = connector(&wallet);

        connector.connect().await.unwrap();
        connector.connect().await.unwrap();
        assert_eq!(wallet.subscriptions.load(Ordering::SeqCst), 1);

        let sender = wallet.senders.lock()[0].clone();
        sender.send(vec![BOB]).unwrap();
        sender.send(vec![]).unwrap();
        assert_eq!(events.recv().await.unwrap(), [BOB]);
        assert_eq!(events.recv().await.unwrap(), Vec::<Address>::new());
    }
}
