use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use alloy_primitives::{Address, Bytes, TxHash, U256, keccak256};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{Revert, SolCall, SolError, SolValue, sol};
use async_trait::async_trait;
use parking_lot::Mutex;
use petshop_wallets::{AccountEvents, RpcError, WalletProvider, WalletRequest};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::accounts::{ALICE, CONTRACT};

sol! {
    /// The adoption contract's interface.
    interface PetAdoption {
        function adoptPet(uint256 adoptIdx) external;
        function getAllAdoptedPets() external view returns (uint256[] memory);
    }
}

/// A [`WalletProvider`] that emulates a browser wallet connected to a chain with the adoption
/// contract deployed.
///
/// Cloning shares the state, so tests keep a handle to steer the wallet while the client owns
/// another.
#[derive(Clone, Debug)]
pub struct MockWallet {
    inner: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    accounts: Vec<Address>,
    chain_id: u64,
    known_chains: BTreeSet<u64>,
    reject_connection: bool,
    reject_chain_switch: bool,

    contract: Address,
    pets_count: u64,
    adopted: Vec<u64>,
    read_error: Option<RpcError>,
    send_error: Option<RpcError>,
    revert_next: Option<String>,
    last_revert: Option<String>,

    hold_receipts: bool,
    txs: HashMap<TxHash, MinedTx>,
    nonce: u64,

    requests: Vec<WalletRequest>,
    subscriptions: usize,
    listeners: Vec<mpsc::UnboundedSender<Vec<Address>>>,
}

#[derive(Debug)]
struct MinedTx {
    from: Address,
    success: bool,
    released: bool,
}

impl Default for MockWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWallet {
    /// A wallet exposing [`ALICE`] on chain 31337 with the contract at [`CONTRACT`] and five
    /// pets.
    pub fn new() -> Self {
        Self::with_contract(CONTRACT)
    }

    /// Same as [`new`](Self::new), with the contract at `contract`.
    pub fn with_contract(contract: Address) -> Self {
        let state = State {
            accounts: vec![ALICE],
            chain_id: 31337,
            known_chains: BTreeSet::from([1, 31337]),
            contract,
            pets_count: 5,
            ..Default::default()
        };
        Self { inner: Arc::new(Mutex::new(state)) }
    }

    /// Replaces the exposed accounts without notifying listeners.
    pub fn set_accounts(&self, accounts: impl Into<Vec<Address>>) {
        self.inner.lock().accounts = accounts.into();
    }

    /// Sets the chain the wallet is currently on.
    pub fn set_chain_id(&self, chain_id: u64) {
        self.inner.lock().chain_id = chain_id;
    }

    /// Forgets every chain except the current one, switching fails with 4902.
    pub fn forget_other_chains(&self) {
        let mut state = self.inner.lock();
        state.known_chains = BTreeSet::from([state.chain_id]);
    }

    /// The user declines `eth_requestAccounts`.
    pub fn reject_connection(&self, reject: bool) {
        self.inner.lock().reject_connection = reject;
    }

    /// The user declines `wallet_switchEthereumChain`.
    pub fn reject_chain_switch(&self, reject: bool) {
        self.inner.lock().reject_chain_switch = reject;
    }

    /// Sets the pets recorded as adopted on-chain.
    pub fn set_adopted(&self, pets: impl IntoIterator<Item = u64>) {
        self.inner.lock().adopted = pets.into_iter().collect();
    }

    /// Pets recorded as adopted on-chain, in adoption order.
    pub fn adopted(&self) -> Vec<u64> {
        self.inner.lock().adopted.clone()
    }

    /// Makes every `eth_call` fail with `err`, `None` restores reads.
    pub fn fail_reads(&self, err: Option<RpcError>) {
        self.inner.lock().read_error = err;
    }

    /// Fails the next `eth_sendTransaction` with `err`.
    pub fn reject_next_send(&self, err: RpcError) {
        self.inner.lock().send_error = Some(err);
    }

    /// Mines the next transaction with a failure status and `reason` as its revert reason.
    pub fn revert_next(&self, reason: impl Into<String>) {
        self.inner.lock().revert_next = Some(reason.into());
    }

    /// While held, receipts of newly sent transactions are not returned.
    pub fn hold_receipts(&self, hold: bool) {
        self.inner.lock().hold_receipts = hold;
    }

    /// Makes all held receipts available.
    pub fn release_receipts(&self) {
        for tx in self.inner.lock().txs.values_mut() {
            tx.released = true;
        }
    }

    /// Changes the accounts and notifies every listener, like a user switching accounts.
    pub fn emit_accounts(&self, accounts: impl Into<Vec<Address>>) {
        let mut state = self.inner.lock();
        state.accounts = accounts.into();
        let accounts = state.accounts.clone();
        state.listeners.retain(|listener| listener.send(accounts.clone()).is_ok());
    }

    /// Number of account subscriptions ever created.
    pub fn subscriptions(&self) -> usize {
        self.inner.lock().subscriptions
    }

    /// Method names of all requests received so far.
    pub fn methods(&self) -> Vec<&'static str> {
        self.inner.lock().requests.iter().map(WalletRequest::method).collect()
    }

    /// Number of requests with the given method.
    pub fn count(&self, method: &str) -> usize {
        self.methods().into_iter().filter(|m| *m == method).count()
    }

    /// Senders of all transactions sent so far.
    pub fn senders(&self) -> Vec<Address> {
        self.inner
            .lock()
            .requests
            .iter()
            .filter_map(|req| match req {
                WalletRequest::SendTransaction(tx) => tx.from,
                _ => None,
            })
            .collect()
    }
}

impl State {
    fn call(&mut self, tx: &TransactionRequest) -> Result<Value, RpcError> {
        if let Some(err) = &self.read_error {
            return Err(err.clone());
        }
        let input = self.contract_input(tx)?;
        if let Ok(_call) = PetAdoption::getAllAdoptedPetsCall::abi_decode(&input) {
            let pets: Vec<U256> = self.adopted.iter().map(|pet| U256::from(*pet)).collect();
            return Ok(json!(Bytes::from((pets,).abi_encode_params())));
        }
        if let Ok(call) = PetAdoption::adoptPetCall::abi_decode(&input) {
            // Replaying an adoption only tells whether it would revert.
            return match self.adoption_error(call.adoptIdx) {
                Some(reason) => Err(revert(reason)),
                None => match self.last_revert.clone() {
                    Some(reason) => Err(revert(reason)),
                    None => Ok(json!("0x")),
                },
            };
        }
        Err(RpcError::new(RpcError::INTERNAL, "execution reverted"))
    }

    fn send(&mut self, tx: &TransactionRequest) -> Result<Value, RpcError> {
        if let Some(err) = self.send_error.take() {
            return Err(err);
        }
        let from = tx.from.ok_or_else(|| RpcError::new(-32602, "missing from"))?;
        if !self.accounts.contains(&from) {
            return Err(RpcError::new(RpcError::UNAUTHORIZED, "unknown account"));
        }
        let input = self.contract_input(tx)?;
        let call = PetAdoption::adoptPetCall::abi_decode(&input)
            .map_err(|err| RpcError::new(-32602, err.to_string()))?;

        let reverted = self.revert_next.take().or_else(|| self.adoption_error(call.adoptIdx));
        let success = reverted.is_none();
        if success {
            self.adopted.push(call.adoptIdx.to::<u64>());
        }
        self.last_revert = reverted;

        self.nonce += 1;
        let hash = keccak256(U256::from(self.nonce).to_be_bytes::<32>());
        self.txs.insert(hash, MinedTx { from, success, released: !self.hold_receipts });
        debug!(?hash, pet = %call.adoptIdx, success, "mock wallet mined adoption");
        Ok(json!(hash))
    }

    fn receipt(&self, hash: TxHash) -> Value {
        match self.txs.get(&hash) {
            Some(tx) if tx.released => json!({
                "transactionHash": hash,
                "blockNumber": format!("{:#x}", self.nonce),
                "from": tx.from,
                "to": self.contract,
                "status": if tx.success { "0x1" } else { "0x0" },
            }),
            _ => Value::Null,
        }
    }

    fn contract_input(&self, tx: &TransactionRequest) -> Result<Bytes, RpcError> {
        let to = tx.to.and_then(|kind| kind.to().copied());
        if to != Some(self.contract) {
            return Err(RpcError::new(RpcError::INTERNAL, "no contract at address"));
        }
        Ok(tx.input.input().cloned().unwrap_or_default())
    }

    fn adoption_error(&self, pet: U256) -> Option<String> {
        if pet >= U256::from(self.pets_count) {
            Some("Pet index out of bounds!".to_string())
        } else if self.adopted.iter().any(|adopted| U256::from(*adopted) == pet) {
            Some("Pet is already adopted".to_string())
        } else {
            None
        }
    }
}

fn revert(reason: String) -> RpcError {
    let data = Bytes::from(Revert { reason: reason.clone() }.abi_encode());
    RpcError::new(RpcError::INTERNAL, format!("execution reverted: {reason}")).with_data(json!(data))
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request(&self, request: WalletRequest) -> Result<Value, RpcError> {
        let mut state = self.inner.lock();
        state.requests.push(request.clone());
        match request {
            WalletRequest::RequestAccounts if state.reject_connection => {
                Err(RpcError::user_rejected())
            }
            WalletRequest::RequestAccounts | WalletRequest::Accounts => Ok(json!(state.accounts)),
            WalletRequest::ChainId => Ok(json!(format!("{:#x}", state.chain_id))),
            WalletRequest::SwitchChain { .. } if state.reject_chain_switch => {
                Err(RpcError::user_rejected())
            }
            WalletRequest::SwitchChain { chain_id } => {
                if state.known_chains.contains(&chain_id) {
                    state.chain_id = chain_id;
                    Ok(Value::Null)
                } else {
                    Err(RpcError::unrecognized_chain(chain_id))
                }
            }
            WalletRequest::Call { tx, .. } => state.call(&tx),
            WalletRequest::SendTransaction(tx) => state.send(&tx),
            WalletRequest::TransactionReceipt(hash) => Ok(state.receipt(hash)),
        }
    }

    fn subscribe_accounts(&self) -> AccountEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.inner.lock();
        state.subscriptions += 1;
        state.listeners.push(tx);
        rx
    }
}
