//! Typed access to the deployed adoption contract.
//!
//! Every call goes through the connected wallet: reads are `eth_call`s and adoptions are
//! `eth_sendTransaction`s from the bound account, so the wallet stays the only signer.

use std::{collections::BTreeSet, fmt, time::Duration};

use alloy_dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy_json_abi::{Function, JsonAbi};
use alloy_primitives::{Address, Bytes, TxHash, U64, U256};
use alloy_rpc_types::{BlockNumberOrTag, TransactionInput, TransactionRequest};
use petshop_common::{ArtifactStore, Deployment, PetId, PetshopConfig, artifacts::ArtifactError};
use petshop_wallets::{RpcError, SharedProvider, WalletRequest};
use serde::Deserialize;

const ADOPT_PET: &str = "adoptPet";
const GET_ALL_ADOPTED_PETS: &str = "getAllAdoptedPets";

/// Errors when binding the contract to an account.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Artifacts(#[from] ArtifactError),
    #[error("contract ABI has no `{0}` function")]
    MissingFunction(&'static str),
}

/// Reading the adopted pets failed.
#[derive(Debug, thiserror::Error)]
pub enum ReadFailure {
    #[error("getAllAdoptedPets call failed: {0}")]
    Rpc(RpcError),
    #[error("invalid getAllAdoptedPets response: {0}")]
    Response(#[from] serde_json::Error),
    #[error(transparent)]
    Abi(#[from] alloy_dyn_abi::Error),
    #[error("getAllAdoptedPets returned {0:?} instead of a list of ids")]
    Shape(DynSolValue),
    #[error("adopted pet id {0} does not fit in 64 bits")]
    OutOfRange(U256),
}

/// An adoption that did not go through.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TxFailure {
    /// The wallet refused to send the transaction.
    #[error("{reason}")]
    Rejected { reason: String },
    /// The transaction was mined with a failure status.
    #[error("{reason}")]
    Reverted { tx_hash: TxHash, reason: String },
    /// The receipt could not be fetched.
    #[error("failed to fetch receipt of {tx_hash}: {reason}")]
    Receipt { tx_hash: TxHash, reason: String },
}

impl TxFailure {
    /// The reason shown to the user.
    pub fn reason(&self) -> &str {
        match self {
            Self::Rejected { reason }
            | Self::Reverted { reason, .. }
            | Self::Receipt { reason, .. } => reason,
        }
    }

    fn rejected(reason: impl fmt::Display) -> Self {
        Self::Rejected { reason: reason.to_string() }
    }
}

/// A mined, successful adoption.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    #[serde(default)]
    block_number: Option<U64>,
    #[serde(default)]
    status: Option<U64>,
}

/// Locates the deployment for the configured network and binds it to accounts.
#[derive(Clone, Debug)]
pub struct ContractGateway {
    store: ArtifactStore,
    network: String,
    contract: String,
    poll_interval: Duration,
}

impl ContractGateway {
    /// Creates a gateway for the network and contract named in `config`.
    pub fn new(config: &PetshopConfig) -> Self {
        Self {
            store: ArtifactStore::new(&config.contracts_dir),
            network: config.network.clone(),
            contract: config.contract_name.clone(),
            poll_interval: config.poll_interval(),
        }
    }

    /// Reads the deployment artifacts and binds the contract to `account`.
    ///
    /// Artifacts are read again on every call, a new account always gets a fresh handle.
    pub fn initialize(
        &self,
        provider: SharedProvider,
        account: Address,
    ) -> Result<GatewayHandle, GatewayError> {
        let deployment = self.store.read_deployment(&self.network, &self.contract)?;
        let handle = GatewayHandle::new(provider, &deployment, account, self.poll_interval)?;
        debug!(network = %self.network, contract = %deployment.address, %account, "bound contract");
        Ok(handle)
    }
}

/// The contract bound to one account. Never mutated after creation.
#[derive(Clone, Debug)]
pub struct GatewayHandle {
    provider: SharedProvider,
    account: Address,
    contract: Address,
    adopt_pet: Function,
    get_all_adopted_pets: Function,
    poll_interval: Duration,
}

impl GatewayHandle {
    /// Binds `deployment` to `account`, checking that the ABI exposes both contract methods.
    pub fn new(
        provider: SharedProvider,
        deployment: &Deployment,
        account: Address,
        poll_interval: Duration,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            provider,
            account,
            contract: deployment.address,
            adopt_pet: function(&deployment.abi, ADOPT_PET)?,
            get_all_adopted_pets: function(&deployment.abi, GET_ALL_ADOPTED_PETS)?,
            poll_interval,
        })
    }

    /// The account transactions are sent from.
    pub fn account(&self) -> Address {
        self.account
    }

    /// The contract address.
    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Returns the ids of all pets adopted on-chain.
    pub async fn fetch_adopted(&self) -> Result<BTreeSet<PetId>, ReadFailure> {
        let input = self.get_all_adopted_pets.abi_encode_input(&[])?;
        let req = WalletRequest::Call { tx: self.tx(input), block: BlockNumberOrTag::Latest };
        let output = self.provider.request(req).await.map_err(ReadFailure::Rpc)?;
        let output: Bytes = serde_json::from_value(output)?;

        let mut values = self.get_all_adopted_pets.abi_decode_output(&output)?;
        let ids = match values.pop() {
            Some(DynSolValue::Array(ids)) if values.is_empty() => ids,
            Some(other) => return Err(ReadFailure::Shape(other)),
            None => return Ok(BTreeSet::new()),
        };
        ids.into_iter()
            .map(|id| match id {
                DynSolValue::Uint(id, _) => {
                    u64::try_from(id).map_err(|_| ReadFailure::OutOfRange(id))
                }
                other => Err(ReadFailure::Shape(other)),
            })
            .collect()
    }

    /// Sends `adoptPet(pet)` and returns the transaction hash without waiting for it.
    pub async fn send_adoption(&self, pet: PetId) -> Result<TxHash, TxFailure> {
        let tx = self.adopt_tx(pet)?;
        let hash = self
            .provider
            .request(WalletRequest::SendTransaction(tx))
            .await
            .map_err(|err| TxFailure::Rejected { reason: err.reason() })?;
        let hash = serde_json::from_value(hash).map_err(TxFailure::rejected)?;
        debug!(pet, ?hash, "adoption sent");
        Ok(hash)
    }

    /// Polls for the receipt of an adoption until it is mined.
    ///
    /// A failed transaction is replayed at its block to recover the revert reason.
    pub async fn confirm(&self, pet: PetId, tx_hash: TxHash) -> Result<TxReceipt, TxFailure> {
        let receipt_err = |reason: String| TxFailure::Receipt { tx_hash, reason };
        let receipt = loop {
            let receipt = self
                .provider
                .request(WalletRequest::TransactionReceipt(tx_hash))
                .await
                .map_err(|err| receipt_err(err.reason()))?;
            if !receipt.is_null() {
                break serde_json::from_value::<RawReceipt>(receipt)
                    .map_err(|err| receipt_err(err.to_string()))?;
            }
            trace!(?tx_hash, "receipt not available yet");
            tokio::time::sleep(self.poll_interval).await;
        };

        let block_number = receipt.block_number.map(|n| n.to::<u64>());
        if receipt.status.is_some_and(|status| status.is_zero()) {
            let reason = self.revert_reason(pet, block_number).await;
            warn!(pet, ?tx_hash, %reason, "adoption reverted");
            return Err(TxFailure::Reverted { tx_hash, reason });
        }
        Ok(TxReceipt { tx_hash, block_number })
    }

    /// Sends an adoption and waits for it to be mined.
    pub async fn submit(&self, pet: PetId) -> Result<TxReceipt, TxFailure> {
        let tx_hash = self.send_adoption(pet).await?;
        self.confirm(pet, tx_hash).await
    }

    async fn revert_reason(&self, pet: PetId, block_number: Option<u64>) -> String {
        const UNKNOWN: &str = "transaction reverted";
        let Ok(tx) = self.adopt_tx(pet) else { return UNKNOWN.to_string() };
        let block = block_number.map_or(BlockNumberOrTag::Latest, BlockNumberOrTag::Number);
        match self.provider.request(WalletRequest::Call { tx, block }).await {
            Err(err) => err.reason(),
            Ok(_) => UNKNOWN.to_string(),
        }
    }

    fn adopt_tx(&self, pet: PetId) -> Result<TransactionRequest, TxFailure> {
        let input = self
            .adopt_pet
            .abi_encode_input(&[DynSolValue::Uint(U256::from(pet), 256)])
            .map_err(TxFailure::rejected)?;
        Ok(self.tx(input))
    }

    fn tx(&self, input: Vec<u8>) -> TransactionRequest {
        TransactionRequest::default()
            .from(self.account)
            .to(self.contract)
            .input(TransactionInput::new(input.into()))
    }
}

fn function(abi: &JsonAbi, name: &'static str) -> Result<Function, GatewayError> {
    abi.function(name)
        .and_then(|overloads| overloads.first())
        .cloned()
        .ok_or(GatewayError::MissingFunction(name))
}
