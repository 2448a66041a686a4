//! Deployment of the pet adoption contract.
//!
//! [`Deployer`] sends the creation transaction for the compiled contract artifact and records the
//! resulting address in the contracts directory read by the `petshop` client.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

use alloy_dyn_abi::{DynSolValue, JsonAbiExt};
use alloy_network::{EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_provider::{PendingTransactionError, Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::TransportError;
use async_trait::async_trait;
use petshop_common::{
    ArtifactStore, ContractArtifact, NetworkConfig, PetshopConfig,
    artifacts::ArtifactError,
    config::NetworkError,
};
use std::path::PathBuf;
use url::Url;

// Only used by the binary.
use clap as _;
use eyre as _;
use petshop_cli as _;
use tokio as _;

/// Errors raised while deploying.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("invalid url `{url}` for network `{network}`: {source}")]
    Url { network: String, url: String, source: url::ParseError },
    #[error("failed to encode the constructor arguments: {0}")]
    Constructor(#[from] alloy_dyn_abi::Error),
    #[error("network `{network}` expects chain {expected}, but the node is on chain {actual}")]
    ChainMismatch { network: String, expected: u64, actual: u64 },
    #[error("no private key given and the node has no unlocked account")]
    NoAccounts,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    PendingTransaction(#[from] PendingTransactionError),
    #[error("transaction {0} did not create a contract")]
    NoContractAddress(TxHash),
}

/// The outcome of a successful deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployedContract {
    pub address: Address,
    pub deployer: Address,
    pub tx_hash: TxHash,
    /// The written `contract-address-<network>.json`.
    pub address_file: PathBuf,
    /// The copied contract artifact.
    pub artifact_file: PathBuf,
}

/// Deploys the configured contract to one network.
#[derive(Clone, Debug)]
pub struct Deployer {
    network: String,
    target: NetworkConfig,
    contract_name: String,
    artifact: ContractArtifact,
    pets_count: u64,
    store: ArtifactStore,
}

impl Deployer {
    /// Resolves `network` and reads the compiled artifact named by `config`.
    pub fn new(config: &PetshopConfig, network: &str) -> Result<Self, DeployError> {
        let target = config.network(network)?.clone();
        let artifact = ContractArtifact::read_deployable(&config.artifact)?;
        Ok(Self {
            network: network.to_string(),
            target,
            contract_name: config.contract_name.clone(),
            artifact,
            pets_count: config.pets_count,
            store: ArtifactStore::new(&config.contracts_dir),
        })
    }

    /// The network being deployed to.
    pub fn network(&self) -> &str {
        &self.network
    }

    /// The creation bytecode followed by the encoded constructor arguments.
    pub fn creation_code(&self) -> Result<Bytes, DeployError> {
        let mut code = self.artifact.bytecode.to_vec();
        if let Some(constructor) = self.artifact.abi.constructor() {
            let args = [DynSolValue::Uint(U256::from(self.pets_count), 256)];
            code.extend(constructor.abi_encode_input(&args)?);
        }
        Ok(code.into())
    }

    /// Opens the network's endpoint. Transactions are signed with `signer` if given, otherwise
    /// the node signs them.
    pub fn connect(
        &self,
        signer: Option<PrivateKeySigner>,
    ) -> Result<Box<dyn DeployNode>, DeployError> {
        let url: Url = self.target.url.parse().map_err(|source| DeployError::Url {
            network: self.network.clone(),
            url: self.target.url.clone(),
            source,
        })?;
        info!(network = %self.network, %url, "connecting to node");
        Ok(match signer {
            Some(signer) => Box::new(RpcNode(
                ProviderBuilder::new().wallet(EthereumWallet::from(signer)).connect_http(url),
            )),
            None => Box::new(RpcNode(ProviderBuilder::new().connect_http(url))),
        })
    }

    /// Checks that the node runs the network's chain and picks the deployer: `signer` if given,
    /// otherwise the node's first unlocked account.
    pub async fn resolve_deployer(
        &self,
        node: &dyn DeployNode,
        signer: Option<Address>,
    ) -> Result<Address, DeployError> {
        if let Some(expected) = self.target.chain_id {
            let actual = node.chain_id().await?;
            if actual != expected {
                return Err(DeployError::ChainMismatch {
                    network: self.network.clone(),
                    expected,
                    actual,
                });
            }
        }
        let from = match signer {
            Some(from) => from,
            None => node.accounts().await?.first().copied().ok_or(DeployError::NoAccounts)?,
        };
        debug!(%from, "selected deployer");
        Ok(from)
    }

    /// Sends the creation transaction from `from` and records the deployed address.
    pub async fn deploy_from(
        &self,
        node: &dyn DeployNode,
        from: Address,
    ) -> Result<DeployedContract, DeployError> {
        let receipt = node.create(from, self.creation_code()?).await?;
        let tx_hash = receipt.tx_hash;
        let address = receipt.contract_address.ok_or(DeployError::NoContractAddress(tx_hash))?;
        info!(contract = %self.contract_name, %address, ?tx_hash, "contract deployed");

        let (address_file, artifact_file) =
            self.store.write_deployment(&self.network, &self.contract_name, address, &self.artifact)?;
        Ok(DeployedContract { address, deployer: from, tx_hash, address_file, artifact_file })
    }

    /// Connects, picks the deployer and deploys.
    pub async fn deploy(
        &self,
        signer: Option<PrivateKeySigner>,
    ) -> Result<DeployedContract, DeployError> {
        let signer_address = signer.as_ref().map(PrivateKeySigner::address);
        let node = self.connect(signer)?;
        self.deploy_with(node.as_ref(), signer_address).await
    }

    /// Picks the deployer and deploys through `node`.
    pub async fn deploy_with(
        &self,
        node: &dyn DeployNode,
        signer: Option<Address>,
    ) -> Result<DeployedContract, DeployError> {
        let from = self.resolve_deployer(node, signer).await?;
        self.deploy_from(node, from).await
    }
}

/// The node operations a deployment needs.
#[async_trait]
pub trait DeployNode: Send + Sync {
    /// The chain id the node runs.
    async fn chain_id(&self) -> Result<u64, DeployError>;

    /// The node's unlocked accounts.
    async fn accounts(&self) -> Result<Vec<Address>, DeployError>;

    /// Sends a contract creation transaction and waits for its receipt.
    async fn create(&self, from: Address, code: Bytes) -> Result<CreationReceipt, DeployError>;
}

/// The mined contract creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreationReceipt {
    pub tx_hash: TxHash,
    /// Unset if the transaction did not create a contract.
    pub contract_address: Option<Address>,
}

/// A [`DeployNode`] reached through an alloy [`Provider`].
#[derive(Clone, Debug)]
pub struct RpcNode<P>(pub P);

#[async_trait]
impl<P: Provider> DeployNode for RpcNode<P> {
    async fn chain_id(&self) -> Result<u64, DeployError> {
        Ok(self.0.get_chain_id().await?)
    }

    async fn accounts(&self) -> Result<Vec<Address>, DeployError> {
        Ok(self.0.get_accounts().await?)
    }

    async fn create(&self, from: Address, code: Bytes) -> Result<CreationReceipt, DeployError> {
        let tx = TransactionRequest::default().with_deploy_code(code).from(from);
        let receipt = self.0.send_transaction(tx).await?.get_receipt().await?;
        Ok(CreationReceipt {
            tx_hash: receipt.transaction_hash,
            contract_address: receipt.contract_address,
        })
    }
}
