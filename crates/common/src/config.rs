//! Petshop configuration.
//!
//! Values are layered with [`figment`]: built-in defaults, then `petshop.toml` (or the file named
//! by `PETSHOP_CONFIG`), then `PETSHOP_*` environment variables. Callers may merge further
//! providers, such as CLI arguments, on top of [`PetshopConfig::figment`].

use figment::{
    Figment, Provider,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::PathBuf, time::Duration};

/// Chain id of a local hardhat or anvil node.
pub const LOCAL_CHAIN_ID: u64 = 31337;

/// Default RPC endpoint of a local development node.
pub const LOCALHOST_URL: &str = "http://127.0.0.1:8545";

/// Represents a failed attempt to extract [`PetshopConfig`] from a [`Figment`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("failed to extract petshop config: {0}")]
pub struct ExtractConfigError(#[from] pub figment::Error);

/// Errors when resolving a named network.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// The network is not declared under `[networks]`.
    #[error("unknown network `{name}`; known networks: {known}")]
    Unknown { name: String, known: String },
}

/// A deployment target declared under `[networks.<name>]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint of the network.
    pub url: String,
    /// Expected chain id, checked against the node before deploying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

/// Settings shared by the `petshop` client and the `petshop-deploy` utility.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PetshopConfig {
    /// Chain the client requires the wallet to be on.
    pub chain_id: u64,
    /// Network whose deployment artifacts the client reads.
    pub network: String,
    /// Endpoint of the wallet provider. No wallet is present when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_url: Option<String>,
    /// Account the wallet should select, defaults to the first account it reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    /// Path or http(s) URL of the pet catalog.
    pub catalog: String,
    /// Directory holding `contract-address-<network>.json` and `<contract>.json`.
    pub contracts_dir: PathBuf,
    /// Logical name of the contract in the artifact files.
    pub contract_name: String,
    /// Compiled contract artifact read by the deployer.
    pub artifact: PathBuf,
    /// Constructor argument of the adoption contract.
    pub pets_count: u64,
    /// Polling interval in milliseconds for receipts and account changes.
    pub poll_interval: u64,
    /// Named deployment targets.
    pub networks: BTreeMap<String, NetworkConfig>,
}

impl Default for PetshopConfig {
    fn default() -> Self {
        Self {
            chain_id: LOCAL_CHAIN_ID,
            network: "localhost".to_string(),
            wallet_url: None,
            account: None,
            catalog: "pets.json".to_string(),
            contracts_dir: PathBuf::from("contracts"),
            contract_name: "PetAdoption".to_string(),
            artifact: PathBuf::from("artifacts/contracts/PetAdoption.sol/PetAdoption.json"),
            pets_count: 5,
            poll_interval: 500,
            networks: BTreeMap::from([(
                "localhost".to_string(),
                NetworkConfig { url: LOCALHOST_URL.to_string(), chain_id: Some(LOCAL_CHAIN_ID) },
            )]),
        }
    }
}

impl PetshopConfig {
    /// The default name of the config file.
    pub const FILE_NAME: &'static str = "petshop.toml";

    /// Returns the default figment: defaults, the toml file, then the environment.
    pub fn figment() -> Figment {
        let file = Env::var_or("PETSHOP_CONFIG", Self::FILE_NAME);
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("PETSHOP_").ignore(&["CONFIG", "PRIVATE_KEY"]))
    }

    /// Loads the config from the default figment.
    pub fn load() -> Result<Self, ExtractConfigError> {
        Self::try_from(Self::figment())
    }

    /// Attempts to extract a `PetshopConfig` from `provider`.
    pub fn try_from<T: Provider>(provider: T) -> Result<Self, ExtractConfigError> {
        let figment = Figment::from(provider);
        trace!("load config with provider: {:?}", figment.metadata().collect::<Vec<_>>());
        Ok(figment.extract::<Self>()?)
    }

    /// Returns the named network.
    pub fn network(&self, name: &str) -> Result<&NetworkConfig, NetworkError> {
        self.networks.get(name).ok_or_else(|| NetworkError::Unknown {
            name: name.to_string(),
            known: self.networks.keys().cloned().collect::<Vec<_>>().join(", "),
        })
    }

    /// Returns the polling interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }
}
