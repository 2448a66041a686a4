use clap::Parser;
use figment::{
    Figment, Metadata, Profile, Provider,
    error::Kind::InvalidType,
    value::{Dict, Map, Value},
};
use petshop_common::{PetshopConfig, config::ExtractConfigError};
use serde::Serialize;
use std::path::PathBuf;

/// Configuration overrides shared by the petshop binaries.
///
/// Unset arguments leave the value of `petshop.toml` or the `PETSHOP_*` environment untouched.
#[derive(Clone, Debug, Default, Serialize, Parser)]
#[command(next_help_heading = "Config options")]
pub struct ConfigArgs {
    /// Chain id the wallet must be on.
    #[arg(long, value_name = "CHAIN_ID")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,

    /// Network whose deployment is used.
    #[arg(long, short, value_name = "NAME")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    /// JSON-RPC endpoint of the wallet provider.
    #[arg(long, visible_alias = "rpc-url", value_name = "URL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_url: Option<String>,

    /// Account the wallet should expose.
    #[arg(long, value_name = "ADDRESS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    /// Path or http(s) URL of the pet catalog.
    #[arg(long, value_name = "PATH_OR_URL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,

    /// Directory of the deployment artifacts.
    #[arg(long, value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contracts_dir: Option<PathBuf>,

    /// Polling interval for receipts and account changes, in milliseconds.
    #[arg(long, value_name = "MS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<u64>,
}

impl ConfigArgs {
    /// Returns the default figment with these arguments merged on top.
    pub fn figment(&self) -> Figment {
        PetshopConfig::figment().merge(self.clone())
    }

    /// Loads the config, applying these arguments last.
    pub fn load_config(&self) -> Result<PetshopConfig, ExtractConfigError> {
        PetshopConfig::try_from(self.figment())
    }
}

// Make the arguments a `figment::Provider` so they can be merged into the config.
impl Provider for ConfigArgs {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command line arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        let value = Value::serialize(self)?;
        let error = InvalidType(value.to_actual(), "map".into());
        let dict = value.into_dict().ok_or(error)?;
        Ok(Map::from([(Profile::Default, dict)]))
    }
}
