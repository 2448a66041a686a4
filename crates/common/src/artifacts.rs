//! Deployment artifacts shared between `petshop-deploy` and the client.
//!
//! A deployment writes two files into the contracts directory:
//!
//! - `contract-address-<network>.json`: maps the logical contract name to its address, e.g.
//!   `{"PetAdoption": "0x5FbD..."}`.
//! - `<contract>.json`: the compiled contract artifact including its ABI.

use crate::{errors::FsPathError, fs};
use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Errors when reading or writing deployment artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error(transparent)]
    Fs(#[from] FsPathError),
    #[error("no address for `{name}` in {path:?}; was it deployed to this network?")]
    MissingAddress { name: String, path: PathBuf },
    #[error("artifact {path:?} has no bytecode")]
    MissingBytecode { path: PathBuf },
}

/// A compiled contract in the hardhat artifact layout.
///
/// Only the ABI and creation bytecode are interpreted. An artifact read from disk is copied next
/// to the deployed address byte for byte.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    /// The contract name, if the compiler recorded it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_name: Option<String>,
    /// The contract's ABI.
    pub abi: JsonAbi,
    /// Creation bytecode.
    #[serde(default)]
    pub bytecode: Bytes,
    /// Remaining compiler output.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
    /// The file contents this artifact was read from.
    #[serde(skip)]
    source: Option<String>,
}

impl ContractArtifact {
    /// Reads an artifact from disk.
    pub fn read(path: &Path) -> Result<Self, ArtifactError> {
        let source = fs::read_to_string(path)?;
        let mut artifact: Self =
            serde_json::from_str(&source).map_err(|err| FsPathError::read_json(err, path))?;
        artifact.source = Some(source);
        Ok(artifact)
    }

    /// Reads an artifact and ensures it can be deployed.
    pub fn read_deployable(path: &Path) -> Result<Self, ArtifactError> {
        let artifact = Self::read(path)?;
        if artifact.bytecode.is_empty() {
            return Err(ArtifactError::MissingBytecode { path: path.to_path_buf() });
        }
        Ok(artifact)
    }
}

/// A deployed contract as seen by the client.
#[derive(Clone, Debug, PartialEq)]
pub struct Deployment {
    /// Address of the contract on the selected network.
    pub address: Address,
    /// The contract's ABI.
    pub abi: JsonAbi,
}

/// Reads and writes artifacts in a contracts directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The contracts directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the address file for `network`.
    pub fn address_file(&self, network: &str) -> PathBuf {
        self.root.join(format!("contract-address-{network}.json"))
    }

    /// Path of the artifact file for `contract`.
    pub fn artifact_file(&self, contract: &str) -> PathBuf {
        self.root.join(format!("{contract}.json"))
    }

    /// Records a deployment, creating the contracts directory if needed.
    ///
    /// Returns the paths of the written address and artifact files.
    pub fn write_deployment(
        &self,
        network: &str,
        contract: &str,
        address: Address,
        artifact: &ContractArtifact,
    ) -> Result<(PathBuf, PathBuf), ArtifactError> {
        fs::create_dir_all(&self.root)?;

        let address_file = self.address_file(network);
        let addresses = BTreeMap::from([(contract, address)]);
        fs::write_pretty_json_file(&address_file, &addresses)?;

        let artifact_file = self.artifact_file(contract);
        match &artifact.source {
            Some(source) => fs::write(&artifact_file, source)?,
            None => fs::write_pretty_json_file(&artifact_file, artifact)?,
        }

        debug!(?address_file, ?artifact_file, "wrote deployment artifacts");
        Ok((address_file, artifact_file))
    }

    /// Reads the address of `contract` on `network`.
    pub fn read_address(&self, network: &str, contract: &str) -> Result<Address, ArtifactError> {
        let path = self.address_file(network);
        let addresses: BTreeMap<String, Address> = fs::read_json_file(&path)?;
        addresses
            .get(contract)
            .copied()
            .ok_or_else(|| ArtifactError::MissingAddress { name: contract.to_string(), path })
    }

    /// Reads the address and ABI of `contract` on `network`.
    pub fn read_deployment(
        &self,
        network: &str,
        contract: &str,
    ) -> Result<Deployment, ArtifactError> {
        let address = self.read_address(network, contract)?;
        let artifact = ContractArtifact::read(&self.artifact_file(contract))?;
        Ok(Deployment { address, abi: artifact.abi })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const ARTIFACT: &str = r#"{
        "_format": "hh-sol-artifact-1",
        "contractName": "PetAdoption",
        "sourceName": "contracts/PetAdoption.sol",
        "abi": [
            {"type": "constructor", "inputs": [{"name": "initialPetIndex", "type": "uint256", "internalType": "uint256"}], "stateMutability": "nonpayable"},
            {"type": "function", "name": "adoptPet", "inputs": [{"name": "adoptIdx", "type": "uint256", "internalType": "uint256"}], "outputs": [], "stateMutability": "nonpayable"}
        ],
        "bytecode": "0x6080604052",
        "deployedBytecode": "0x6080",
        "linkReferences": {}
    }"#;

    #[test]
    fn artifact_keeps_unknown_fields() {
        let artifact: ContractArtifact = serde_json::from_str(ARTIFACT).unwrap();
        assert_eq!(artifact.contract_name.as_deref(), Some("PetAdoption"));
        assert!(artifact.abi.function("adoptPet").is_some());
        assert_eq!(artifact.bytecode.len(), 5);
        assert_eq!(artifact.extra["_format"], "hh-sol-artifact-1");

        let json = serde_json::to_value(&artifact).unwrap();
        assert_eq!(json["sourceName"], "contracts/PetAdoption.sol");
        assert_eq!(json["bytecode"], "0x6080604052");
    }

    #[test]
    fn write_then_read_deployment() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("frontend/src/contracts"));
        let artifact: ContractArtifact = serde_json::from_str(ARTIFACT).unwrap();
        let address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");

        let (address_file, artifact_file) =
            store.write_deployment("localhost", "PetAdoption", address, &artifact).unwrap();
        assert!(address_file.ends_with("contract-address-localhost.json"));
        assert!(artifact_file.ends_with("PetAdoption.json"));

        let raw = std::fs::read_to_string(&address_file).unwrap().to_lowercase();
        assert_eq!(
            raw,
            "{\n  \"petadoption\": \"0x5fbdb2315678afecb367f032d93f642f64180aa3\"\n}\n"
        );

        let deployment = store.read_deployment("localhost", "PetAdoption").unwrap();
        assert_eq!(deployment.address, address);
        assert_eq!(deployment.abi, artifact.abi);
    }

    #[test]
    fn copies_artifact_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        // Entries out of the order `JsonAbi` serializes them in, and an empty bytecode.
        let source = r#"{
  "_format": "hh-sol-artifact-1",
  "contractName": "PetAdoption",
  "abi": [
    {"type": "function", "name": "adoptPet", "inputs": [{"name": "adoptIdx", "type": "uint256", "internalType": "uint256"}], "outputs": [], "stateMutability": "nonpayable"},
    {"type": "constructor", "inputs": [], "stateMutability": "nonpayable"}
  ],
  "bytecode": "0x",
  "linkReferences": {}
}
"#;
        let path = dir.path().join("PetAdoption.json");
        std::fs::write(&path, source).unwrap();
        let artifact = ContractArtifact::read(&path).unwrap();
        assert!(artifact.bytecode.is_empty());

        let store = ArtifactStore::new(dir.path().join("contracts"));
        let address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
        let (_, artifact_file) =
            store.write_deployment("localhost", "PetAdoption", address, &artifact).unwrap();
        assert_eq!(std::fs::read_to_string(artifact_file).unwrap(), source);
    }

    #[test]
    fn empty_bytecode_is_kept() {
        let artifact: ContractArtifact =
            serde_json::from_str(r#"{"abi": [], "bytecode": "0x"}"#).unwrap();
        assert_eq!(serde_json::to_value(&artifact).unwrap()["bytecode"], "0x");
    }

    #[test]
    fn missing_network_and_contract() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let err = store.read_address("polygon_mumbai", "PetAdoption").unwrap_err();
        assert!(matches!(err, ArtifactError::Fs(ref e) if e.is_not_found()));

        std::fs::write(
            store.address_file("localhost"),
            r#"{"Other": "0x5FbDB2315678afecb367f032d93F642f64180aa3"}"#,
        )
        .unwrap();
        let err = store.read_address("localhost", "PetAdoption").unwrap_err();
        assert!(matches!(err, ArtifactError::MissingAddress { ref name, .. } if name == "PetAdoption"));
    }

    #[test]
    fn undeployable_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Empty.json");
        std::fs::write(&path, r#"{"abi": []}"#).unwrap();
        assert!(matches!(
            ContractArtifact::read_deployable(&path),
            Err(ArtifactError::MissingBytecode { .. })
        ));
    }
}
