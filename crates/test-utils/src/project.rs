use std::path::{Path, PathBuf};

use alloy_json_abi::JsonAbi;
use petshop_common::{ArtifactStore, Catalog, ContractArtifact, PetRecord, PetshopConfig, fs};
use tempfile::TempDir;

use crate::{MockWallet, accounts::CONTRACT};

const PET_ADOPTION_ABI: &str = r#"[
    {"type": "constructor", "inputs": [{"name": "initialPetIndex", "type": "uint256", "internalType": "uint256"}], "stateMutability": "nonpayable"},
    {"type": "function", "name": "adoptPet", "inputs": [{"name": "adoptIdx", "type": "uint256", "internalType": "uint256"}], "outputs": [], "stateMutability": "nonpayable"},
    {"type": "function", "name": "getAllAdoptedPets", "inputs": [], "outputs": [{"name": "", "type": "uint256[]", "internalType": "uint256[]"}], "stateMutability": "view"},
    {"type": "function", "name": "getOwner", "inputs": [], "outputs": [{"name": "", "type": "address", "internalType": "address"}], "stateMutability": "view"}
]"#;

/// The compiled adoption contract, with placeholder bytecode.
pub fn pet_adoption_artifact() -> ContractArtifact {
    let abi: JsonAbi = serde_json::from_str(PET_ADOPTION_ABI).expect("valid abi");
    serde_json::from_value(serde_json::json!({
        "_format": "hh-sol-artifact-1",
        "contractName": "PetAdoption",
        "sourceName": "contracts/PetAdoption.sol",
        "abi": abi,
        "bytecode": "0x608060405234801561001057600080fd5b50",
        "deployedBytecode": "0x6080604052",
        "linkReferences": {},
        "deployedLinkReferences": {},
    }))
    .expect("valid artifact")
}

/// Five pets with ids `0..5`, matching the contract's default pet count.
pub fn sample_catalog() -> Vec<PetRecord> {
    ["Frieda", "Gina", "Collins", "Melissa", "Jeanine"]
        .into_iter()
        .enumerate()
        .map(|(id, name)| {
            let mut pet = PetRecord::new(id as u64, name);
            pet.image = Some(format!("images/{}.jpeg", name.to_lowercase()));
            pet
        })
        .collect()
}

/// A throwaway project directory with a catalog and the contract deployed on `localhost`.
#[derive(Debug)]
pub struct TestProject {
    name: String,
    dir: TempDir,
    config: PetshopConfig,
}

impl TestProject {
    /// Creates the project layout.
    pub fn new(name: &str) -> Self {
        let dir = tempfile::Builder::new()
            .prefix(&format!("petshop-{name}-"))
            .tempdir()
            .expect("failed to create temp dir");
        let config = PetshopConfig {
            catalog: dir.path().join("pets.json").display().to_string(),
            contracts_dir: dir.path().join("contracts"),
            artifact: dir.path().join("artifacts/PetAdoption.json"),
            poll_interval: 5,
            ..Default::default()
        };
        let prj = Self { name: name.to_string(), dir, config };
        prj.write_catalog(&sample_catalog());
        prj.store()
            .write_deployment("localhost", "PetAdoption", CONTRACT, &pet_adoption_artifact())
            .expect("failed to write deployment");
        trace!(name, root = ?prj.root(), "created test project");
        prj
    }

    /// Creates the project and a wallet that knows the deployed contract.
    pub fn with_wallet(name: &str) -> (Self, MockWallet) {
        (Self::new(name), MockWallet::with_contract(CONTRACT))
    }

    /// The test name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The project root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// The project's config.
    pub fn config(&self) -> &PetshopConfig {
        &self.config
    }

    /// Mutable access to the project's config.
    pub fn config_mut(&mut self) -> &mut PetshopConfig {
        &mut self.config
    }

    /// The contracts directory.
    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.config.contracts_dir)
    }

    /// The catalog file.
    pub fn catalog_path(&self) -> PathBuf {
        PathBuf::from(&self.config.catalog)
    }

    /// The catalog currently on disk.
    pub fn catalog(&self) -> Catalog {
        Catalog::from_json(&fs::read_to_string(self.catalog_path()).expect("catalog"))
            .expect("valid catalog")
    }

    /// Overwrites the catalog.
    pub fn write_catalog(&self, pets: &[PetRecord]) {
        fs::write_pretty_json_file(&self.catalog_path(), &pets).expect("failed to write catalog");
    }

    /// Writes the compiled artifact consumed by the deployer.
    pub fn write_compiled_artifact(&self) -> PathBuf {
        let path = self.config.artifact.clone();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create artifacts dir");
        }
        fs::write_pretty_json_file(&path, &pet_adoption_artifact())
            .expect("failed to write artifact");
        path
    }
}
