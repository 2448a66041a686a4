//! Common utilities for the petshop client and deployment tools.

#![warn(missing_docs, unused_crate_dependencies)]

#[macro_use]
extern crate tracing;

pub mod artifacts;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod fs;

pub use artifacts::{ArtifactStore, ContractArtifact, Deployment};
pub use catalog::{Catalog, CatalogSource, PetId, PetRecord};
pub use config::{NetworkConfig, PetshopConfig};
