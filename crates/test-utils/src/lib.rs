//! Testing utilities: a scripted wallet that emulates the adoption contract and throwaway
//! project directories holding a catalog and deployment artifacts.

#![warn(unused_crate_dependencies, unreachable_pub)]
#![allow(clippy::disallowed_macros)]

#[macro_use]
extern crate tracing;

// Macros useful for testing.
mod macros;

mod mock;
pub use mock::{MockWallet, PetAdoption};

mod project;
pub use project::{TestProject, pet_adoption_artifact, sample_catalog};

/// Well known dev-node accounts.
pub mod accounts {
    use alloy_primitives::{Address, address};

    pub const ALICE: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    pub const BOB: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
    pub const CONTRACT: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
}

/// Initializes tracing for tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
