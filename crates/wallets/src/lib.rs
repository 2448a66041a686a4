//! # petshop-wallets
//!
//! Wallet access for the petshop client, modelled on the
//! [EIP-1193](https://eips.ethereum.org/EIPS/eip-1193) provider API that browser wallets expose:
//! requests are identified by their JSON-RPC method name and failures carry the EIP-1193 error
//! codes.
//!
//! - [`WalletProvider`] is the injected provider. [`RpcWalletProvider`] implements it on top of a
//!   node with unlocked accounts.
//! - [`WalletConnector`] authorizes an account, moves the wallet to the required chain and owns
//!   the single account-change listener.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod connector;
pub mod error;
pub mod provider;
pub mod request;
pub mod rpc;

pub use connector::WalletConnector;
pub use error::{ConnectionError, RpcError};
pub use provider::{AccountEvents, SharedProvider, WalletProvider, detect_provider};
pub use request::WalletRequest;
pub use rpc::RpcWalletProvider;
