//! # petshop
//!
//! A terminal client for the pet adoption contract: connects a wallet, lists the catalog and
//! sends adoptions through the wallet.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

// Used by the binary.
use clap as _;
use eyre as _;
use petshop_cli as _;

pub mod app;
pub mod gateway;
pub mod state;
pub mod view;

pub use app::App;
pub use gateway::{ContractGateway, GatewayHandle, TxFailure, TxReceipt};
pub use state::{Action, AppState, Status};
pub use view::View;
