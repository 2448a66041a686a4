#[macro_use]
extern crate tracing;

use clap::Parser;
use eyre::Result;
use petshop_cli::{handler, utils};

pub mod args;
pub mod cmd;

use args::{Petshop, PetshopSubcommand};

fn main() -> Result<()> {
    handler::install();
    utils::load_dotenv();
    utils::subscriber();
    let args = Petshop::parse();
    main_args(args)
}

#[tokio::main(flavor = "current_thread")]
async fn main_args(args: Petshop) -> Result<()> {
    match args.cmd {
        PetshopSubcommand::Pets(cmd) => cmd.run().await,
        PetshopSubcommand::Adopt(cmd) => cmd.run().await,
        PetshopSubcommand::App(cmd) => cmd.run().await,
    }
}
