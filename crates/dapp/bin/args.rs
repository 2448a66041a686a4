use crate::cmd::{adopt::AdoptArgs, interactive::AppArgs, pets::PetsArgs};
use clap::{Parser, Subcommand};

/// Adopt pets from the command line.
#[derive(Parser)]
#[command(name = "petshop", version, next_display_order = None)]
pub struct Petshop {
    #[command(subcommand)]
    pub cmd: PetshopSubcommand,
}

#[derive(Subcommand)]
pub enum PetshopSubcommand {
    /// Connect the wallet and list the pets with their adoption status.
    #[command(visible_alias = "ls")]
    Pets(PetsArgs),

    /// Adopt a pet and wait for the transaction to be mined.
    Adopt(AdoptArgs),

    /// Run the interactive client.
    ///
    /// Reads `connect`, `adopt <id>`, `dismiss`, `show` and `quit` from stdin.
    App(AppArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Petshop::command().debug_assert();
    }

    #[test]
    fn parse_adopt() {
        let args =
            Petshop::parse_from(["petshop", "adopt", "3", "--wallet-url", "http://localhost:8545"]);
        let PetshopSubcommand::Adopt(adopt) = args.cmd else { panic!("expected adopt") };
        assert_eq!(adopt.pet, 3);
        assert_eq!(adopt.config.wallet_url.as_deref(), Some("http://localhost:8545"));
    }
}
