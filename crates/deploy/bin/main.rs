use alloy_signer_local::PrivateKeySigner;
use clap::Parser;
use eyre::{Result, WrapErr};
use petshop_cli::{handler, opts::ConfigArgs, utils};
use petshop_deploy::Deployer;
use std::path::PathBuf;

/// Deploy the pet adoption contract and record its address for the client.
#[derive(Clone, Debug, Parser)]
#[command(name = "petshop-deploy", version)]
pub struct DeployArgs {
    /// Private key of the deployer. Defaults to the node's first unlocked account.
    #[arg(long, env = "PETSHOP_PRIVATE_KEY", hide_env_values = true, value_name = "KEY")]
    pub private_key: Option<String>,

    /// Path of the compiled contract artifact.
    #[arg(long, value_name = "PATH")]
    pub artifact: Option<PathBuf>,

    /// Number of pets passed to the constructor.
    #[arg(long, value_name = "COUNT")]
    pub pets_count: Option<u64>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

impl DeployArgs {
    pub async fn run(self) -> Result<()> {
        let mut config = self.config.load_config()?;
        if let Some(artifact) = self.artifact {
            config.artifact = artifact;
        }
        if let Some(pets_count) = self.pets_count {
            config.pets_count = pets_count;
        }
        let signer = self
            .private_key
            .map(|key| key.trim().parse::<PrivateKeySigner>())
            .transpose()
            .wrap_err("invalid private key")?;

        let network = config.network.clone();
        let deployer = Deployer::new(&config, &network)?;

        println!("Deployment Started");
        let signer_address = signer.as_ref().map(PrivateKeySigner::address);
        let node = deployer.connect(signer)?;
        let from = deployer.resolve_deployer(node.as_ref(), signer_address).await?;
        println!("Deploying the contract with the account: {from}");
        let deployed = deployer.deploy_from(node.as_ref(), from).await?;

        println!("Transaction: {}", deployed.tx_hash);
        println!("{} deployed to: {}", config.contract_name, deployed.address);
        println!("Wrote {}", deployed.address_file.display());
        println!("Wrote {}", deployed.artifact_file.display());
        Ok(())
    }
}

fn main() -> Result<()> {
    handler::install();
    utils::load_dotenv();
    utils::subscriber();
    let args = DeployArgs::parse();
    main_args(args)
}

#[tokio::main(flavor = "current_thread")]
async fn main_args(args: DeployArgs) -> Result<()> {
    args.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        DeployArgs::command().debug_assert();
    }

    #[test]
    fn parse_network() {
        let args = DeployArgs::parse_from(["petshop-deploy", "--network", "localhost"]);
        assert_eq!(args.config.network.as_deref(), Some("localhost"));
        assert!(args.artifact.is_none());

        let args = DeployArgs::parse_from(["petshop-deploy", "-n", "sepolia", "--pets-count", "8"]);
        assert_eq!(args.config.network.as_deref(), Some("sepolia"));
        assert_eq!(args.pets_count, Some(8));
    }
}
