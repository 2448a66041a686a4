use clap::Parser;
use eyre::Result;
use petshop_cli::opts::ConfigArgs;

/// CLI arguments for `petshop pets`.
#[derive(Clone, Debug, Parser)]
pub struct PetsArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

impl PetsArgs {
    pub async fn run(self) -> Result<()> {
        let mut app = super::app(&self.config)?;
        super::connect(&mut app).await;
        println!("{}", app.view());
        Ok(())
    }
}
