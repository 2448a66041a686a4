use clap::Parser;
use eyre::Result;
use petshop::{Action, Status, view::Banner};
use petshop_cli::opts::ConfigArgs;
use petshop_common::PetId;

/// CLI arguments for `petshop adopt`.
#[derive(Clone, Debug, Parser)]
pub struct AdoptArgs {
    /// Id of the pet to adopt.
    pub pet: PetId,

    #[command(flatten)]
    pub config: ConfigArgs,
}

impl AdoptArgs {
    pub async fn run(self) -> Result<()> {
        let Self { pet, config } = self;
        let mut app = super::app(&config)?;
        super::connect(&mut app).await;

        let state = app.state();
        if state.status() != Status::Browsing {
            println!("{}", app.view());
            eyre::bail!("cannot adopt pet {pet}: the wallet is not ready");
        }
        if !state.catalog().is_some_and(|catalog| catalog.contains(pet)) {
            eyre::bail!("pet {pet} is not in the catalog");
        }
        if state.adopted().is_some_and(|adopted| adopted.contains(&pet)) {
            eyre::bail!("pet {pet} is already adopted");
        }

        app.dispatch(Action::AdoptRequested(pet));
        // Show the hash as soon as the wallet returns it.
        app.wait_for(|state| {
            let pending = state.session().and_then(|session| session.pending);
            pending.is_none_or(|pending| pending.tx_hash.is_some())
        })
        .await;
        let view = app.view();
        if let Some(banner) = view.banners().iter().find(|b| matches!(b, Banner::Pending { .. })) {
            println!("{banner}");
        }
        app.wait_for(|state| state.status() != Status::AdoptionPending).await;

        let session = app.state().session();
        if let Some(err) = session.and_then(|session| session.tx_error.as_deref()) {
            eyre::bail!("Error sending transaction: {err}");
        }
        if !app.state().adopted().is_some_and(|adopted| adopted.contains(&pet)) {
            eyre::bail!("the session ended before pet {pet} was adopted");
        }
        debug!(pet, "adopted");
        println!("{}", app.view());
        Ok(())
    }
}
