//! Subcommands of the `petshop` binary.

use eyre::Result;
use petshop::{Action, App, Status};
use petshop_cli::opts::ConfigArgs;
use petshop_wallets::detect_provider;

pub mod adopt;
pub mod interactive;
pub mod pets;

/// Creates the app from the config and the detected wallet.
pub fn app(config: &ConfigArgs) -> Result<App> {
    let config = config.load_config()?;
    let provider = detect_provider(&config)?;
    Ok(App::new(&config, provider))
}

/// Connects the wallet and waits until everything is loaded.
pub async fn connect(app: &mut App) {
    if app.state().status() == Status::Disconnected {
        app.dispatch(Action::ConnectRequested);
    }
    app.settle().await;
}
