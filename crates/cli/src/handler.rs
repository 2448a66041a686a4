//! Error reporting of the petshop binaries.

use eyre::EyreHandler;
use petshop_common::errors::display_chain;
use std::{error::Error, fmt, panic::Location};

/// Prints an error chain on one line, with messages repeated by wrapping errors dropped.
///
/// With `PETSHOP_DEBUG` set, the verbose `color-eyre` report is printed instead.
struct Handler {
    verbose: Option<Box<dyn EyreHandler>>,
}

impl EyreHandler for Handler {
    fn debug(&self, error: &(dyn Error + 'static), f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.verbose {
            Some(verbose) => verbose.debug(error, f),
            None => f.write_str(&display_chain(error)),
        }
    }

    fn track_caller(&mut self, location: &'static Location<'static>) {
        if let Some(verbose) = &mut self.verbose {
            verbose.track_caller(location);
        }
    }
}

/// Installs the error report and panic hooks.
pub fn install() {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .display_env_section(false)
        .panic_section("This is a bug in petshop. Please report it with the command you ran.")
        .into_hooks();
    panic_hook.install();

    let verbose = std::env::var_os("PETSHOP_DEBUG").is_some();
    let eyre_hook = eyre_hook.into_eyre_hook();
    if let Err(err) = eyre::set_hook(Box::new(move |error| {
        Box::new(Handler { verbose: verbose.then(|| eyre_hook(error)) })
    })) {
        debug!(%err, "error report hook already installed");
    }
}
