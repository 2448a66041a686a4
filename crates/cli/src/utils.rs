use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Initializes a tracing subscriber writing to stderr, filtered by `RUST_LOG`.
pub fn subscriber() {
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Loads the `.env` file of the working directory, if any.
///
/// Variables already set in the environment take precedence.
pub fn load_dotenv() {
    if let Ok(cwd) = std::env::current_dir() {
        load_dotenv_from(&cwd);
    }
}

fn load_dotenv_from(dir: &Path) {
    // A missing or malformed file is not an error, logging is not set up yet.
    let _ = dotenvy::from_path(dir.join(".env"));
}
