// Entrypoint for the CLI application.
// - Keeps `main` small: load config, set up logging, hand off to the UI.
// - Returns `anyhow::Result` so failures print with their context chain.

use clap::Parser;
use llu_follower::{config, ui};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    // .env files first so clap sees their variables as env fallbacks.
    let env_files = config::load_env_files();

    let args = config::Args::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("llu_follower={}", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    for path in &env_files {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    ui::run(&args)
}
