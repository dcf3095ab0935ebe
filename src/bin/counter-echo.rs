use std::io::IsTerminal;

use anyhow::Context;
use clap::Parser;
use counter_echo::Config;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let config = Config::parse();

    let app = config.app().context("invalid configuration")?;
    let server = config
        .server()
        .with_context(|| format!("failed to listen on {}", config.listen))?;

    tracing::info!(
        listen = %server.local_addr().unwrap_or(config.listen),
        max_threads = config.max_threads,
        path = app.path(),
        "serving counter sync"
    );

    server.serve(app)?;

    Ok(())
}
