use clap::Parser;
use rediseen::cli::Cli;
use rediseen::ConfigError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if let Err(e) = cli.run().await {
        match e.downcast_ref::<ConfigError>() {
            Some(config_error) => tracing::error!("{}", config_error),
            None => tracing::error!("{:#}", e),
        }
        std::process::exit(1);
    }
}
