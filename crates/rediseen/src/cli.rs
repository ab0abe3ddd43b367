//! Command line: `start`, `stop` and `version`

use crate::api::Gateway;
use crate::banner;
use crate::config::GatewayConfig;
use crate::daemon;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

const CONFIG_HELP: &str = "Configuration (environment variables):
  REDISEEN_REDIS_URI                 URI of the Redis instance, e.g. redis://:password@localhost:6379
  REDISEEN_HOST                      Host to bind (default: localhost)
  REDISEEN_PORT                      Port to bind (default: 8000)
  REDISEEN_DB_EXPOSED                Logical databases to expose, e.g. `0`, `0-5`, `0;3;9-11` or `*`
  REDISEEN_KEY_PATTERN_EXPOSED       Regular expression keys must match to be exposed
  REDISEEN_KEY_PATTERN_EXPOSE_ALL    Set to true to expose all keys
  REDISEEN_API_KEY                   Require this value in the X-API-KEY request header
  REDISEEN_TEST_MODE                 Skip the initial Redis check";

/// Top-level arguments.
#[derive(Parser)]
#[command(name = "rediseen", version = banner::VERSION)]
#[command(about = "Expose Redis contents as a read-only JSON API", long_about = None)]
#[command(after_help = CONFIG_HELP)]
pub struct Cli {
    /// PID file used by `start --daemon` and `stop`
    #[arg(long, global = true, default_value_os_t = daemon::default_pid_file())]
    pub pidfile: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Start the service
    Start {
        /// Run in the background
        #[arg(short, long)]
        daemon: bool,

        /// Gateway settings
        #[command(flatten)]
        args: StartArgs,
    },
    /// Stop a service started with `start --daemon`
    Stop,
    /// Print the version
    Version,
}

/// Settings for `start`, each also read from its environment variable.
#[derive(Args, Debug, Clone, Default)]
pub struct StartArgs {
    /// Load configuration from a .toml or .json file instead
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Redis URI
    #[arg(long, env = "REDISEEN_REDIS_URI", default_value = "")]
    pub redis_uri: String,

    /// Host to bind
    #[arg(long, env = "REDISEEN_HOST", default_value = "localhost")]
    pub host: String,

    /// Port to bind
    #[arg(long, env = "REDISEEN_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Exposed databases: `*`, `N`, `N-M`, joined by `;`
    #[arg(long, env = "REDISEEN_DB_EXPOSED", default_value = "")]
    pub db_exposed: String,

    /// Regular expression of exposed keys
    #[arg(long, env = "REDISEEN_KEY_PATTERN_EXPOSED", default_value = "")]
    pub key_pattern_exposed: String,

    /// Expose every key
    #[arg(long, env = "REDISEEN_KEY_PATTERN_EXPOSE_ALL", default_value_t = false)]
    pub key_pattern_expose_all: bool,

    /// Required X-API-KEY value
    #[arg(long, env = "REDISEEN_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Skip the startup Redis check
    #[arg(long, env = "REDISEEN_TEST_MODE", default_value_t = false)]
    pub test_mode: bool,
}

impl StartArgs {
    /// `--config` wins over flags and environment when given.
    pub fn into_config(self) -> Result<GatewayConfig> {
        if let Some(path) = &self.config {
            return Ok(GatewayConfig::from_file(path)?);
        }
        Ok(GatewayConfig {
            host: self.host,
            port: self.port,
            redis_uri: self.redis_uri,
            db_exposed: self.db_exposed,
            key_pattern_exposed: self.key_pattern_exposed,
            key_pattern_expose_all: self.key_pattern_expose_all,
            api_key: self.api_key,
            test_mode: self.test_mode,
        })
    }
}

impl Cli {
    /// Executes the parsed command.
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Version => {
                println!("rediseen {}", banner::VERSION);
                Ok(())
            }
            Command::Stop => {
                let pid = daemon::stop(&self.pidfile)?;
                println!("Stopped rediseen (PID {})", pid);
                Ok(())
            }
            Command::Start { daemon: true, args } => {
                let settings = args.into_config()?.validate()?;
                settings.check_store().await?;
                let pid = daemon::spawn_detached(&self.pidfile)?;
                println!("rediseen started in background (PID {})", pid);
                Ok(())
            }
            Command::Start {
                daemon: false,
                args,
            } => serve(args).await,
        }
    }
}

async fn serve(args: StartArgs) -> Result<()> {
    println!("{}\n", banner::header());
    let settings = args.into_config()?.validate()?;
    settings.check_store().await?;

    let gateway = Gateway::new(
        settings.policy,
        Arc::new(settings.connector),
        settings.api_key,
    );
    gateway.serve(settings.bind_addr).await
}
