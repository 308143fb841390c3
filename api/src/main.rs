//! userhub API server
//!
//! Boots a service container holding the `UserService` capability over MySQL and
//! serves it over HTTP. Uses hexagonal (ports & adapters) architecture for clean
//! separation of concerns.

use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod adapters;
mod app;
mod bootstrap;
mod config;
mod container;
mod domain;
mod entity;
mod error;
mod handlers;
mod router;

#[cfg(test)]
mod test_utils;


use app::UserService;
use bootstrap::Application;
use config::Config;
use container::ServiceRegistry;
use error::RegistryError;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolved once from the registry; every handler shares this instance
    pub user_service: Arc<dyn UserService>,
    pub registry: Arc<ServiceRegistry>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn from_registry(registry: ServiceRegistry, config: Config) -> Result<Self, RegistryError> {
        let user_service = registry.resolve::<dyn UserService>()?;

        Ok(Self {
            user_service,
            registry: Arc::new(registry),
            config: Arc::new(config),
        })
    }
}

#[derive(Debug, Parser)]
#[command(name = "userhub-api")]
#[command(about = "User service API over MySQL", long_about = None)]
struct Cli {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides HOST)
    #[arg(long)]
    host: Option<IpAddr>,

    /// Load environment from this file instead of .env
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Create missing tables on startup (overrides DB_INIT_SCHEMA)
    #[arg(long)]
    init_schema: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if self.init_schema {
            config.database.init_schema = true;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,userhub_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "userhub-api exited with error");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::info!("Starting userhub API...");

    let mut config =
        Config::from_env(cli.env_file.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);

    let app = Application::bootstrap(config)
        .await
        .context("Startup failed")?;
    tracing::debug!(
        listen = %app.state().config.listen_addr(),
        "Application bootstrapped"
    );

    app.serve(bootstrap::shutdown_signal())
        .await
        .context("Server failed")?;

    Ok(())
}
