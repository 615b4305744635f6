#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use routeshift::cache;
use routeshift::config::Config;
use routeshift::observability;
use routeshift::runner::{RunOutcome, Runner};
use routeshift::session::CookieJar;

/// Keeps a proxy panel's routing pointed at a reachable egress route.
#[derive(Parser, Debug)]
#[command(name = "routeshift")]
#[command(version, about = "Failover for panel-managed egress routes.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one reconciliation pass (intended to be invoked by a scheduler)
    Run {
        /// Detect and log the plan, but push nothing and restart nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the effective configuration and cached state
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = Config::load_or_init()?;

    match cli.command {
        Commands::Run { dry_run } => {
            let store = cache::create_store(&config.cache).await?;
            let observer = observability::create_observer(&config.observability);
            let runner = Runner::new(config, store, observer);

            match runner.run_once(dry_run).await? {
                RunOutcome::NoAction { reason } => {
                    info!(reason = %reason, "run finished without changes");
                }
                RunOutcome::DryRun { target } => {
                    info!(route = %target, "dry run finished, panel untouched");
                }
                RunOutcome::Reconciled { target } => {
                    info!(route = %target, "run finished, traffic rerouted");
                }
            }
            Ok(())
        }

        Commands::Status => show_status(&config).await,
    }
}

async fn show_status(config: &Config) -> Result<()> {
    println!("routeshift status");
    println!();
    println!("Version:      {}", env!("CARGO_PKG_VERSION"));
    println!("Config:       {}", config.config_path.display());
    println!("Panel:        {}", config.panel.base_url);
    println!("Cache:        {} ({})", config.cache.backend, config.cache.url);
    println!("Universe:     {}", config.routes.universe.join(", "));
    println!("Users:        {}", config.routes.users.join(", "));
    println!("Inbound tags: {}", config.routes.inbound_tags.join(", "));
    println!();

    let store = match cache::create_store(&config.cache).await {
        Ok(store) => store,
        Err(e) => {
            println!("Cache state:  unavailable ({e:#})");
            return Ok(());
        }
    };

    let healthy = store.health_check().await;
    println!(
        "Cache state:  {} ({})",
        if healthy { "reachable" } else { "unreachable" },
        store.name()
    );

    let previous = match store.get(&config.cache.routes_key).await {
        Ok(Some(bytes)) => serde_json::from_slice::<Vec<String>>(&bytes)
            .map(|routes| routes.join(", "))
            .unwrap_or_else(|_| "(corrupt)".to_string()),
        Ok(None) => "(none)".to_string(),
        Err(e) => format!("(error: {e:#})"),
    };
    println!("Previous reachable set: {previous}");

    let cookie_state = match store.get(&config.cache.cookie_key).await {
        Ok(Some(bytes)) => match CookieJar::from_bytes(&bytes) {
            Some(jar) if !jar.is_expired() => "cached, valid".to_string(),
            Some(_) => "cached, expired".to_string(),
            None => "cached, corrupt".to_string(),
        },
        Ok(None) => "not cached".to_string(),
        Err(e) => format!("error: {e:#}"),
    };
    println!("Cookie jar:             {cookie_state}");

    Ok(())
}
