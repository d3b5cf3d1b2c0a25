//! Main entry point for the Orderly platform service.
//!
//! This binary wires the configured storage backend and order repository
//! to the lifecycle state machine and serves the order API over HTTP. All
//! status mutations flow through the shared transition tables, so every
//! surface (admin, restaurant, rider) observes the same lifecycle rules.

use clap::Parser;
use orderly_config::Config;
use orderly_lifecycle::OrderStateMachine;
use orderly_repository::implementations::fixture::FixtureOrderRepository;
use orderly_repository::implementations::storage::StorageOrderRepository;
use orderly_repository::OrderRepository;
use orderly_storage::{StorageService, get_all_implementations};
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod server;

/// Command-line arguments for the platform service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the platform service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the storage backend, repository, and state machine
/// 5. Serves the HTTP API until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.init();

	tracing::info!("Started orderly service");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path)?;
	tracing::info!("Loaded configuration [{}]", config.platform.id);

	let repository = build_repository(&config)?;
	let machine = Arc::new(OrderStateMachine::new(repository));

	match config.api.clone() {
		Some(api_config) if api_config.enabled => {
			server::start_server(api_config, machine).await?;
		},
		_ => {
			tracing::warn!("API server disabled in configuration; nothing to serve");
		},
	}

	tracing::info!("Stopped orderly service");
	Ok(())
}

/// Builds the configured storage backend.
fn build_storage(config: &Config) -> Result<StorageService, Box<dyn std::error::Error>> {
	let factories: std::collections::HashMap<_, _> =
		get_all_implementations().into_iter().collect();

	let primary = config.storage.primary.as_str();
	let factory = factories
		.get(primary)
		.ok_or_else(|| format!("Unknown storage implementation: {}", primary))?;
	let implementation_config = config
		.storage
		.implementations
		.get(primary)
		.ok_or_else(|| format!("Missing configuration for storage implementation: {}", primary))?;

	let backend = factory(implementation_config)?;
	tracing::info!("Using '{}' storage backend", primary);
	Ok(StorageService::new(backend))
}

/// Builds the configured order repository.
fn build_repository(
	config: &Config,
) -> Result<Arc<dyn OrderRepository>, Box<dyn std::error::Error>> {
	match config.repository.primary.as_str() {
		"fixture" => {
			tracing::info!("Using seeded fixture repository");
			Ok(Arc::new(FixtureOrderRepository::seeded()))
		},
		_ => {
			let storage = build_storage(config)?;
			Ok(Arc::new(StorageOrderRepository::new(Arc::new(storage))))
		},
	}
}
