//! Main entry point for the cross-chain payment service.
//!
//! `paycross route` prints the protocol and quote a payment would use,
//! `paycross pay` executes it end to end while printing progress events.
//! Ctrl-C cancels the running payment before its next transaction or poll.

use clap::{Parser, Subcommand};
use payment_config::Config;
use payment_core::{PaymentBuilder, PaymentEngine, PaymentFactories};
use std::path::PathBuf;

mod commands;

use payment_attestation::implementations::iris::create_attestation;
use payment_delivery::implementations::evm::alloy::create_delivery;
use payment_order::implementations::http::create_order_service;

/// Command-line arguments for the payment service.
#[derive(Parser, Debug)]
#[command(name = "paycross", author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", global = true)]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info", global = true)]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print the route and quote for a payment without executing it
	Route(commands::PaymentArgs),
	/// Execute a payment
	Pay(commands::PaymentArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started paycross");

	let config_path = args
		.config
		.to_str()
		.ok_or("configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let engine = build_engine(config).await?;

	match args.command {
		Command::Route(payment) => commands::route(&engine, &payment).await?,
		Command::Pay(payment) => commands::pay(&engine, &payment).await?,
	}

	tracing::info!("Stopped paycross");
	Ok(())
}

/// Builds the payment engine with the concrete backends.
async fn build_engine(config: Config) -> Result<PaymentEngine, Box<dyn std::error::Error>> {
	let factories = PaymentFactories {
		storage_factories: payment_storage::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
		account_factories: payment_account::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
		delivery_factory: create_delivery,
		attestation_factory: create_attestation,
		order_service_factory: create_order_service,
	};

	Ok(PaymentBuilder::new(config).build(factories).await?)
}
