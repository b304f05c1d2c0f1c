//! Subcommand implementations for the payment CLI.

use clap::Args;
use payment_core::{PaymentEngine, PaymentOutcome, StopHandle};
use payment_types::{
	without_0x_prefix, Address, Bytes, ChainRegistry, OrderEvent, PaymentEvent, PaymentPreference,
	TransferEvent, TransferIntent, U256,
};
use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::sync::broadcast::error::RecvError;

/// Payment parameters shared by the `route` and `pay` subcommands.
#[derive(Args, Debug, Clone)]
pub struct PaymentArgs {
	/// Source chain id
	#[arg(long)]
	pub from_chain: u64,

	/// Token to pay with; defaults to the stablecoin of the source chain
	#[arg(long, value_parser = parse_address)]
	pub from_token: Option<Address>,

	/// Destination chain id
	#[arg(long)]
	pub to_chain: u64,

	/// Token to deliver; defaults to the stablecoin of the destination chain
	#[arg(long, value_parser = parse_address)]
	pub to_token: Option<Address>,

	/// Amount in the smallest unit of the source token
	#[arg(long, value_parser = parse_amount)]
	pub amount: U256,

	/// Address receiving the funds
	#[arg(long, value_parser = parse_address)]
	pub recipient: Address,

	/// Paying address; defaults to the configured account
	#[arg(long, value_parser = parse_address)]
	pub sender: Option<Address>,

	/// Hex payload forwarded to the destination hook
	#[arg(long, value_parser = parse_hex_bytes)]
	pub hook_data: Option<Bytes>,

	/// Free-text note attached to signed orders
	#[arg(long)]
	pub note: Option<String>,

	/// JSON file with the recipient's payment preferences
	#[arg(long)]
	pub preferences: Option<PathBuf>,
}

impl PaymentArgs {
	/// Builds the transfer intent, filling unset tokens from the registry.
	pub fn intent(&self, registry: &ChainRegistry) -> Result<TransferIntent, Box<dyn Error>> {
		let source_token = match self.from_token {
			Some(token) => token,
			None => registry.stablecoin_address(self.from_chain)?,
		};
		let destination_token = match self.to_token {
			Some(token) => token,
			None => registry.stablecoin_address(self.to_chain)?,
		};

		let mut intent = TransferIntent::new(
			self.from_chain,
			source_token,
			self.to_chain,
			destination_token,
			self.amount,
			self.recipient,
		)?;
		if let Some(sender) = self.sender {
			intent = intent.with_sender(sender);
		}
		if let Some(hook_data) = &self.hook_data {
			intent = intent.with_hook_data(hook_data.clone());
		}
		if let Some(note) = &self.note {
			intent = intent.with_note(note.clone());
		}
		Ok(intent)
	}

	/// Loads recipient preferences, or none when no file was given.
	pub fn preferences(&self) -> Result<Vec<PaymentPreference>, Box<dyn Error>> {
		match &self.preferences {
			Some(path) => {
				let raw = std::fs::read_to_string(path)?;
				Ok(serde_json::from_str(&raw)?)
			},
			None => Ok(Vec::new()),
		}
	}
}

fn parse_address(value: &str) -> Result<Address, String> {
	Address::from_str(value).map_err(|e| format!("invalid address '{}': {}", value, e))
}

fn parse_amount(value: &str) -> Result<U256, String> {
	U256::from_str_radix(value, 10).map_err(|e| format!("invalid amount '{}': {}", value, e))
}

fn parse_hex_bytes(value: &str) -> Result<Bytes, String> {
	hex::decode(without_0x_prefix(value))
		.map(Bytes::from)
		.map_err(|e| format!("invalid hex '{}': {}", value, e))
}

/// Prints the route and quote for a payment.
pub async fn route(engine: &PaymentEngine, args: &PaymentArgs) -> Result<(), Box<dyn Error>> {
	let intent = args.intent(engine.registry())?;
	let preferences = args.preferences()?;

	let decision = engine.route(&intent, &preferences)?;
	let decision = engine.quote(decision, &intent).await;

	println!("{}", serde_json::to_string_pretty(&decision)?);
	Ok(())
}

/// Executes a payment, printing events until it reaches a terminal state.
///
/// Ctrl-C stops this payment; the run then ends in its error phase.
pub async fn pay(engine: &PaymentEngine, args: &PaymentArgs) -> Result<(), Box<dyn Error>> {
	let intent = args.intent(engine.registry())?;
	let preferences = args.preferences()?;

	let mut events = engine.subscribe();
	let stop = StopHandle::new();
	let payment = engine.pay(&intent, &preferences, &stop);
	tokio::pin!(payment);

	let outcome = loop {
		tokio::select! {
			outcome = &mut payment => break outcome?,
			event = events.recv() => match event {
				Ok(event) => println!("{}", describe_event(&event)),
				Err(RecvError::Lagged(skipped)) => {
					tracing::warn!(skipped, "Event printer fell behind");
				},
				Err(RecvError::Closed) => {},
			},
			_ = tokio::signal::ctrl_c() => {
				tracing::warn!("Interrupted, stopping payment");
				stop.stop();
			},
		}
	};
	while let Ok(event) = events.try_recv() {
		println!("{}", describe_event(&event));
	}

	println!("{}", describe_outcome(&outcome));
	if outcome.is_success() {
		Ok(())
	} else {
		Err("payment did not settle".into())
	}
}

/// One-line rendering of a payment event.
pub fn describe_event(event: &PaymentEvent) -> String {
	match event {
		PaymentEvent::RouteSelected(decision) => {
			let mut line = format!(
				"route: {} {} -> {}",
				decision.protocol, decision.source_chain_id, decision.destination_chain_id
			);
			if let Some(fee) = decision.estimated_fee {
				line.push_str(&format!(", fee {}", fee));
			}
			if let Some(duration) = decision.estimated_duration_seconds {
				line.push_str(&format!(", ~{}s", duration));
			}
			line
		},
		PaymentEvent::Transfer(TransferEvent::PhaseChanged { log, .. })
		| PaymentEvent::Transfer(TransferEvent::Progress { log, .. })
		| PaymentEvent::Order(OrderEvent::PhaseChanged { log, .. })
		| PaymentEvent::Order(OrderEvent::Progress { log, .. }) => log.to_string(),
		PaymentEvent::Transfer(TransferEvent::Completed {
			burn_tx_hash,
			mint_tx_hash,
			..
		}) => format!("completed: burn {}, mint {}", burn_tx_hash, mint_tx_hash),
		PaymentEvent::Transfer(TransferEvent::Failed { error, .. }) => format!("failed: {}", error),
		PaymentEvent::Order(OrderEvent::StatusPolled {
			status, attempt, ..
		}) => format!("poll {}: {}", attempt, status),
		PaymentEvent::Order(OrderEvent::Finished { order_hash, phase }) => format!(
			"order {} finished: {}",
			order_hash.as_deref().unwrap_or("<unassigned>"),
			phase
		),
	}
}

/// Summary line for a finished payment.
pub fn describe_outcome(outcome: &PaymentOutcome) -> String {
	match outcome {
		PaymentOutcome::Bridge(state) => match &state.error_message {
			Some(error) => format!("transfer {} {}: {}", state.id, state.phase, error),
			None => format!("transfer {} {}", state.id, state.phase),
		},
		PaymentOutcome::Order(state) => {
			let hash = state.order_hash.as_deref().unwrap_or("<unassigned>");
			match &state.error_message {
				Some(error) => format!("order {} {}: {}", hash, state.phase, error),
				None => format!("order {} {}", hash, state.phase),
			}
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use payment_types::{Environment, LogEntry, OrderPhase, TransactionHash, TransferState};
	use std::io::Write;

	fn args(from_chain: u64, to_chain: u64) -> PaymentArgs {
		PaymentArgs {
			from_chain,
			from_token: None,
			to_chain,
			to_token: None,
			amount: U256::from(10_000_000u64),
			recipient: Address::repeat_byte(0x42),
			sender: None,
			hook_data: None,
			note: None,
			preferences: None,
		}
	}

	#[test]
	fn test_intent_defaults_to_registry_stablecoins() {
		let registry = ChainRegistry::new(Environment::Testnet);
		let intent = args(11155111, 43113).intent(&registry).unwrap();

		assert_eq!(
			intent.source_token,
			registry.stablecoin_address(11155111).unwrap()
		);
		assert_eq!(
			intent.destination_token,
			registry.stablecoin_address(43113).unwrap()
		);
		assert!(intent.sender.is_none());
		assert!(intent.hook_data.is_empty());
	}

	#[test]
	fn test_intent_keeps_explicit_fields() {
		let registry = ChainRegistry::new(Environment::Mainnet);
		let mut payment = args(8453, 42161);
		payment.from_token = Some(Address::repeat_byte(0x11));
		payment.sender = Some(Address::repeat_byte(0x22));
		payment.hook_data = Some(parse_hex_bytes("0xdeadbeef").unwrap());
		payment.note = Some("invoice 7".to_string());

		let intent = payment.intent(&registry).unwrap();

		assert_eq!(intent.source_token, Address::repeat_byte(0x11));
		assert_eq!(intent.sender, Some(Address::repeat_byte(0x22)));
		assert_eq!(intent.hook_data.as_ref(), &[0xde, 0xad, 0xbe, 0xef]);
		assert_eq!(intent.note.as_deref(), Some("invoice 7"));
	}

	#[test]
	fn test_intent_rejects_unknown_chain_without_token() {
		let registry = ChainRegistry::new(Environment::Testnet);
		assert!(args(999, 43113).intent(&registry).is_err());
	}

	#[test]
	fn test_intent_rejects_zero_amount() {
		let registry = ChainRegistry::new(Environment::Testnet);
		let mut payment = args(11155111, 43113);
		payment.amount = U256::ZERO;
		assert!(payment.intent(&registry).is_err());
	}

	#[test]
	fn test_preferences_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(
			br#"[{
				"chainId": 42161,
				"token": "0xaf88d065e77c8cc2239327c5edb3a432268e5831",
				"walletAddress": "0x4242424242424242424242424242424242424242",
				"isDefault": true
			}]"#,
		)
		.unwrap();

		let mut payment = args(8453, 42161);
		assert!(payment.preferences().unwrap().is_empty());

		payment.preferences = Some(file.path().to_path_buf());
		let preferences = payment.preferences().unwrap();
		assert_eq!(preferences.len(), 1);
		assert_eq!(preferences[0].chain_id, 42161);
		assert!(preferences[0].is_default);
	}

	#[test]
	fn test_parsers() {
		assert_eq!(parse_amount("1500000").unwrap(), U256::from(1_500_000u64));
		assert!(parse_amount("1.5").is_err());
		assert!(parse_address("0x1234").is_err());
		assert!(parse_hex_bytes("0xzz").is_err());
	}

	#[test]
	fn test_describe_events() {
		let completed = PaymentEvent::Transfer(TransferEvent::Completed {
			transfer_id: "t-1".to_string(),
			burn_tx_hash: TransactionHash(vec![0xab]),
			mint_tx_hash: TransactionHash(vec![0xcd]),
		});
		assert_eq!(describe_event(&completed), "completed: burn 0xab, mint 0xcd");

		let polled = PaymentEvent::Order(OrderEvent::StatusPolled {
			order_hash: "0x5a1f".to_string(),
			status: "pending".to_string(),
			attempt: 2,
		});
		assert_eq!(describe_event(&polled), "poll 2: pending");

		let log = LogEntry::new("burning", "Burn submitted");
		let progress = PaymentEvent::Transfer(TransferEvent::Progress {
			transfer_id: "t-1".to_string(),
			log: log.clone(),
		});
		assert_eq!(describe_event(&progress), log.to_string());

		let log = LogEntry::new("submitting", "Finalize endpoint not found; polling anyway");
		let order_progress = PaymentEvent::Order(OrderEvent::Progress {
			order_hash: Some("0x5a1f".to_string()),
			log: log.clone(),
		});
		assert_eq!(describe_event(&order_progress), log.to_string());
	}

	#[test]
	fn test_describe_outcome() {
		let mut state = TransferState::new("t-1");
		state.phase = payment_types::TransferPhase::Error;
		state.error_message = Some("Cancelled".to_string());
		assert_eq!(
			describe_outcome(&PaymentOutcome::Bridge(state)),
			"transfer t-1 error: Cancelled"
		);

		let mut order = payment_types::OrderState::new();
		order.phase = OrderPhase::Executed;
		order.order_hash = Some("0x5a1f".to_string());
		assert_eq!(
			describe_outcome(&PaymentOutcome::Order(order)),
			"order 0x5a1f executed"
		);
	}
}
