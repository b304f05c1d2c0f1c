//! Burn-and-mint transfer handler.
//!
//! Drives one stablecoin transfer through approve, burn, attestation wait and
//! mint. Every phase change is validated against the transition table, logged
//! on the transfer record and published on the event bus. A failure at any step
//! moves the record to the error phase with the failure message attached.
//!
//! Only the registry stablecoins of the two chains can be bridged; any other
//! token pair is rejected before the first transaction.

use super::ensure_running;
use crate::engine::event_bus::EventBus;
use crate::monitoring::{PollError, PollOutcome, PollStop, StatusPoller, StopHandle};
use crate::retry::{with_retry, RetryPolicy};
use crate::state::is_valid_transfer_transition;
use crate::PaymentError;
use payment_attestation::{AttestationService, AttestationStatus};
use payment_account::AccountService;
use payment_config::{AttestationConfig, BridgeConfig};
use payment_delivery::contracts::{
	encode_approve, encode_deposit_for_burn_with_hook, encode_receive_message, BurnParams,
};
use payment_delivery::DeliveryService;
use payment_types::{
	address_to_bytes32, truncate_id, Address, Attestation, ChainDescriptor, ChainRegistry,
	ContractCall, LogEntry, PaymentEvent, TransactionReceipt, TransferEvent, TransferIntent,
	TransferPhase, TransferState, B256, U256,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

/// Tunables of the burn-and-mint flow.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
	pub finality_threshold: u32,
	pub mint_max_attempts: u32,
	pub mint_retry_delay: Duration,
	/// Native balance the recipient needs on the destination chain.
	pub min_destination_gas: U256,
	pub gas_buffer_percent: u64,
	pub attestation_interval: Duration,
	/// `None` waits until stopped.
	pub attestation_timeout: Option<Duration>,
}

impl BridgeSettings {
	pub fn from_config(bridge: &BridgeConfig, attestation: &AttestationConfig) -> Self {
		Self {
			finality_threshold: bridge.finality_threshold,
			mint_max_attempts: bridge.mint_max_attempts.max(1),
			mint_retry_delay: bridge.mint_retry_delay(),
			min_destination_gas: U256::from(bridge.min_destination_gas_wei),
			gas_buffer_percent: bridge.gas_buffer_percent,
			attestation_interval: attestation.poll_interval(),
			attestation_timeout: attestation.timeout(),
		}
	}
}

impl Default for BridgeSettings {
	fn default() -> Self {
		Self::from_config(&BridgeConfig::default(), &AttestationConfig::default())
	}
}

/// A transfer record together with the bus its changes are announced on.
struct TransferRun<'a> {
	state: TransferState,
	event_bus: &'a EventBus,
}

impl<'a> TransferRun<'a> {
	fn new(event_bus: &'a EventBus) -> Self {
		Self {
			state: TransferState::new(Uuid::new_v4().to_string()),
			event_bus,
		}
	}

	fn publish(&self, event: TransferEvent) {
		self.event_bus.publish(PaymentEvent::Transfer(event));
	}

	fn advance(&mut self, phase: TransferPhase, message: impl Into<String>) -> Result<(), PaymentError> {
		let from = self.state.phase;
		if !is_valid_transfer_transition(from, phase) {
			return Err(PaymentError::InvalidTransferTransition { from, to: phase });
		}
		self.state.phase = phase;
		let log = self.state.log(message).clone();
		tracing::info!(
			transfer_id = %truncate_id(&self.state.id),
			from = %from,
			to = %phase,
			"{}",
			log.message
		);
		self.publish(TransferEvent::PhaseChanged {
			transfer_id: self.state.id.clone(),
			phase,
			log,
		});
		Ok(())
	}

	fn progress(&mut self, message: impl Into<String>) {
		let log = self.state.log(message).clone();
		tracing::debug!(transfer_id = %truncate_id(&self.state.id), "{}", log.message);
		self.publish(TransferEvent::Progress {
			transfer_id: self.state.id.clone(),
			log,
		});
	}

	fn fail(&mut self, error: &PaymentError) {
		let message = error.to_string();
		tracing::error!(
			transfer_id = %truncate_id(&self.state.id),
			phase = %self.state.phase,
			kind = %error.kind(),
			error = %message,
			"Transfer failed"
		);
		self.state.error_message = Some(message.clone());
		if !self.state.phase.is_terminal() {
			let failed_in = self.state.phase;
			self.state.phase = TransferPhase::Error;
			let log = self
				.state
				.log(format!("Failed while {}: {}", failed_in, message))
				.clone();
			self.publish(TransferEvent::PhaseChanged {
				transfer_id: self.state.id.clone(),
				phase: TransferPhase::Error,
				log,
			});
		}
		self.publish(TransferEvent::Failed {
			transfer_id: self.state.id.clone(),
			error: message,
		});
	}
}

/// Executes burn-and-mint transfers.
pub struct BridgeTransferHandler {
	registry: Arc<ChainRegistry>,
	delivery: Arc<DeliveryService>,
	attestation: Arc<AttestationService>,
	account: Arc<AccountService>,
	event_bus: EventBus,
	settings: BridgeSettings,
	retry: RetryPolicy,
}

impl BridgeTransferHandler {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		registry: Arc<ChainRegistry>,
		delivery: Arc<DeliveryService>,
		attestation: Arc<AttestationService>,
		account: Arc<AccountService>,
		event_bus: EventBus,
		settings: BridgeSettings,
		retry: RetryPolicy,
	) -> Self {
		Self {
			registry,
			delivery,
			attestation,
			account,
			event_bus,
			settings,
			retry,
		}
	}

	/// Runs one transfer to a terminal phase and returns its record.
	///
	/// Failures never escape as errors; they end the record in
	/// [`TransferPhase::Error`] with `error_message` set. `stop` cancels this
	/// transfer only. It is honoured before the approval, before the burn and
	/// while waiting for the attestation or between mint attempts.
	#[instrument(skip_all, fields(source_chain = intent.source_chain_id, destination_chain = intent.destination_chain_id))]
	pub async fn execute(&self, intent: &TransferIntent, stop: &StopHandle) -> TransferState {
		let mut run = TransferRun::new(&self.event_bus);
		if let Err(e) = self.drive(&mut run, intent, stop).await {
			run.fail(&e);
		}
		run.state
	}

	async fn drive(
		&self,
		run: &mut TransferRun<'_>,
		intent: &TransferIntent,
		stop: &StopHandle,
	) -> Result<(), PaymentError> {
		intent.validate()?;
		let source = self.registry.descriptor(intent.source_chain_id)?;
		let destination = self.registry.descriptor(intent.destination_chain_id)?;
		if !self.registry.is_stablecoin(intent.source_chain_id, &intent.source_token)
			|| !self
				.registry
				.is_stablecoin(intent.destination_chain_id, &intent.destination_token)
		{
			return Err(PaymentError::UnsupportedRoute {
				source_chain: intent.source_chain_id,
				destination_chain: intent.destination_chain_id,
			});
		}
		let owner = self.account.get_address().await?;

		ensure_running(stop)?;
		run.advance(
			TransferPhase::Approving,
			format!(
				"Transferring {} units from {} to {}",
				intent.amount, source.name, destination.name
			),
		)?;
		self.ensure_allowance(run, source, owner, intent.amount).await?;

		ensure_running(stop)?;
		run.advance(TransferPhase::Burning, format!("Burning on {}", source.name))?;
		let burn = self.burn(source, destination, intent).await?;
		run.state.burn_tx_hash = Some(burn.hash.clone());
		run.progress(format!("Burn confirmed: {} (block {})", burn.hash, burn.block_number));

		run.advance(
			TransferPhase::AwaitingAttestation,
			format!("Waiting for attestation of {}", burn.hash),
		)?;
		let attestation = self.await_attestation(run, source, &burn, stop).await?;
		run.state.attestation = Some(attestation.clone());

		run.advance(TransferPhase::Minting, format!("Minting on {}", destination.name))?;
		let mint = self
			.mint(run, destination, intent.recipient, &attestation, stop)
			.await?;
		run.state.mint_tx_hash = Some(mint.hash.clone());

		run.advance(
			TransferPhase::Completed,
			format!("Mint confirmed: {} (block {})", mint.hash, mint.block_number),
		)?;
		run.publish(TransferEvent::Completed {
			transfer_id: run.state.id.clone(),
			burn_tx_hash: burn.hash,
			mint_tx_hash: mint.hash,
		});
		Ok(())
	}

	/// Approves the bridge to spend `amount` unless the allowance already covers it.
	async fn ensure_allowance(
		&self,
		run: &mut TransferRun<'_>,
		source: &ChainDescriptor,
		owner: Address,
		amount: U256,
	) -> Result<(), PaymentError> {
		let (chain_id, token, spender) = (source.chain_id, source.stablecoin, source.bridge_entrypoint);

		let allowance = self
			.delivery
			.get_allowance(chain_id, token, owner, spender)
			.await?;
		if allowance >= amount {
			run.progress(format!("Allowance {} already covers the amount", allowance));
			return Ok(());
		}

		run.progress(format!("Allowance {} is short, approving {}", allowance, amount));
		let call = ContractCall::new(chain_id, token, encode_approve(spender, amount));
		let receipt = self.delivery.deliver(call).await?;
		run.state.approval_tx_hash = Some(receipt.hash.clone());
		run.progress(format!("Approval confirmed: {}", receipt.hash));

		let allowance = self
			.delivery
			.get_allowance(chain_id, token, owner, spender)
			.await?;
		if allowance < amount {
			return Err(PaymentError::ContractExecution(format!(
				"allowance {} still below {} after approval",
				allowance, amount
			)));
		}
		Ok(())
	}

	async fn burn(
		&self,
		source: &ChainDescriptor,
		destination: &ChainDescriptor,
		intent: &TransferIntent,
	) -> Result<TransactionReceipt, PaymentError> {
		let params = BurnParams {
			amount: intent.amount,
			destination_domain: destination.domain,
			mint_recipient: intent.recipient,
			burn_token: source.stablecoin,
			destination_caller: B256::ZERO,
			max_fee: intent.amount.saturating_sub(U256::from(1)),
			min_finality_threshold: self.settings.finality_threshold,
			hook_data: intent.hook_data.clone(),
		};
		tracing::debug!(
			domain = destination.domain,
			recipient = %address_to_bytes32(&intent.recipient),
			"Encoding burn"
		);
		let call = ContractCall::new(
			source.chain_id,
			source.bridge_entrypoint,
			encode_deposit_for_burn_with_hook(&params),
		);
		Ok(self.delivery.deliver(call).await?)
	}

	/// Polls the attestation service until the burn's message is complete.
	///
	/// A burn the service has not indexed yet and a message that is not
	/// complete both keep polling. Rate limits are retried; any other service
	/// failure ends the wait.
	async fn await_attestation(
		&self,
		run: &mut TransferRun<'_>,
		source: &ChainDescriptor,
		burn: &TransactionReceipt,
		stop: &StopHandle,
	) -> Result<Attestation, PaymentError> {
		let poller = StatusPoller::new(self.settings.attestation_interval)
			.with_timeout(self.settings.attestation_timeout)
			.with_stop_handle(stop.clone());
		let tx_hash = burn.hash.to_string();
		let transfer_id = run.state.id.clone();
		let attempts: Mutex<Vec<LogEntry>> = Mutex::new(Vec::new());

		let result = poller
			.run(|attempt| {
				let (tx_hash, transfer_id, attempts) = (&tx_hash, &transfer_id, &attempts);
				async move {
					let checked = with_retry(&self.retry, "attestation", || {
						self.attestation.check(source.domain, tx_hash)
					})
					.await;
					let (outcome, status) = match checked {
						Ok(AttestationStatus::Complete(attestation)) => {
							(PollOutcome::Ready(attestation), "complete".to_string())
						},
						Ok(AttestationStatus::NotFound) => {
							let status = "not indexed yet".to_string();
							(PollOutcome::Pending(status.clone()), status)
						},
						Ok(AttestationStatus::Pending(status)) => {
							(PollOutcome::Pending(status.clone()), status)
						},
						Err(e) => {
							tracing::warn!(attempt, error = %e, "Attestation retrieval failed");
							return Err(PaymentError::Attestation(e));
						},
					};

					let log = LogEntry::new(
						TransferPhase::AwaitingAttestation.as_str(),
						format!("Attestation poll {}: {}", attempt, status),
					);
					self.event_bus.publish(PaymentEvent::Transfer(TransferEvent::Progress {
						transfer_id: transfer_id.clone(),
						log: log.clone(),
					}));
					if let Ok(mut attempts) = attempts.lock() {
						attempts.push(log);
					}
					Ok(outcome)
				}
			})
			.await;

		if let Ok(mut attempts) = attempts.lock() {
			run.state.logs.append(&mut attempts);
		}

		result.map_err(|e| match e {
			PollError::Probe(e) => e,
			PollError::Stopped(PollStop::Cancelled) => PaymentError::Cancelled,
			PollError::Stopped(PollStop::TimedOut { elapsed }) => {
				PaymentError::AttestationTimeout(elapsed)
			},
			PollError::Stopped(PollStop::Exhausted { .. }) => PaymentError::AttestationTimeout(
				self.settings.attestation_timeout.unwrap_or_default(),
			),
		})
	}

	/// Switches the wallet, checks the recipient can pay for gas and submits
	/// the mint, retrying up to the configured number of attempts.
	async fn mint(
		&self,
		run: &mut TransferRun<'_>,
		destination: &ChainDescriptor,
		recipient: Address,
		attestation: &Attestation,
		stop: &StopHandle,
	) -> Result<TransactionReceipt, PaymentError> {
		if let Err(e) = self.account.switch_chain(destination.chain_id).await {
			tracing::warn!(chain_id = destination.chain_id, error = %e, "Chain switch failed");
			run.progress(format!(
				"Could not switch wallet to {} ({}); switch manually if prompted",
				destination.name, e
			));
		}

		let balance = self
			.delivery
			.get_native_balance(destination.chain_id, recipient)
			.await?;
		let required = self.settings.min_destination_gas;
		if balance < required {
			return Err(PaymentError::InsufficientGas { balance, required });
		}

		let data = encode_receive_message(&attestation.message, &attestation.attestation);
		let max_attempts = self.settings.mint_max_attempts;
		let mut attempt = 0;
		loop {
			attempt += 1;
			let call = ContractCall::new(destination.chain_id, destination.attestation_verifier, data.clone());
			match self.submit_mint(call).await {
				Ok(receipt) => return Ok(receipt),
				Err(e) if attempt < max_attempts => {
					run.progress(format!(
						"Mint attempt {}/{} failed: {}; retrying in {}s",
						attempt,
						max_attempts,
						e,
						self.settings.mint_retry_delay.as_secs()
					));
					tokio::time::sleep(self.settings.mint_retry_delay).await;
					ensure_running(stop)?;
				},
				Err(e) => return Err(e),
			}
		}
	}

	async fn submit_mint(&self, call: ContractCall) -> Result<TransactionReceipt, PaymentError> {
		let gas = self.delivery.estimate_gas(&call).await?;
		let buffered = gas.saturating_add(gas.saturating_mul(self.settings.gas_buffer_percent) / 100);
		let fees = self.delivery.estimate_fees(call.chain_id).await?;
		let call = call.with_gas_limit(buffered).with_fees(fees);
		Ok(self.delivery.deliver(call).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{local_account, FakeChain, ScriptedAttestation, Shared};
	use alloy::sol_types::SolCall;
	use payment_attestation::{AttestationError, AttestationInterface};
	use payment_delivery::contracts::ITokenMessengerV2::depositForBurnWithHookCall;
	use payment_delivery::DeliveryInterface;
	use payment_types::chains::{AVALANCHE_FUJI, ETHEREUM_SEPOLIA};
	use payment_types::{address_to_bytes32, Bytes, B256};
	use std::sync::atomic::Ordering;

	const AMOUNT: u64 = 10_000_000;

	fn settings() -> BridgeSettings {
		BridgeSettings {
			finality_threshold: 1000,
			mint_max_attempts: 3,
			mint_retry_delay: Duration::from_secs(5),
			min_destination_gas: U256::from(10_000_000_000_000_000u64),
			gas_buffer_percent: 50,
			attestation_interval: Duration::from_secs(5),
			attestation_timeout: Some(Duration::from_secs(1800)),
		}
	}

	struct Fixture {
		handler: BridgeTransferHandler,
		chain: Arc<FakeChain>,
		attestation: Arc<ScriptedAttestation>,
		event_bus: EventBus,
	}

	fn fixture_with(chain: FakeChain, attestation: ScriptedAttestation, settings: BridgeSettings) -> Fixture {
		let chain = Arc::new(chain);
		let attestation = Arc::new(attestation);
		let event_bus = EventBus::new(256);
		let handler = BridgeTransferHandler::new(
			Arc::new(ChainRegistry::testnet()),
			Arc::new(DeliveryService::new(chain.clone() as Arc<dyn DeliveryInterface>)),
			Arc::new(AttestationService::new(
				Box::new(Shared(attestation.clone())) as Box<dyn AttestationInterface>
			)),
			local_account(),
			event_bus.clone(),
			settings,
			RetryPolicy::default(),
		);
		Fixture {
			handler,
			chain,
			attestation,
			event_bus,
		}
	}

	fn fixture(chain: FakeChain) -> Fixture {
		fixture_with(chain, ScriptedAttestation::eventually_complete(), settings())
	}

	fn intent() -> TransferIntent {
		let registry = ChainRegistry::testnet();
		TransferIntent::new(
			ETHEREUM_SEPOLIA,
			registry.stablecoin_address(ETHEREUM_SEPOLIA).unwrap(),
			AVALANCHE_FUJI,
			registry.stablecoin_address(AVALANCHE_FUJI).unwrap(),
			U256::from(AMOUNT),
			Address::repeat_byte(0x42),
		)
		.unwrap()
	}

	#[tokio::test(start_paused = true)]
	async fn test_transfer_completes() {
		let f = fixture(FakeChain::new());
		let mut events = f.event_bus.subscribe();

		let state = f.handler.execute(&intent(), &StopHandle::new()).await;

		assert_eq!(state.phase, TransferPhase::Completed, "{:?}", state.error_message);
		assert!(state.approval_tx_hash.is_some());
		assert!(state.burn_tx_hash.is_some());
		assert!(state.mint_tx_hash.is_some());
		assert_eq!(state.attestation.as_ref().unwrap().message, Bytes::from(vec![1, 2]));
		assert_eq!(f.attestation.calls.load(Ordering::SeqCst), 3);
		assert_eq!(f.chain.calls_with_selector(FakeChain::mint_selector()).len(), 1);

		let mint = &f.chain.calls_with_selector(FakeChain::mint_selector())[0];
		assert_eq!(mint.chain_id, AVALANCHE_FUJI);
		assert_eq!(mint.gas_limit, Some(300_000));

		let mut phases = vec![TransferPhase::Idle];
		let mut completed = false;
		while let Ok(event) = events.try_recv() {
			match event {
				PaymentEvent::Transfer(TransferEvent::PhaseChanged { phase, .. }) => phases.push(phase),
				PaymentEvent::Transfer(TransferEvent::Completed { .. }) => completed = true,
				_ => {},
			}
		}
		assert!(completed);
		assert_eq!(phases.last(), Some(&TransferPhase::Completed));
		for pair in phases.windows(2) {
			assert!(is_valid_transfer_transition(pair[0], pair[1]));
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_sufficient_allowance_skips_approval() {
		let f = fixture(FakeChain::new().with_allowance(U256::from(AMOUNT)));

		let first = f.handler.execute(&intent(), &StopHandle::new()).await;
		assert_eq!(first.phase, TransferPhase::Completed);
		assert!(first.approval_tx_hash.is_none());
		assert!(f.chain.calls_with_selector(FakeChain::approve_selector()).is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_approval_not_reflected_fails() {
		let mut chain = FakeChain::new();
		chain.approval_sticks = false;
		let f = fixture(chain);

		let state = f.handler.execute(&intent(), &StopHandle::new()).await;

		assert_eq!(state.phase, TransferPhase::Error);
		assert!(state.approval_tx_hash.is_some());
		assert!(state.burn_tx_hash.is_none());
		assert!(state.error_message.unwrap().contains("still below"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_reverted_burn_stops_before_attestation() {
		let mut chain = FakeChain::new();
		chain.revert_burn = true;
		let f = fixture(chain);

		let state = f.handler.execute(&intent(), &StopHandle::new()).await;

		assert_eq!(state.phase, TransferPhase::Error);
		assert!(state.burn_tx_hash.is_none());
		assert_eq!(f.attestation.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_attestation_timeout() {
		let mut settings = settings();
		settings.attestation_timeout = Some(Duration::from_secs(60));
		let f = fixture_with(FakeChain::new(), ScriptedAttestation::new(vec![]), settings);

		let state = f.handler.execute(&intent(), &StopHandle::new()).await;

		assert_eq!(state.phase, TransferPhase::Error);
		assert!(state.burn_tx_hash.is_some());
		assert!(state.error_message.unwrap().contains("Attestation not available"));
		assert!(f.attestation.calls.load(Ordering::SeqCst) >= 12);
		assert!(f.chain.calls_with_selector(FakeChain::mint_selector()).is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_every_attestation_poll_is_logged() {
		let f = fixture(FakeChain::new());
		let state = f.handler.execute(&intent(), &StopHandle::new()).await;

		let polls = state
			.logs
			.iter()
			.filter(|log| log.message.starts_with("Attestation poll"))
			.count();
		assert_eq!(polls, 3);
	}

	#[tokio::test(start_paused = true)]
	async fn test_insufficient_destination_gas() {
		let mut chain = FakeChain::new();
		chain.native_balance = U256::from(1_000u64);
		let f = fixture(chain);

		let state = f.handler.execute(&intent(), &StopHandle::new()).await;

		assert_eq!(state.phase, TransferPhase::Error);
		assert!(state.attestation.is_some());
		assert!(state.error_message.unwrap().contains("Insufficient gas"));
		assert!(f.chain.calls_with_selector(FakeChain::mint_selector()).is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_mint_retried_until_success() {
		let chain = FakeChain::new();
		chain.failing_mints.store(2, Ordering::SeqCst);
		let f = fixture(chain);

		let state = f.handler.execute(&intent(), &StopHandle::new()).await;

		assert_eq!(state.phase, TransferPhase::Completed);
		assert_eq!(f.chain.calls_with_selector(FakeChain::mint_selector()).len(), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn test_mint_gives_up_after_max_attempts() {
		let chain = FakeChain::new();
		chain.failing_mints.store(5, Ordering::SeqCst);
		let f = fixture(chain);

		let state = f.handler.execute(&intent(), &StopHandle::new()).await;

		assert_eq!(state.phase, TransferPhase::Error);
		assert!(state.mint_tx_hash.is_none());
		assert_eq!(f.chain.calls_with_selector(FakeChain::mint_selector()).len(), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn test_stopped_run_submits_nothing() {
		let f = fixture(FakeChain::new());
		let stop = StopHandle::new();
		stop.stop();

		let state = f.handler.execute(&intent(), &stop).await;

		assert_eq!(state.phase, TransferPhase::Error);
		assert_eq!(state.error_message.as_deref(), Some("Cancelled"));
		assert!(state.approval_tx_hash.is_none());
		assert!(f.chain.submitted.lock().unwrap().is_empty());
		assert_eq!(f.attestation.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_stop_cancels_attestation_wait() {
		let f = fixture_with(FakeChain::new(), ScriptedAttestation::new(vec![]), settings());
		let stop = StopHandle::new();

		let handle = stop.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_secs(30)).await;
			handle.stop();
		});
		let state = f.handler.execute(&intent(), &stop).await;

		assert_eq!(state.phase, TransferPhase::Error);
		assert_eq!(state.error_message.as_deref(), Some("Cancelled"));
		assert!(state.burn_tx_hash.is_some());
		assert!(f.attestation.calls.load(Ordering::SeqCst) >= 1);
		assert!(f.chain.calls_with_selector(FakeChain::mint_selector()).is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_stopping_one_run_leaves_the_next_alone() {
		let f = fixture(FakeChain::new());
		let stopped = StopHandle::new();
		stopped.stop();

		let first = f.handler.execute(&intent(), &stopped).await;
		let second = f.handler.execute(&intent(), &StopHandle::new()).await;

		assert_eq!(first.phase, TransferPhase::Error);
		assert_eq!(second.phase, TransferPhase::Completed, "{:?}", second.error_message);
	}

	#[tokio::test(start_paused = true)]
	async fn test_burn_call_parameters() {
		let f = fixture(FakeChain::new());
		let hook = Bytes::from(vec![0xca, 0xfe]);
		let recipient = Address::repeat_byte(0x42);

		let state = f
			.handler
			.execute(&intent().with_hook_data(hook.clone()), &StopHandle::new())
			.await;
		assert_eq!(state.phase, TransferPhase::Completed, "{:?}", state.error_message);

		let burns = f.chain.calls_with_selector(FakeChain::burn_selector());
		assert_eq!(burns.len(), 1);
		assert_eq!(burns[0].chain_id, ETHEREUM_SEPOLIA);
		let call = depositForBurnWithHookCall::abi_decode(&burns[0].data).unwrap();

		let registry = ChainRegistry::testnet();
		assert_eq!(call.amount, U256::from(AMOUNT));
		assert_eq!(call.destinationDomain, 1);
		assert_eq!(call.mintRecipient, address_to_bytes32(&recipient));
		assert!(call.mintRecipient[..12].iter().all(|b| *b == 0));
		assert_eq!(call.burnToken, registry.stablecoin_address(ETHEREUM_SEPOLIA).unwrap());
		assert_eq!(call.destinationCaller, B256::ZERO);
		assert_eq!(call.maxFee, U256::from(AMOUNT - 1));
		assert_eq!(call.minFinalityThreshold, 1000);
		assert_eq!(call.hookData, hook);

		let domains = f.attestation.domains.lock().unwrap().clone();
		assert_eq!(domains.len(), 3);
		assert!(domains.iter().all(|domain| *domain == 0));
	}

	#[tokio::test(start_paused = true)]
	async fn test_non_stablecoin_rejected_before_approval() {
		let f = fixture(FakeChain::new());
		let mut bad = intent();
		bad.source_token = Address::repeat_byte(0x99);

		let state = f.handler.execute(&bad, &StopHandle::new()).await;

		assert_eq!(state.phase, TransferPhase::Error);
		assert!(state.error_message.unwrap().contains("No protocol supports"));
		assert!(f.chain.submitted.lock().unwrap().is_empty());

		let mut bad = intent();
		bad.destination_token = Address::repeat_byte(0x99);
		let state = f.handler.execute(&bad, &StopHandle::new()).await;
		assert_eq!(state.phase, TransferPhase::Error);
		assert!(f.chain.submitted.lock().unwrap().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_attestation_server_error_fails_transfer() {
		let f = fixture_with(
			FakeChain::new(),
			ScriptedAttestation::new(vec![
				Err(AttestationError::Http {
					status: 500,
					body: "internal error".to_string(),
				}),
				Ok(Some(vec![ScriptedAttestation::message("complete")])),
			]),
			settings(),
		);

		let state = f.handler.execute(&intent(), &StopHandle::new()).await;

		assert_eq!(state.phase, TransferPhase::Error);
		assert!(state.burn_tx_hash.is_some());
		assert!(state.attestation.is_none());
		assert!(state.error_message.unwrap().contains("500"));
		assert_eq!(f.attestation.calls.load(Ordering::SeqCst), 1);
		assert!(f.chain.calls_with_selector(FakeChain::mint_selector()).is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_attestation_rate_limit_is_retried() {
		let f = fixture_with(
			FakeChain::new(),
			ScriptedAttestation::new(vec![
				Err(AttestationError::RateLimited("slow down".to_string())),
				Ok(Some(vec![ScriptedAttestation::message("complete")])),
			]),
			settings(),
		);

		let state = f.handler.execute(&intent(), &StopHandle::new()).await;

		assert_eq!(state.phase, TransferPhase::Completed, "{:?}", state.error_message);
		assert_eq!(f.attestation.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn test_unsupported_chain() {
		let f = fixture(FakeChain::new());
		let mut bad = intent();
		bad.destination_chain_id = 999;

		let state = f.handler.execute(&bad, &StopHandle::new()).await;

		assert_eq!(state.phase, TransferPhase::Error);
		assert!(f.chain.submitted.lock().unwrap().is_empty());
	}
}
