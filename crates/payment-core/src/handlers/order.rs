//! Signed-order handler.
//!
//! Takes an order built by the order service, has the paying account sign its
//! typed data, hands the signature back to the service and polls the relayer
//! until the order reaches a terminal status or the poll budget runs out.
//!
//! Orders built outside the handler can be signed by any account the caller
//! supplies; orders the handler prepares itself are signed by its own account.

use super::ensure_running;
use crate::engine::event_bus::EventBus;
use crate::monitoring::{PollStop, StatusPoller, StopHandle};
use crate::retry::{with_retry, RetryPolicy};
use crate::state::is_valid_order_transition;
use crate::PaymentError;
use payment_account::AccountService;
use payment_order::{OrderService, OrderServiceError};
use payment_types::{
	truncate_id, OrderEvent, OrderPhase, OrderState, PaymentEvent, PreparedOrder, TransferIntent,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

const MISSING_SIGNING_DATA: &str = "Missing required data for order signing";

/// An order record together with the bus its changes are announced on.
struct OrderRun<'a> {
	state: OrderState,
	event_bus: &'a EventBus,
}

impl<'a> OrderRun<'a> {
	fn new(event_bus: &'a EventBus) -> Self {
		Self {
			state: OrderState::new(),
			event_bus,
		}
	}

	fn publish(&self, event: OrderEvent) {
		self.event_bus.publish(PaymentEvent::Order(event));
	}

	fn order_id(&self) -> String {
		self.state
			.order_hash
			.as_deref()
			.map(truncate_id)
			.unwrap_or_else(|| "-".to_string())
	}

	fn advance(&mut self, phase: OrderPhase, message: impl Into<String>) -> Result<(), PaymentError> {
		let from = self.state.phase;
		if !is_valid_order_transition(from, phase) {
			return Err(PaymentError::InvalidOrderTransition { from, to: phase });
		}
		self.state.phase = phase;
		let log = self.state.log(message).clone();
		tracing::info!(order_hash = %self.order_id(), from = %from, to = %phase, "{}", log.message);
		self.publish(OrderEvent::PhaseChanged {
			order_hash: self.state.order_hash.clone(),
			phase,
			log,
		});
		if phase.is_terminal() {
			self.publish(OrderEvent::Finished {
				order_hash: self.state.order_hash.clone(),
				phase,
			});
		}
		Ok(())
	}

	fn note(&mut self, message: impl Into<String>) {
		let log = self.state.log(message).clone();
		tracing::debug!(order_hash = %self.order_id(), "{}", log.message);
		self.publish(OrderEvent::Progress {
			order_hash: self.state.order_hash.clone(),
			log,
		});
	}

	fn fail(&mut self, error: &PaymentError) {
		let message = error.to_string();
		tracing::error!(
			order_hash = %self.order_id(),
			phase = %self.state.phase,
			kind = %error.kind(),
			error = %message,
			"Order failed"
		);
		self.state.error_message = Some(message.clone());
		if self.state.phase.is_terminal() {
			return;
		}
		let failed_in = self.state.phase;
		self.state.phase = OrderPhase::Error;
		let log = self
			.state
			.log(format!("Failed while {}: {}", failed_in, message))
			.clone();
		self.publish(OrderEvent::PhaseChanged {
			order_hash: self.state.order_hash.clone(),
			phase: OrderPhase::Error,
			log,
		});
		self.publish(OrderEvent::Finished {
			order_hash: self.state.order_hash.clone(),
			phase: OrderPhase::Error,
		});
	}
}

/// Executes signed orders.
pub struct SignedOrderHandler {
	order_service: Arc<OrderService>,
	account: Arc<AccountService>,
	event_bus: EventBus,
	poll_interval: Duration,
	max_poll_attempts: u32,
	retry: RetryPolicy,
}

impl SignedOrderHandler {
	pub fn new(
		order_service: Arc<OrderService>,
		account: Arc<AccountService>,
		event_bus: EventBus,
		poll_interval: Duration,
		max_poll_attempts: u32,
		retry: RetryPolicy,
	) -> Self {
		Self {
			order_service,
			account,
			event_bus,
			poll_interval,
			max_poll_attempts,
			retry,
		}
	}

	/// Requests an unsigned order for `intent`.
	///
	/// The sender defaults to the account address when the intent names none.
	pub async fn prepare(&self, intent: &TransferIntent) -> Result<PreparedOrder, PaymentError> {
		intent.validate()?;
		let intent = match intent.sender {
			Some(_) => intent.clone(),
			None => intent.clone().with_sender(self.account.get_address().await?),
		};
		let order = with_retry(&self.retry, "process", || self.order_service.prepare(&intent)).await?;
		tracing::info!(order_hash = %truncate_id(&order.order_hash), "Order prepared");
		Ok(order)
	}

	/// Prepares, signs and submits an order, then polls it to a terminal phase.
	///
	/// The order is signed by the handler's own account. `stop` cancels this
	/// order only.
	#[instrument(skip_all, fields(source_chain = intent.source_chain_id, destination_chain = intent.destination_chain_id))]
	pub async fn execute(&self, intent: &TransferIntent, stop: &StopHandle) -> OrderState {
		let mut run = OrderRun::new(&self.event_bus);
		let result: Result<(), PaymentError> = async {
			run.advance(OrderPhase::Preparing, "Requesting order from the order service")?;
			let order = self.prepare(intent).await?;
			self.drive(&mut run, &order, &self.account, stop).await
		}
		.await;
		if let Err(e) = result {
			run.fail(&e);
		}
		run.state
	}

	/// Signs `order` with `signer`, submits it and polls it.
	#[instrument(skip_all, fields(order_hash = %truncate_id(&order.order_hash)))]
	pub async fn sign_and_submit(
		&self,
		order: &PreparedOrder,
		signer: &AccountService,
		stop: &StopHandle,
	) -> OrderState {
		let mut run = OrderRun::new(&self.event_bus);
		let result: Result<(), PaymentError> = async {
			run.advance(OrderPhase::Preparing, "Using prepared order")?;
			self.drive(&mut run, order, signer, stop).await
		}
		.await;
		if let Err(e) = result {
			run.fail(&e);
		}
		run.state
	}

	async fn drive(
		&self,
		run: &mut OrderRun<'_>,
		order: &PreparedOrder,
		signer: &AccountService,
		stop: &StopHandle,
	) -> Result<(), PaymentError> {
		run.state.order_hash = Some(order.order_hash.clone());

		ensure_running(stop)?;
		run.advance(OrderPhase::Signing, "Requesting typed-data signature")?;
		let payload = order
			.data_to_sign
			.complete()
			.ok_or_else(|| PaymentError::MalformedOrder(MISSING_SIGNING_DATA.to_string()))?;
		let signature = signer.sign_typed_data(&payload).await?;
		run.state.signature = Some(signature.clone());

		ensure_running(stop)?;
		run.advance(OrderPhase::Submitting, "Submitting signed order")?;
		match with_retry(&self.retry, "finalize", || {
			self.order_service.finalize(order, &signature)
		})
		.await
		{
			Ok(()) => run.note("Order accepted by the order service"),
			Err(OrderServiceError::NotFound(reason)) => {
				tracing::warn!(reason = %reason, "Finalize endpoint not found, polling anyway");
				run.note(format!("Finalize endpoint not found ({}); polling anyway", reason));
			},
			Err(e) => return Err(e.into()),
		}

		run.advance(OrderPhase::Pending, "Waiting for the relayer to execute the order")?;
		self.poll(run, &order.order_hash, stop).await
	}

	async fn poll(
		&self,
		run: &mut OrderRun<'_>,
		order_hash: &str,
		stop: &StopHandle,
	) -> Result<(), PaymentError> {
		let poller = StatusPoller::new(self.poll_interval)
			.with_max_attempts(self.max_poll_attempts)
			.with_stop_handle(stop.clone());
		let mut ticker = poller.ticker();
		let max = self.max_poll_attempts;

		loop {
			let attempt = match ticker.tick().await {
				Ok(attempt) => attempt,
				Err(PollStop::Cancelled) => return Err(PaymentError::Cancelled),
				Err(PollStop::Exhausted { attempts }) => {
					return Err(PaymentError::PollingTimeout { attempts });
				},
				Err(PollStop::TimedOut { .. }) => {
					return Err(PaymentError::PollingTimeout {
						attempts: ticker.attempts(),
					});
				},
			};
			run.state.poll_attempts = attempt;

			match with_retry(&self.retry, "status", || self.order_service.status(order_hash)).await {
				Ok(Some(status)) => {
					run.state.poll_status = Some(status.clone());
					run.publish(OrderEvent::StatusPolled {
						order_hash: order_hash.to_string(),
						status: status.clone(),
						attempt,
					});
					if let Some(phase) = OrderPhase::from_relayer_status(&status) {
						return run.advance(phase, format!("Relayer reported {}", status));
					}
					run.note(format!("Poll {}/{}: {}", attempt, max, status));
				},
				Ok(None) => run.note(format!("Poll {}/{}: no status yet", attempt, max)),
				Err(e) => {
					tracing::warn!(attempt, error = %e, "Status poll failed");
					run.note(format!("Poll {}/{} failed: {}", attempt, max, e));
				},
			}
		}
	}
}
