//! Payment engine coordinating routing and both settlement protocols.
//!
//! The engine is the single entry point callers use: it picks a route for an
//! intent, enriches it with a quote, dispatches to the handler of the chosen
//! protocol and archives the terminal state of every run.
//!
//! Every run takes its own [`StopHandle`]; stopping one payment leaves the
//! engine and any other payment untouched.

pub mod event_bus;

use crate::handlers::{BridgeTransferHandler, SignedOrderHandler};
use crate::monitoring::StopHandle;
use crate::retry::{with_retry, RetryPolicy};
use crate::routing::{effective_intent, RouteSelector};
use crate::PaymentError;
use payment_account::AccountService;
use payment_config::Config;
use payment_order::OrderService;
use payment_storage::{StorageKey, StorageService};
use payment_types::{
	truncate_id, ChainRegistry, OrderPhase, OrderState, PaymentEvent, PaymentPreference,
	PreparedOrder, Protocol, RouteDecision, TransferIntent, TransferPhase, TransferState,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::instrument;

/// Terminal record of a payment, by protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
	Bridge(TransferState),
	Order(OrderState),
}

impl PaymentOutcome {
	/// Whether the payment settled.
	pub fn is_success(&self) -> bool {
		match self {
			PaymentOutcome::Bridge(state) => state.phase == TransferPhase::Completed,
			PaymentOutcome::Order(state) => state.phase == OrderPhase::Executed,
		}
	}

	pub fn error_message(&self) -> Option<&str> {
		match self {
			PaymentOutcome::Bridge(state) => state.error_message.as_deref(),
			PaymentOutcome::Order(state) => state.error_message.as_deref(),
		}
	}
}

/// Main payment engine.
pub struct PaymentEngine {
	config: Config,
	registry: Arc<ChainRegistry>,
	selector: RouteSelector,
	bridge: BridgeTransferHandler,
	orders: SignedOrderHandler,
	order_service: Arc<OrderService>,
	storage: Arc<StorageService>,
	event_bus: event_bus::EventBus,
	retry: RetryPolicy,
}

impl PaymentEngine {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		config: Config,
		registry: Arc<ChainRegistry>,
		bridge: BridgeTransferHandler,
		orders: SignedOrderHandler,
		order_service: Arc<OrderService>,
		storage: Arc<StorageService>,
		event_bus: event_bus::EventBus,
	) -> Self {
		let selector = RouteSelector::new(
			registry.clone(),
			config.routing.signed_order_chains.iter().copied(),
		);
		let retry = RetryPolicy::from(&config.retry);
		Self {
			config,
			registry,
			selector,
			bridge,
			orders,
			order_service,
			storage,
			event_bus,
			retry,
		}
	}

	/// Chooses the protocol for `intent`.
	pub fn route(
		&self,
		intent: &TransferIntent,
		preferences: &[PaymentPreference],
	) -> Result<RouteDecision, PaymentError> {
		self.selector.select(intent, preferences)
	}

	/// Adds the order service's fee and duration estimate to a decision.
	///
	/// A missing or failed quote leaves the decision unchanged.
	pub async fn quote(&self, decision: RouteDecision, intent: &TransferIntent) -> RouteDecision {
		match with_retry(&self.retry, "route", || {
			self.order_service.quote(&decision, intent)
		})
		.await
		{
			Ok(Some(quote)) => decision.with_quote(quote),
			Ok(None) => {
				tracing::debug!("Route quote carried no estimate");
				decision
			},
			Err(e) => {
				tracing::warn!(error = %e, "Route quote unavailable");
				decision
			},
		}
	}

	/// Runs a burn-and-mint transfer and archives its terminal state.
	pub async fn execute_bridge(&self, intent: &TransferIntent, stop: &StopHandle) -> TransferState {
		let state = self.bridge.execute(intent, stop).await;
		self.archive(StorageKey::Transfers, &state.id, &state).await;
		state
	}

	/// Requests an unsigned order for `intent`.
	pub async fn prepare_order(&self, intent: &TransferIntent) -> Result<PreparedOrder, PaymentError> {
		self.orders.prepare(intent).await
	}

	/// Signs a prepared order with `signer`, submits and polls it, then
	/// archives its terminal state.
	pub async fn sign_and_submit(
		&self,
		order: &PreparedOrder,
		signer: &AccountService,
		stop: &StopHandle,
	) -> OrderState {
		let state = self.orders.sign_and_submit(order, signer, stop).await;
		self.archive_order(&state).await;
		state
	}

	/// Runs a signed order end to end and archives its terminal state.
	pub async fn execute_order(&self, intent: &TransferIntent, stop: &StopHandle) -> OrderState {
		let state = self.orders.execute(intent, stop).await;
		self.archive_order(&state).await;
		state
	}

	/// Routes, quotes and executes a payment.
	///
	/// Only routing failures are returned as errors; execution failures end
	/// in the error phase of the returned record. Triggering `stop` cancels
	/// this payment.
	#[instrument(skip_all, fields(source_chain = intent.source_chain_id, destination_chain = intent.destination_chain_id))]
	pub async fn pay(
		&self,
		intent: &TransferIntent,
		preferences: &[PaymentPreference],
		stop: &StopHandle,
	) -> Result<PaymentOutcome, PaymentError> {
		let decision = self.route(intent, preferences)?;
		let decision = self.quote(decision, intent).await;
		self.event_bus
			.publish(PaymentEvent::RouteSelected(decision.clone()));

		let intent = effective_intent(intent, &decision);
		let outcome = match decision.protocol {
			Protocol::Bridge => PaymentOutcome::Bridge(self.execute_bridge(&intent, stop).await),
			Protocol::SignedOrder => PaymentOutcome::Order(self.execute_order(&intent, stop).await),
		};
		Ok(outcome)
	}

	async fn archive_order(&self, state: &OrderState) {
		match state.order_hash.as_deref() {
			Some(hash) => self.archive(StorageKey::Orders, hash, state).await,
			None => tracing::debug!("Order failed before a hash was assigned, not archived"),
		}
	}

	async fn archive<T: Serialize>(&self, namespace: StorageKey, id: &str, state: &T) {
		if let Err(e) = self.storage.store(namespace, id, state).await {
			tracing::warn!(
				namespace = %namespace,
				id = %truncate_id(id),
				error = %e,
				"Failed to archive payment state"
			);
		}
	}

	pub fn subscribe(&self) -> broadcast::Receiver<PaymentEvent> {
		self.event_bus.subscribe()
	}

	pub fn event_bus(&self) -> &event_bus::EventBus {
		&self.event_bus
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn registry(&self) -> &Arc<ChainRegistry> {
		&self.registry
	}

	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}
}
