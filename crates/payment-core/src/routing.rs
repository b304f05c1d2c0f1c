//! Route selection.
//!
//! Decides which settlement protocol serves a transfer. Recipient preferences
//! may redirect the destination first; the stablecoin bridge is chosen when
//! both ends are its native stablecoin on supported chains, the signed-order
//! protocol otherwise. A pair neither protocol reaches is rejected.

use crate::PaymentError;
use payment_types::utils::to_whole_tokens;
use payment_types::{
	ChainRegistry, PaymentPreference, Protocol, RouteDecision, TransferIntent,
};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;

/// Decimals assumed for source tokens the registry does not describe.
const DEFAULT_DECIMALS: u8 = 6;

/// Pure decision function over the registry and the signed-order chain set.
pub struct RouteSelector {
	registry: Arc<ChainRegistry>,
	signed_order_chains: HashSet<u64>,
}

impl RouteSelector {
	pub fn new(registry: Arc<ChainRegistry>, signed_order_chains: impl IntoIterator<Item = u64>) -> Self {
		Self {
			registry,
			signed_order_chains: signed_order_chains.into_iter().collect(),
		}
	}

	/// Picks the preference that applies to this intent.
	///
	/// The first preference whose conditions all hold wins, then the one
	/// flagged as default, then the first entry.
	pub fn select_preference<'a>(
		&self,
		intent: &TransferIntent,
		preferences: &'a [PaymentPreference],
	) -> Option<&'a PaymentPreference> {
		let decimals = self
			.registry
			.descriptor(intent.source_chain_id)
			.map(|chain| chain.stablecoin_decimals)
			.unwrap_or(DEFAULT_DECIMALS);
		let amount = to_whole_tokens(intent.amount, decimals).unwrap_or(Decimal::MAX);

		preferences
			.iter()
			.find(|pref| pref.matches(amount, &intent.source_token))
			.or_else(|| preferences.iter().find(|pref| pref.is_default))
			.or_else(|| preferences.first())
	}

	fn bridge_eligible(&self, intent: &TransferIntent, decision: &RouteDecision) -> bool {
		let registry = &self.registry;
		registry.is_bridge_supported(decision.source_chain_id)
			&& registry.is_bridge_supported(decision.destination_chain_id)
			&& registry.is_stablecoin(decision.source_chain_id, &intent.source_token)
			&& registry.is_stablecoin(decision.destination_chain_id, &decision.destination_token)
	}

	/// Chooses the protocol for `intent`, applying recipient preferences.
	pub fn select(
		&self,
		intent: &TransferIntent,
		preferences: &[PaymentPreference],
	) -> Result<RouteDecision, PaymentError> {
		intent.validate()?;

		let mut decision = RouteDecision {
			protocol: Protocol::SignedOrder,
			source_chain_id: intent.source_chain_id,
			destination_chain_id: intent.destination_chain_id,
			destination_token: intent.destination_token,
			recipient: intent.recipient,
			estimated_fee: None,
			estimated_duration_seconds: None,
		};

		if let Some(pref) = self.select_preference(intent, preferences) {
			decision.destination_chain_id = pref.chain_id;
			decision.destination_token = pref.token;
			if let Some(wallet) = pref.wallet_address {
				decision.recipient = wallet;
			}
		}

		if self.bridge_eligible(intent, &decision) {
			decision.protocol = Protocol::Bridge;
		} else if self.signed_order_chains.contains(&decision.source_chain_id)
			&& self
				.signed_order_chains
				.contains(&decision.destination_chain_id)
		{
			decision.protocol = Protocol::SignedOrder;
		} else {
			return Err(PaymentError::UnsupportedRoute {
				source_chain: decision.source_chain_id,
				destination_chain: decision.destination_chain_id,
			});
		}

		tracing::debug!(
			source_chain = decision.source_chain_id,
			destination_chain = decision.destination_chain_id,
			protocol = %decision.protocol,
			"Selected route"
		);
		Ok(decision)
	}
}

/// The intent a decision executes: preference overrides applied.
pub fn effective_intent(intent: &TransferIntent, decision: &RouteDecision) -> TransferIntent {
	TransferIntent {
		destination_chain_id: decision.destination_chain_id,
		destination_token: decision.destination_token,
		recipient: decision.recipient,
		..intent.clone()
	}
}
