//! Routing decisions and recipient preferences.

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Settlement protocol selected for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
	/// Native burn-and-mint bridging of the stablecoin.
	Bridge,
	/// Off-chain signed order filled by a resolver network.
	SignedOrder,
}

impl fmt::Display for Protocol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Protocol::Bridge => write!(f, "bridge"),
			Protocol::SignedOrder => write!(f, "signed-order"),
		}
	}
}

/// Outcome of route selection.
///
/// Created once by the route selector. Only the quote step may fill in the
/// fee and duration estimates afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDecision {
	pub protocol: Protocol,
	pub source_chain_id: u64,
	pub destination_chain_id: u64,
	/// Destination token after preference overrides.
	pub destination_token: Address,
	/// Recipient after preference overrides.
	pub recipient: Address,
	pub estimated_fee: Option<U256>,
	pub estimated_duration_seconds: Option<u64>,
}

impl RouteDecision {
	pub fn with_quote(mut self, quote: RouteQuote) -> Self {
		self.estimated_fee = Some(quote.estimated_fee);
		self.estimated_duration_seconds = Some(quote.estimated_duration_seconds);
		self
	}
}

/// Fee and timing estimate for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteQuote {
	pub estimated_fee: U256,
	pub estimated_duration_seconds: u64,
}

/// Comparison operators for amount conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComparisonOperator {
	Gt,
	Lt,
	Eq,
	Gte,
	Lte,
}

impl ComparisonOperator {
	pub fn holds(&self, lhs: Decimal, rhs: Decimal) -> bool {
		match self {
			ComparisonOperator::Gt => lhs > rhs,
			ComparisonOperator::Lt => lhs < rhs,
			ComparisonOperator::Eq => lhs == rhs,
			ComparisonOperator::Gte => lhs >= rhs,
			ComparisonOperator::Lte => lhs <= rhs,
		}
	}
}

/// Condition gating a recipient preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum PreferenceCondition {
	/// Compares the payment amount, in whole tokens, against `value`.
	Amount {
		operator: ComparisonOperator,
		value: Decimal,
	},
	/// Matches when the payer's source token equals `token`.
	Token { token: Address },
}

impl PreferenceCondition {
	pub fn holds(&self, amount: Decimal, source_token: &Address) -> bool {
		match self {
			PreferenceCondition::Amount { operator, value } => operator.holds(amount, *value),
			PreferenceCondition::Token { token } => token == source_token,
		}
	}
}

/// Where and how a recipient wants to be paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPreference {
	pub chain_id: u64,
	pub token: Address,
	#[serde(default)]
	pub wallet_address: Option<Address>,
	#[serde(default)]
	pub is_default: bool,
	#[serde(default)]
	pub conditions: Vec<PreferenceCondition>,
}

impl PaymentPreference {
	pub fn new(chain_id: u64, token: Address) -> Self {
		Self {
			chain_id,
			token,
			wallet_address: None,
			is_default: false,
			conditions: Vec::new(),
		}
	}

	/// Whether this is a conditional preference whose conditions all hold.
	pub fn matches(&self, amount: Decimal, source_token: &Address) -> bool {
		!self.conditions.is_empty()
			&& self
				.conditions
				.iter()
				.all(|condition| condition.holds(amount, source_token))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use std::str::FromStr;

	#[test]
	fn test_preference_conditions_from_json() {
		let pref: PaymentPreference = serde_json::from_value(json!({
			"chainId": 8453,
			"token": "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913",
			"isDefault": false,
			"conditions": [
				{"type": "AMOUNT", "operator": "GTE", "value": 100},
				{"type": "TOKEN", "token": "0x1c7d4b196cb0c7b01d743fbc6116a902379c7238"}
			]
		}))
		.unwrap();

		let token = Address::from_str("0x1c7d4b196cb0c7b01d743fbc6116a902379c7238").unwrap();
		assert!(pref.matches(Decimal::from(100), &token));
		assert!(!pref.matches(Decimal::from(99), &token));
		assert!(!pref.matches(Decimal::from(150), &Address::ZERO));
	}

	#[test]
	fn test_unconditional_preference_never_matches() {
		let pref = PaymentPreference::new(1, Address::ZERO);
		assert!(!pref.matches(Decimal::from(10), &Address::ZERO));
	}

	#[test]
	fn test_comparison_operators() {
		let one = Decimal::from(1);
		let two = Decimal::from(2);
		assert!(ComparisonOperator::Gt.holds(two, one));
		assert!(ComparisonOperator::Lt.holds(one, two));
		assert!(ComparisonOperator::Eq.holds(one, one));
		assert!(ComparisonOperator::Gte.holds(one, one));
		assert!(ComparisonOperator::Lte.holds(one, two));
		assert!(!ComparisonOperator::Lte.holds(two, one));
	}

	#[test]
	fn test_protocol_display() {
		assert_eq!(Protocol::Bridge.to_string(), "bridge");
		assert_eq!(Protocol::SignedOrder.to_string(), "signed-order");
	}
}
