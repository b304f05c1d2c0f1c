//! Signed-order phase transitions.

use once_cell::sync::Lazy;
use payment_types::OrderPhase;
use std::collections::{HashMap, HashSet};

/// Checks if an order may move from `from` to `to`.
pub fn is_valid_order_transition(from: OrderPhase, to: OrderPhase) -> bool {
	static TRANSITIONS: Lazy<HashMap<OrderPhase, HashSet<OrderPhase>>> = Lazy::new(|| {
		use OrderPhase::*;

		let mut m = HashMap::new();
		m.insert(Idle, HashSet::from([Preparing, Error]));
		m.insert(Preparing, HashSet::from([Signing, Error]));
		m.insert(Signing, HashSet::from([Submitting, Error]));
		m.insert(Submitting, HashSet::from([Pending, Error]));
		m.insert(Pending, HashSet::from([Executed, Failed, Cancelled, Error]));
		for terminal in [Executed, Failed, Cancelled, Error] {
			m.insert(terminal, HashSet::new());
		}
		m
	});

	TRANSITIONS
		.get(&from)
		.is_some_and(|allowed| allowed.contains(&to))
}
