//! Burn-and-mint phase transitions.

use once_cell::sync::Lazy;
use payment_types::TransferPhase;
use std::collections::{HashMap, HashSet};

/// Checks if a transfer may move from `from` to `to`.
pub fn is_valid_transfer_transition(from: TransferPhase, to: TransferPhase) -> bool {
	// Static transition table - each phase maps to allowed next phases
	static TRANSITIONS: Lazy<HashMap<TransferPhase, HashSet<TransferPhase>>> = Lazy::new(|| {
		use TransferPhase::*;

		let mut m = HashMap::new();
		m.insert(Idle, HashSet::from([Approving, Error]));
		m.insert(Approving, HashSet::from([Burning, Error]));
		m.insert(Burning, HashSet::from([AwaitingAttestation, Error]));
		m.insert(AwaitingAttestation, HashSet::from([Minting, Error]));
		m.insert(Minting, HashSet::from([Completed, Error]));
		m.insert(Completed, HashSet::new());
		m.insert(Error, HashSet::new());
		m
	});

	TRANSITIONS
		.get(&from)
		.is_some_and(|allowed| allowed.contains(&to))
}
