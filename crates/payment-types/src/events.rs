//! Progress events published while payments execute.
//!
//! Events flow through an event bus so that observers (a CLI printer, a UI
//! bridge, a metrics sink) can follow a payment without being coupled to the
//! state machines that drive it.

use crate::{LogEntry, OrderPhase, RouteDecision, TransactionHash, TransferPhase};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all payment events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PaymentEvent {
	/// A route was selected for an intent.
	RouteSelected(RouteDecision),
	/// Events from the burn-and-mint state machine.
	Transfer(TransferEvent),
	/// Events from the signed-order state machine.
	Order(OrderEvent),
}

/// Events related to burn-and-mint transfers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TransferEvent {
	/// The transfer moved to a new phase.
	PhaseChanged {
		transfer_id: String,
		phase: TransferPhase,
		log: LogEntry,
	},
	/// A log line was appended without a phase change.
	Progress { transfer_id: String, log: LogEntry },
	/// Tokens were minted on the destination chain.
	Completed {
		transfer_id: String,
		burn_tx_hash: TransactionHash,
		mint_tx_hash: TransactionHash,
	},
	/// The transfer stopped in the error phase.
	Failed { transfer_id: String, error: String },
}

/// Events related to signed orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
	/// The order moved to a new phase.
	PhaseChanged {
		order_hash: Option<String>,
		phase: OrderPhase,
		log: LogEntry,
	},
	/// A log line was appended without a phase change.
	Progress {
		order_hash: Option<String>,
		log: LogEntry,
	},
	/// The relayer reported a status for the order.
	StatusPolled {
		order_hash: String,
		status: String,
		attempt: u32,
	},
	/// The order reached a terminal phase.
	Finished {
		order_hash: Option<String>,
		phase: OrderPhase,
	},
}
