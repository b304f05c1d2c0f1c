//! Polling primitives for the asynchronous steps of a payment.
//!
//! Attestation waits and order-status tracking both run on the scheduled
//! poller defined here, sharing its stop handle for cancellation.

pub mod poller;

pub use poller::{PollError, PollOutcome, PollStop, PollTicker, StatusPoller, StopHandle};
