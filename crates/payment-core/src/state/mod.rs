//! Phase transition rules for both settlement protocols.
//!
//! Phases only move forward. Each machine consults these tables before every
//! transition so that terminal phases have no way out.

pub mod order;
pub mod transfer;

pub use order::is_valid_order_transition;
pub use transfer::is_valid_transfer_transition;
