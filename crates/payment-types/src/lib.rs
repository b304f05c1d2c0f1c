//! Common types module for the cross-chain payment system.
//!
//! This module defines the data types shared by every payment component:
//! chain descriptors and the registry built from them, transfer intents,
//! the state records of both settlement protocols, route decisions and the
//! progress events emitted while a payment executes.

/// Static chain descriptors for the supported networks.
pub mod chains;
/// Transaction delivery types for blockchain interactions.
pub mod delivery;
/// Progress events published while payments execute.
pub mod events;
/// Transfer intents supplied by callers.
pub mod intent;
/// Signed-order state and relayer payloads.
pub mod order;
/// Chain registry lookups keyed by chain id.
pub mod registry;
/// Routing decisions and recipient preferences.
pub mod route;
/// Secure string type for sensitive values.
pub mod secret_string;
/// Burn-and-mint transfer state.
pub mod transfer;
/// Utility functions for common type conversions.
pub mod utils;

pub use chains::{ChainDescriptor, Environment};
pub use delivery::*;
pub use events::*;
pub use intent::{IntentError, TransferIntent};
pub use order::*;
pub use registry::{ChainRegistry, RegistryError};
pub use route::*;
pub use secret_string::SecretString;
pub use transfer::*;
pub use utils::{
	address_to_bytes32, format_token_amount, truncate_id, with_0x_prefix, without_0x_prefix,
};

pub use alloy_primitives::{Address, Bytes, B256, U256};
