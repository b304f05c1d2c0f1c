//! Utility functions for common type conversions and formatting.

pub mod conversion;
pub mod formatting;

pub use conversion::{address_to_bytes32, bytes32_to_address, to_whole_tokens};
pub use formatting::{format_token_amount, truncate_id, with_0x_prefix, without_0x_prefix};
