//! Conversions between on-chain encodings and display values.

use super::formatting::format_token_amount;
use alloy_primitives::{Address, B256, U256};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Left-pads an address to 32 bytes, the encoding bridge contracts expect
/// for recipients and callers.
pub fn address_to_bytes32(address: &Address) -> B256 {
	address.into_word()
}

/// Extracts the address embedded in the low 20 bytes of a bytes32 value.
pub fn bytes32_to_address(value: &B256) -> Address {
	Address::from_word(*value)
}

/// Converts a raw amount to whole tokens.
///
/// Returns `None` when the value does not fit a decimal (over 28 digits).
pub fn to_whole_tokens(amount: U256, decimals: u8) -> Option<Decimal> {
	Decimal::from_str(&format_token_amount(&amount.to_string(), decimals)).ok()
}
