//! Call encoding for the contracts a payment touches.
//!
//! The allowance read only returns a single word, so it is encoded
//! by hand and decoded from the first 32 bytes of the result. Bridge calls go
//! through `sol!` bindings.

use alloy::sol;
use alloy::sol_types::SolCall;
use payment_types::{address_to_bytes32, Address, Bytes, B256, U256};

sol! {
	interface IERC20 {
		function approve(address spender, uint256 amount) external returns (bool);
	}

	interface ITokenMessengerV2 {
		function depositForBurnWithHook(
			uint256 amount,
			uint32 destinationDomain,
			bytes32 mintRecipient,
			address burnToken,
			bytes32 destinationCaller,
			uint256 maxFee,
			uint32 minFinalityThreshold,
			bytes hookData
		) external;
	}

	interface IMessageTransmitterV2 {
		function receiveMessage(bytes message, bytes attestation) external returns (bool);
	}
}

/// allowance(address,address)
const ALLOWANCE_SELECTOR: [u8; 4] = [0xdd, 0x62, 0xed, 0x3e];

pub fn encode_allowance(owner: &Address, spender: &Address) -> Bytes {
	let mut call_data = Vec::with_capacity(4 + 64);
	call_data.extend_from_slice(&ALLOWANCE_SELECTOR);
	call_data.extend_from_slice(address_to_bytes32(owner).as_slice());
	call_data.extend_from_slice(address_to_bytes32(spender).as_slice());
	call_data.into()
}

/// Decodes a single `uint256` return word.
pub fn decode_uint(result: &[u8]) -> Option<U256> {
	(result.len() >= 32).then(|| U256::from_be_slice(&result[..32]))
}

pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
	IERC20::approveCall { spender, amount }.abi_encode().into()
}

/// Parameters of a burn on the bridge entrypoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnParams {
	pub amount: U256,
	pub destination_domain: u32,
	pub mint_recipient: Address,
	pub burn_token: Address,
	/// Zero lets any caller relay the mint.
	pub destination_caller: B256,
	pub max_fee: U256,
	pub min_finality_threshold: u32,
	pub hook_data: Bytes,
}

pub fn encode_deposit_for_burn_with_hook(params: &BurnParams) -> Bytes {
	ITokenMessengerV2::depositForBurnWithHookCall {
		amount: params.amount,
		destinationDomain: params.destination_domain,
		mintRecipient: address_to_bytes32(&params.mint_recipient),
		burnToken: params.burn_token,
		destinationCaller: params.destination_caller,
		maxFee: params.max_fee,
		minFinalityThreshold: params.min_finality_threshold,
		hookData: params.hook_data.clone(),
	}
	.abi_encode()
	.into()
}

pub fn encode_receive_message(message: &Bytes, attestation: &Bytes) -> Bytes {
	IMessageTransmitterV2::receiveMessageCall {
		message: message.clone(),
		attestation: attestation.clone(),
	}
	.abi_encode()
	.into()
}
