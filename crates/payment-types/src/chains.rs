//! Static chain descriptors for the bridging protocol.
//!
//! Each supported network is described once here. The tables are split by
//! environment so that a deployment only ever sees the networks it was
//! configured for.

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Network environment a registry is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
	#[default]
	Testnet,
	Mainnet,
}

impl fmt::Display for Environment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Environment::Testnet => write!(f, "testnet"),
			Environment::Mainnet => write!(f, "mainnet"),
		}
	}
}

impl FromStr for Environment {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"testnet" => Ok(Environment::Testnet),
			"mainnet" => Ok(Environment::Mainnet),
			other => Err(format!("unknown environment '{}'", other)),
		}
	}
}

/// Immutable description of one chain the bridge can reach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainDescriptor {
	/// EVM chain id.
	pub chain_id: u64,
	/// Human readable network name.
	pub name: &'static str,
	/// Domain id used by the bridging protocol to address this chain.
	pub domain: u32,
	/// Address of the native stablecoin contract.
	pub stablecoin: Address,
	/// Decimals of the stablecoin.
	pub stablecoin_decimals: u8,
	/// Entrypoint contract that burns tokens on this chain.
	pub bridge_entrypoint: Address,
	/// Contract that verifies attested messages and mints on this chain.
	pub attestation_verifier: Address,
	/// Environment the chain belongs to.
	pub environment: Environment,
}

const TESTNET_ENTRYPOINT: Address = address!("8fe6b999dc680ccfdd5bf7eb0974218be2542daa");
const TESTNET_VERIFIER: Address = address!("e737e5cebeeba77efe34d4aa090756590b1ce275");
const MAINNET_ENTRYPOINT: Address = address!("28b5a0e9c621a5badaa536219b3a228c8168cf5d");
const MAINNET_VERIFIER: Address = address!("81d40f21f12a8f0e3252bccb954d722d4c464b64");

const fn testnet(
	chain_id: u64,
	name: &'static str,
	domain: u32,
	stablecoin: Address,
) -> ChainDescriptor {
	ChainDescriptor {
		chain_id,
		name,
		domain,
		stablecoin,
		stablecoin_decimals: 6,
		bridge_entrypoint: TESTNET_ENTRYPOINT,
		attestation_verifier: TESTNET_VERIFIER,
		environment: Environment::Testnet,
	}
}

const fn mainnet(
	chain_id: u64,
	name: &'static str,
	domain: u32,
	stablecoin: Address,
) -> ChainDescriptor {
	ChainDescriptor {
		chain_id,
		name,
		domain,
		stablecoin,
		stablecoin_decimals: 6,
		bridge_entrypoint: MAINNET_ENTRYPOINT,
		attestation_verifier: MAINNET_VERIFIER,
		environment: Environment::Mainnet,
	}
}

pub const ETHEREUM_SEPOLIA: u64 = 11155111;
pub const AVALANCHE_FUJI: u64 = 43113;
pub const BASE_SEPOLIA: u64 = 84532;

pub const ETHEREUM: u64 = 1;
pub const OPTIMISM: u64 = 10;
pub const POLYGON: u64 = 137;
pub const BASE: u64 = 8453;
pub const ARBITRUM: u64 = 42161;
pub const AVALANCHE: u64 = 43114;

/// Testnet descriptors.
pub static TESTNET_CHAINS: [ChainDescriptor; 3] = [
	testnet(
		ETHEREUM_SEPOLIA,
		"Ethereum Sepolia",
		0,
		address!("1c7d4b196cb0c7b01d743fbc6116a902379c7238"),
	),
	testnet(
		AVALANCHE_FUJI,
		"Avalanche Fuji",
		1,
		address!("5425890298aed601595a70ab815c96711a31bc65"),
	),
	testnet(
		BASE_SEPOLIA,
		"Base Sepolia",
		6,
		address!("036cbd53842c5426634e7929541ec2318f3dcf7e"),
	),
];

/// Mainnet descriptors.
pub static MAINNET_CHAINS: [ChainDescriptor; 6] = [
	mainnet(
		ETHEREUM,
		"Ethereum",
		0,
		address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
	),
	mainnet(
		AVALANCHE,
		"Avalanche",
		1,
		address!("b97ef9ef8734c71904d8002f8b6bc66dd9c48a6e"),
	),
	mainnet(
		OPTIMISM,
		"OP Mainnet",
		2,
		address!("0b2c639c533813f4aa9d7837caf62653d097ff85"),
	),
	mainnet(
		ARBITRUM,
		"Arbitrum",
		3,
		address!("af88d065e77c8cc2239327c5edb3a432268e5831"),
	),
	mainnet(
		BASE,
		"Base",
		6,
		address!("833589fcd6edb6e08f4c7c32d4f71b54bda02913"),
	),
	mainnet(
		POLYGON,
		"Polygon PoS",
		7,
		address!("3c499c542cef5e3811e1192ce70d8cc03d5c3359"),
	),
];

/// Mainnet chain ids resolved to their testnet counterparts when running on testnet.
pub const TESTNET_ALIASES: [(u64, u64); 3] = [
	(ETHEREUM, ETHEREUM_SEPOLIA),
	(AVALANCHE, AVALANCHE_FUJI),
	(BASE, BASE_SEPOLIA),
];

/// Returns the descriptor table for an environment.
pub fn chains_for(environment: Environment) -> &'static [ChainDescriptor] {
	match environment {
		Environment::Testnet => &TESTNET_CHAINS,
		Environment::Mainnet => &MAINNET_CHAINS,
	}
}
