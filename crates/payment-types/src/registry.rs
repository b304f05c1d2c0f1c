//! Chain registry keyed by chain id.
//!
//! The registry is built once for an environment and is read-only afterwards,
//! so it can be shared freely between concurrently running transfers.

use crate::chains::{chains_for, ChainDescriptor, Environment, TESTNET_ALIASES};
use alloy_primitives::Address;
use std::collections::HashMap;
use thiserror::Error;

/// Errors returned by registry lookups.
///
/// Lookup failures are configuration problems and are never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
	#[error("Unsupported chain: {0}")]
	UnsupportedChain(u64),
}

/// Read-only lookup table of the chains supported by the bridging protocol.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
	environment: Environment,
	chains: HashMap<u64, ChainDescriptor>,
	aliases: HashMap<u64, u64>,
}

impl ChainRegistry {
	/// Builds the registry for the given environment.
	///
	/// On testnet, mainnet chain ids with a known testnet counterpart resolve
	/// to that counterpart.
	pub fn new(environment: Environment) -> Self {
		let chains = chains_for(environment)
			.iter()
			.map(|chain| (chain.chain_id, chain.clone()))
			.collect();
		let aliases = match environment {
			Environment::Testnet => TESTNET_ALIASES.iter().copied().collect(),
			Environment::Mainnet => HashMap::new(),
		};
		Self {
			environment,
			chains,
			aliases,
		}
	}

	pub fn testnet() -> Self {
		Self::new(Environment::Testnet)
	}

	pub fn mainnet() -> Self {
		Self::new(Environment::Mainnet)
	}

	pub fn environment(&self) -> Environment {
		self.environment
	}

	/// Resolves a chain id through the environment aliases.
	pub fn resolve(&self, chain_id: u64) -> u64 {
		self.aliases.get(&chain_id).copied().unwrap_or(chain_id)
	}

	/// Returns the full descriptor of a chain.
	pub fn descriptor(&self, chain_id: u64) -> Result<&ChainDescriptor, RegistryError> {
		self.chains
			.get(&self.resolve(chain_id))
			.ok_or(RegistryError::UnsupportedChain(chain_id))
	}

	/// Bridging domain id of a chain.
	pub fn domain_of(&self, chain_id: u64) -> Result<u32, RegistryError> {
		self.descriptor(chain_id).map(|chain| chain.domain)
	}

	/// Stablecoin contract address on a chain.
	pub fn stablecoin_address(&self, chain_id: u64) -> Result<Address, RegistryError> {
		self.descriptor(chain_id).map(|chain| chain.stablecoin)
	}

	/// Burn entrypoint address on a chain.
	pub fn bridge_address(&self, chain_id: u64) -> Result<Address, RegistryError> {
		self.descriptor(chain_id).map(|chain| chain.bridge_entrypoint)
	}

	/// Message verifier address on a chain.
	pub fn verifier_address(&self, chain_id: u64) -> Result<Address, RegistryError> {
		self.descriptor(chain_id).map(|chain| chain.attestation_verifier)
	}

	/// Whether the bridging protocol can reach the chain.
	pub fn is_bridge_supported(&self, chain_id: u64) -> bool {
		self.descriptor(chain_id).is_ok()
	}

	/// Whether `token` is the registry stablecoin of `chain_id`.
	pub fn is_stablecoin(&self, chain_id: u64, token: &Address) -> bool {
		self.stablecoin_address(chain_id)
			.map(|stablecoin| &stablecoin == token)
			.unwrap_or(false)
	}

	/// Iterates over every descriptor of the environment.
	pub fn chains(&self) -> impl Iterator<Item = &ChainDescriptor> {
		self.chains.values()
	}
}

impl Default for ChainRegistry {
	fn default() -> Self {
		Self::testnet()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::chains::{AVALANCHE_FUJI, BASE_SEPOLIA, ETHEREUM_SEPOLIA};
	use alloy_primitives::address;

	#[test]
	fn test_testnet_lookups() {
		let registry = ChainRegistry::testnet();

		assert_eq!(registry.domain_of(ETHEREUM_SEPOLIA).unwrap(), 0);
		assert_eq!(registry.domain_of(AVALANCHE_FUJI).unwrap(), 1);
		assert_eq!(registry.domain_of(BASE_SEPOLIA).unwrap(), 6);
		assert_eq!(
			registry.stablecoin_address(AVALANCHE_FUJI).unwrap(),
			address!("5425890298aed601595a70ab815c96711a31bc65")
		);
		assert_eq!(
			registry.bridge_address(BASE_SEPOLIA).unwrap(),
			address!("8fe6b999dc680ccfdd5bf7eb0974218be2542daa")
		);
		assert_eq!(
			registry.verifier_address(ETHEREUM_SEPOLIA).unwrap(),
			address!("e737e5cebeeba77efe34d4aa090756590b1ce275")
		);
	}

	#[test]
	fn test_unknown_chain_is_unsupported() {
		let registry = ChainRegistry::testnet();

		assert_eq!(
			registry.domain_of(56),
			Err(RegistryError::UnsupportedChain(56))
		);
		assert!(!registry.is_bridge_supported(56));
		assert!(registry.stablecoin_address(56).is_err());
	}

	#[test]
	fn test_testnet_resolves_mainnet_aliases() {
		let registry = ChainRegistry::testnet();

		assert_eq!(registry.resolve(1), ETHEREUM_SEPOLIA);
		assert_eq!(registry.resolve(43114), AVALANCHE_FUJI);
		assert_eq!(registry.resolve(8453), BASE_SEPOLIA);
		assert_eq!(registry.descriptor(1).unwrap().chain_id, ETHEREUM_SEPOLIA);
		// Arbitrum has no testnet entry
		assert!(!registry.is_bridge_supported(42161));
	}

	#[test]
	fn test_mainnet_does_not_alias() {
		let registry = ChainRegistry::mainnet();

		assert_eq!(registry.resolve(1), 1);
		assert_eq!(registry.domain_of(42161).unwrap(), 3);
		assert_eq!(registry.domain_of(137).unwrap(), 7);
		assert!(!registry.is_bridge_supported(ETHEREUM_SEPOLIA));
	}

	#[test]
	fn test_is_stablecoin() {
		let registry = ChainRegistry::testnet();
		let usdc: Address = "0x1C7D4B196CB0C7B01D743FBC6116A902379C7238".parse().unwrap();

		assert!(registry.is_stablecoin(ETHEREUM_SEPOLIA, &usdc));
		assert!(!registry.is_stablecoin(AVALANCHE_FUJI, &usdc));
		assert!(!registry.is_stablecoin(56, &usdc));
	}
}
