//! Unified event schema shared by every chain subscriber.

use std::fmt;

use serde::{Deserialize, Serialize};
use web3::types::U256;

/// Identifies one of the supported blockchains.
///
/// The string forms are stable identifiers used on the admin surface and in
/// serialised events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainName {
	#[serde(rename = "evm-mainnet")]
	EvmMainnet,
	#[serde(rename = "utxo-mainnet")]
	UtxoMainnet,
	#[serde(rename = "slot-mainnet")]
	SlotMainnet,
}

impl ChainName {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::EvmMainnet => "evm-mainnet",
			Self::UtxoMainnet => "utxo-mainnet",
			Self::SlotMainnet => "slot-mainnet",
		}
	}
}

impl fmt::Display for ChainName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// A value transfer touching a tracked wallet, in chain-agnostic form.
///
/// `source` and `destination` each hold either a single address or a
/// comma-joined address list, depending on the transaction shape of the
/// originating chain. Amounts and fees are expressed in the chain's smallest
/// denomination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedWalletEvent {
	pub chain_name: ChainName,
	pub source: String,
	pub destination: String,
	pub amount: U256,
	pub fees: U256,
}
