//! Sender recovery for EVM transactions.
//!
//! Node RPC responses carry the raw `(v, r, s)` signature values; the sender
//! is not trusted from the response but recovered from the signature over
//! the transaction's signing hash, parameterised by the chain id captured at
//! subscriber initialisation.

use alloy::{
	consensus::{SignableTransaction, TxEip1559, TxEip2930, TxLegacy},
	eips::eip2930::{AccessList, AccessListItem},
	primitives::{Address, Bytes, Signature, TxKind, B256, U256 as AlloyU256},
};
use web3::types::{Transaction, H160, U256};

use crate::services::subscriber::SubscriberError;

/// Recovers sender addresses for the transaction envelopes in use on the
/// chain: legacy (pre- and post-replay-protection), access-list and dynamic
/// fee transactions.
#[derive(Debug, Clone, Copy)]
pub struct ChainSigner {
	chain_id: u64,
}

impl ChainSigner {
	pub fn new(chain_id: u64) -> Self {
		Self { chain_id }
	}

	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	/// Recovers the sender address from the transaction's signature values.
	///
	/// # Errors
	/// Fails when signature values are missing, the envelope type is
	/// unknown, the replay-protected chain id disagrees with the signer's,
	/// or the curve recovery itself fails.
	pub fn recover_sender(&self, tx: &Transaction) -> Result<H160, SubscriberError> {
		let (v, r, s) = match (tx.v, tx.r, tx.s) {
			(Some(v), Some(r), Some(s)) => (v.as_u64(), r, s),
			_ => {
				return Err(SubscriberError::request_error(
					"transaction is missing signature values",
				))
			}
		};

		let to = match tx.to {
			Some(address) => TxKind::Call(Address::from_slice(address.as_bytes())),
			None => TxKind::Create,
		};
		let nonce = tx.nonce.as_u64();
		let gas_limit = tx.gas.as_u64();
		let value = to_alloy_u256(tx.value);
		let input: Bytes = tx.input.0.clone().into();

		let tx_type = tx.transaction_type.map(|t| t.as_u64()).unwrap_or(0);
		let (sighash, y_parity): (B256, bool) = match tx_type {
			0 => {
				let gas_price = tx.gas_price.unwrap_or_default().as_u128();
				let (chain_id, y_parity) = if v >= 35 {
					let tx_chain_id = (v - 35) / 2;
					if tx_chain_id != self.chain_id {
						return Err(SubscriberError::request_error(format!(
							"transaction chain id {} does not match signer chain id {}",
							tx_chain_id, self.chain_id
						)));
					}
					(Some(self.chain_id), (v - 35) % 2 == 1)
				} else {
					(None, v == 28)
				};
				let unsigned = TxLegacy {
					chain_id,
					nonce,
					gas_price,
					gas_limit,
					to,
					value,
					input,
				};
				(unsigned.signature_hash(), y_parity)
			}
			1 => {
				let unsigned = TxEip2930 {
					chain_id: self.chain_id,
					nonce,
					gas_price: tx.gas_price.unwrap_or_default().as_u128(),
					gas_limit,
					to,
					value,
					access_list: to_alloy_access_list(tx),
					input,
				};
				(unsigned.signature_hash(), v == 1)
			}
			2 => {
				let unsigned = TxEip1559 {
					chain_id: self.chain_id,
					nonce,
					gas_limit,
					max_fee_per_gas: tx.max_fee_per_gas.unwrap_or_default().as_u128(),
					max_priority_fee_per_gas: tx
						.max_priority_fee_per_gas
						.unwrap_or_default()
						.as_u128(),
					to,
					value,
					access_list: to_alloy_access_list(tx),
					input,
				};
				(unsigned.signature_hash(), v == 1)
			}
			other => {
				return Err(SubscriberError::request_error(format!(
					"unsupported transaction type {}",
					other
				)))
			}
		};

		let signature = Signature::new(to_alloy_u256(r), to_alloy_u256(s), y_parity);
		let sender = signature.recover_address_from_prehash(&sighash).map_err(|e| {
			SubscriberError::request_error(format!("failed to recover sender: {}", e))
		})?;

		Ok(H160::from_slice(sender.as_slice()))
	}
}

/// Renders an address in its mixed-case checksum form.
pub fn checksum_address(address: &H160) -> String {
	Address::from_slice(address.as_bytes()).to_checksum(None)
}

fn to_alloy_u256(value: U256) -> AlloyU256 {
	let mut buf = [0u8; 32];
	value.to_big_endian(&mut buf);
	AlloyU256::from_be_bytes(buf)
}

fn to_alloy_access_list(tx: &Transaction) -> AccessList {
	AccessList(
		tx.access_list
			.as_ref()
			.map(|list| {
				list.iter()
					.map(|item| AccessListItem {
						address: Address::from_slice(item.address.as_bytes()),
						storage_keys: item
							.storage_keys
							.iter()
							.map(|key| B256::from_slice(key.as_bytes()))
							.collect(),
					})
					.collect()
			})
			.unwrap_or_default(),
	)
}
