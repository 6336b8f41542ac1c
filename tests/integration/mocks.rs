//! Mock RPC clients and fixture builders shared by the integration tests.

use async_trait::async_trait;
use futures::stream::BoxStream;
use mockall::mock;
use web3::types::{Block, Transaction, H160, U256, U64};

use wallet_tracker::services::{
	evm::EvmRpcClient,
	slot::{SlotBlock, SlotRpcClient},
	subscriber::SubscriberError,
	utxo::{UtxoBlock, UtxoRpcClient, UtxoScriptPubKey, UtxoTransaction, UtxoTxInput, UtxoTxOutput},
};

mock! {
	pub EvmRpc {}

	#[async_trait]
	impl EvmRpcClient for EvmRpc {
		async fn connect(rpc_url: String) -> Result<Self, SubscriberError>;
		async fn chain_id(&self) -> Result<U256, SubscriberError>;
		async fn latest_block(&self) -> Result<Option<Block<Transaction>>, SubscriberError>;
		async fn subscribe_new_heads(
			&self,
		) -> Result<BoxStream<'static, Result<U64, SubscriberError>>, SubscriberError>;
		async fn block_by_number(
			&self,
			number: U64,
		) -> Result<Option<Block<Transaction>>, SubscriberError>;
	}
}

mock! {
	pub UtxoRpc {}

	#[async_trait]
	impl UtxoRpcClient for UtxoRpc {
		async fn connect(rpc_url: String) -> Result<Self, SubscriberError>;
		async fn block_count(&self) -> Result<i64, SubscriberError>;
		async fn block_hash(&self, height: i64) -> Result<String, SubscriberError>;
		async fn block(&self, hash: &str) -> Result<UtxoBlock, SubscriberError>;
		async fn raw_transaction(&self, txid: &str) -> Result<UtxoTransaction, SubscriberError>;
	}
}

mock! {
	pub SlotRpc {}

	#[async_trait]
	impl SlotRpcClient for SlotRpc {
		async fn connect(rpc_url: String) -> Result<Self, SubscriberError>;
		async fn finalized_slot(&self) -> Result<u64, SubscriberError>;
		async fn block(&self, slot: u64) -> Result<SlotBlock, SubscriberError>;
	}
}

/// Mainnet tx 0x5bf0d5650d4df9e308a8ce1b3be8757746c532f7f111d3529e98ba74b873ea06:
/// 0x9642…5D4E sends 0.01922 ether to 0xeEa5…E107.
pub fn signed_legacy_transaction() -> Transaction {
	Transaction {
		nonce: 257_664u64.into(),
		gas_price: Some(7_424_228_342u64.into()),
		gas: 50_000u64.into(),
		to: Some(evm_address("0xeEa5b26B94E4e5bA416c9725e51aB755E2ddE107")),
		value: U256::from(19_220_000_000_000_000u64),
		v: Some(U64::from(38u64)),
		r: Some(
			U256::from_dec_str(
				"41381143044471666193394495856779718433748443387095402661844025890319923186141",
			)
			.unwrap(),
		),
		s: Some(
			U256::from_dec_str(
				"51098266734372285490093418638008504503442167242690029592223759640366292416179",
			)
			.unwrap(),
		),
		..Default::default()
	}
}

pub fn evm_address(hex_str: &str) -> H160 {
	let bytes = hex::decode(hex_str.trim_start_matches("0x")).unwrap();
	H160::from_slice(&bytes)
}

pub fn evm_block(number: u64, transactions: Vec<Transaction>) -> Block<Transaction> {
	Block {
		number: Some(number.into()),
		transactions,
		..Default::default()
	}
}

pub fn utxo_input(prev_txid: &str, prev_index: u32) -> UtxoTxInput {
	UtxoTxInput {
		txid: Some(prev_txid.to_string()),
		vout: Some(prev_index),
		coinbase: None,
	}
}

pub fn utxo_output(address: &str, value_btc: f64, n: u32) -> UtxoTxOutput {
	UtxoTxOutput {
		value: value_btc,
		n,
		script_pub_key: UtxoScriptPubKey {
			address: Some(address.to_string()),
			addresses: Vec::new(),
		},
	}
}

pub fn utxo_transaction(
	txid: &str,
	vin: Vec<UtxoTxInput>,
	vout: Vec<UtxoTxOutput>,
) -> UtxoTransaction {
	UtxoTransaction {
		txid: txid.to_string(),
		vin,
		vout,
	}
}

pub fn utxo_block(hash: &str, height: i64, tx: Vec<UtxoTransaction>) -> UtxoBlock {
	UtxoBlock {
		hash: hash.to_string(),
		height,
		tx,
	}
}
