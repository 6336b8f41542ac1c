//! JSON-RPC client and wire types for the UTXO chain node.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::services::subscriber::SubscriberError;

/// RPC operations the UTXO ingestion loop depends on.
#[async_trait]
pub trait UtxoRpcClient: Sized + Send + Sync + 'static {
	async fn connect(rpc_url: String) -> Result<Self, SubscriberError>;

	/// Height of the current chain tip.
	async fn block_count(&self) -> Result<i64, SubscriberError>;

	/// Hash of the block at the given height.
	async fn block_hash(&self, height: i64) -> Result<String, SubscriberError>;

	/// Full block with decoded transactions.
	async fn block(&self, hash: &str) -> Result<UtxoBlock, SubscriberError>;

	/// A single decoded transaction, used to resolve previous outputs.
	async fn raw_transaction(&self, txid: &str) -> Result<UtxoTransaction, SubscriberError>;
}

/// Block as returned by `getblock` at verbosity 2.
#[derive(Debug, Clone, Deserialize)]
pub struct UtxoBlock {
	pub hash: String,
	pub height: i64,
	#[serde(default)]
	pub tx: Vec<UtxoTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UtxoTransaction {
	pub txid: String,
	#[serde(default)]
	pub vin: Vec<UtxoTxInput>,
	#[serde(default)]
	pub vout: Vec<UtxoTxOutput>,
}

/// Transaction input. Coinbase inputs carry no previous-output reference.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UtxoTxInput {
	pub txid: Option<String>,
	pub vout: Option<u32>,
	pub coinbase: Option<String>,
}

/// Transaction output; `value` is denominated in whole coins.
#[derive(Debug, Clone, Deserialize)]
pub struct UtxoTxOutput {
	pub value: f64,
	pub n: u32,
	#[serde(rename = "scriptPubKey")]
	pub script_pub_key: UtxoScriptPubKey,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UtxoScriptPubKey {
	pub address: Option<String>,
	/// Pre-22.0 nodes report a list instead of a single address
	#[serde(default)]
	pub addresses: Vec<String>,
}

impl UtxoScriptPubKey {
	/// The script's standard address, if the script has one.
	pub fn standard_address(&self) -> Option<&str> {
		self.address
			.as_deref()
			.or_else(|| self.addresses.first().map(String::as_str))
	}
}

/// HTTP JSON-RPC client for a UTXO chain full node.
#[derive(Clone, Debug)]
pub struct CoreRpcClient {
	client: reqwest::Client,
	rpc_url: String,
}

impl CoreRpcClient {
	async fn call<T: serde::de::DeserializeOwned>(
		&self,
		method: &str,
		params: Value,
	) -> Result<T, SubscriberError> {
		let payload = json!({
			"jsonrpc": "1.0",
			"id": "wallet-tracker",
			"method": method,
			"params": params,
		});

		let response = self
			.client
			.post(&self.rpc_url)
			.json(&payload)
			.send()
			.await
			.map_err(|e| SubscriberError::request_error(format!("{} failed: {}", method, e)))?;

		let body: Value = response.json().await.map_err(|e| {
			SubscriberError::request_error(format!("{} returned invalid JSON: {}", method, e))
		})?;

		if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
			return Err(SubscriberError::request_error(format!(
				"{} returned error: {}",
				method, error
			)));
		}

		let result = body.get("result").ok_or_else(|| {
			SubscriberError::request_error(format!("{}: missing 'result' field", method))
		})?;

		serde_json::from_value(result.clone()).map_err(|e| {
			SubscriberError::request_error(format!("{}: failed to parse result: {}", method, e))
		})
	}
}

#[async_trait]
impl UtxoRpcClient for CoreRpcClient {
	async fn connect(rpc_url: String) -> Result<Self, SubscriberError> {
		let client = reqwest::ClientBuilder::new()
			.timeout(Duration::from_secs(30))
			.connect_timeout(Duration::from_secs(20))
			.build()
			.map_err(|e| {
				SubscriberError::init_error(format!("failed to create http client: {}", e))
			})?;
		Ok(Self { client, rpc_url })
	}

	async fn block_count(&self) -> Result<i64, SubscriberError> {
		self.call("getblockcount", json!([])).await
	}

	async fn block_hash(&self, height: i64) -> Result<String, SubscriberError> {
		self.call("getblockhash", json!([height])).await
	}

	async fn block(&self, hash: &str) -> Result<UtxoBlock, SubscriberError> {
		// Verbosity 2 decodes every transaction in place
		self.call("getblock", json!([hash, 2])).await
	}

	async fn raw_transaction(&self, txid: &str) -> Result<UtxoTransaction, SubscriberError> {
		self.call("getrawtransaction", json!([txid, true])).await
	}
}
