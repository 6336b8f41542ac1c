//! JSON-RPC client and wire types for the slot chain node.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::services::subscriber::SubscriberError;

/// RPC operations the slot ingestion loop depends on.
#[async_trait]
pub trait SlotRpcClient: Sized + Send + Sync + 'static {
	async fn connect(rpc_url: String) -> Result<Self, SubscriberError>;

	/// The most recent finalized slot.
	async fn finalized_slot(&self) -> Result<u64, SubscriberError>;

	/// The finalized block produced at the given slot, with full
	/// transactions and balance metadata.
	async fn block(&self, slot: u64) -> Result<SlotBlock, SubscriberError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotBlock {
	#[serde(default)]
	pub transactions: Vec<SlotTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotTransaction {
	/// Execution metadata; absent for transactions the node could not replay
	pub meta: Option<SlotTransactionMeta>,
	pub transaction: SlotTransactionBody,
}

/// Per-transaction balance bookkeeping. `pre_balances[i]` and
/// `post_balances[i]` belong to `account_keys[i]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotTransactionMeta {
	pub fee: u64,
	#[serde(default)]
	pub pre_balances: Vec<i64>,
	#[serde(default)]
	pub post_balances: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotTransactionBody {
	pub message: SlotMessage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotMessage {
	#[serde(default)]
	pub account_keys: Vec<String>,
}

/// HTTP JSON-RPC client for a slot chain node.
#[derive(Clone, Debug)]
pub struct SlotHttpClient {
	client: reqwest::Client,
	rpc_url: String,
}

impl SlotHttpClient {
	async fn call<T: serde::de::DeserializeOwned>(
		&self,
		method: &str,
		params: Value,
	) -> Result<T, SubscriberError> {
		let payload = json!({
			"jsonrpc": "2.0",
			"id": 1,
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
impl SlotRpcClient for SlotHttpClient {
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

	async fn finalized_slot(&self) -> Result<u64, SubscriberError> {
		self.call("getSlot", json!([{ "commitment": "finalized" }])).await
	}

	async fn block(&self, slot: u64) -> Result<SlotBlock, SubscriberError> {
		self.call(
			"getBlock",
			json!([slot, {
				"encoding": "json",
				"transactionDetails": "full",
				"commitment": "finalized",
				"maxSupportedTransactionVersion": 0,
				"rewards": false,
			}]),
		)
		.await
	}
}
