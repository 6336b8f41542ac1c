//! Push-capable RPC client for the EVM chain.
//!
//! The production client speaks websocket JSON-RPC so new block headers can
//! be pushed by the node instead of polled.

use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use web3::{
	transports::WebSocket,
	types::{Block, BlockId, BlockNumber, Transaction, U256, U64},
	Web3,
};

use crate::services::subscriber::SubscriberError;

/// RPC operations the EVM ingestion loop depends on.
#[async_trait]
pub trait EvmRpcClient: Sized + Send + Sync + 'static {
	/// Dials the endpoint. The URL must be websocket-capable so header
	/// subscriptions work.
	async fn connect(rpc_url: String) -> Result<Self, SubscriberError>;

	async fn chain_id(&self) -> Result<U256, SubscriberError>;

	/// Fetches the current head with full transaction bodies.
	async fn latest_block(&self) -> Result<Option<Block<Transaction>>, SubscriberError>;

	/// Opens a push subscription for new block headers, yielding the number
	/// of each announced block.
	async fn subscribe_new_heads(
		&self,
	) -> Result<BoxStream<'static, Result<U64, SubscriberError>>, SubscriberError>;

	/// Fetches a block by number with full transaction bodies.
	async fn block_by_number(
		&self,
		number: U64,
	) -> Result<Option<Block<Transaction>>, SubscriberError>;
}

/// Websocket-backed client implementation.
#[derive(Clone)]
pub struct Web3EvmClient {
	web3: Web3<WebSocket>,
}

#[async_trait]
impl EvmRpcClient for Web3EvmClient {
	async fn connect(rpc_url: String) -> Result<Self, SubscriberError> {
		let transport = WebSocket::new(&rpc_url)
			.await
			.map_err(|e| SubscriberError::init_error(format!("failed to dial rpc: {}", e)))?;
		Ok(Self {
			web3: Web3::new(transport),
		})
	}

	async fn chain_id(&self) -> Result<U256, SubscriberError> {
		self.web3
			.eth()
			.chain_id()
			.await
			.map_err(|e| SubscriberError::request_error(format!("failed to get chain id: {}", e)))
	}

	async fn latest_block(&self) -> Result<Option<Block<Transaction>>, SubscriberError> {
		self.web3
			.eth()
			.block_with_txs(BlockId::Number(BlockNumber::Latest))
			.await
			.map_err(|e| {
				SubscriberError::request_error(format!("failed to get latest block: {}", e))
			})
	}

	async fn subscribe_new_heads(
		&self,
	) -> Result<BoxStream<'static, Result<U64, SubscriberError>>, SubscriberError> {
		let subscription = self.web3.eth_subscribe().subscribe_new_heads().await.map_err(|e| {
			SubscriberError::terminal_error(format!("failed to subscribe to new head: {}", e))
		})?;

		Ok(subscription
			.filter_map(|header| async move {
				match header {
					// Pending headers without a number are not actionable
					Ok(header) => header.number.map(Ok),
					Err(e) => Some(Err(SubscriberError::terminal_error(format!(
						"new-heads subscription error: {}",
						e
					)))),
				}
			})
			.boxed())
	}

	async fn block_by_number(
		&self,
		number: U64,
	) -> Result<Option<Block<Transaction>>, SubscriberError> {
		self.web3
			.eth()
			.block_with_txs(BlockId::Number(BlockNumber::Number(number)))
			.await
			.map_err(|e| {
				SubscriberError::request_error(format!(
					"failed to get block {}: {}",
					number.as_u64(),
					e
				))
			})
	}
}
