//! EVM chain subscriber.
//!
//! Ingestion is push-based: a long-lived task consumes a new-heads
//! subscription, fetches each announced block with full transaction bodies,
//! recovers every sender, and emits an event whenever the sender or the
//! recipient is a tracked wallet.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use web3::types::{Block, Transaction, H160};

use crate::{
	models::{ChainName, TrackedWalletEvent},
	services::{
		evm::{
			client::{EvmRpcClient, Web3EvmClient},
			signer::{checksum_address, ChainSigner},
		},
		subscriber::{SubscriberError, TransactionSubscriber, WalletRegistry},
	},
};

/// Subscriber for the EVM chain, generic over the RPC client so tests can
/// substitute a double.
pub struct EvmSubscriber<C: EvmRpcClient = Web3EvmClient> {
	rpc_url: String,
	client: Option<Arc<C>>,
	signer: Option<ChainSigner>,
	registry: Arc<WalletRegistry<H160>>,
}

impl EvmSubscriber {
	/// Creates an uninitialised subscriber for the given websocket RPC
	/// endpoint. `init` dials and captures the signer parameters.
	pub fn new(rpc_url: &str) -> Self {
		Self {
			rpc_url: rpc_url.to_string(),
			client: None,
			signer: None,
			registry: Arc::new(WalletRegistry::new()),
		}
	}
}

impl<C: EvmRpcClient> EvmSubscriber<C> {
	/// Creates a subscriber around an existing client and signer, bypassing
	/// `init`'s dial.
	pub fn with_client(client: C, signer: ChainSigner) -> Self {
		Self {
			rpc_url: String::new(),
			client: Some(Arc::new(client)),
			signer: Some(signer),
			registry: Arc::new(WalletRegistry::new()),
		}
	}
}

#[async_trait]
impl<C: EvmRpcClient> TransactionSubscriber for EvmSubscriber<C> {
	async fn init(&mut self) -> Result<(), SubscriberError> {
		let client = match self.client.take() {
			Some(client) => client,
			None => Arc::new(C::connect(self.rpc_url.clone()).await?),
		};

		let chain_id = client
			.chain_id()
			.await
			.map_err(|e| SubscriberError::init_error(e.to_string()))?;
		// The head must be reachable before ingestion is worth starting
		client
			.latest_block()
			.await
			.map_err(|e| SubscriberError::init_error(e.to_string()))?
			.ok_or_else(|| SubscriberError::init_error("latest block unavailable"))?;

		self.signer = Some(ChainSigner::new(chain_id.as_u64()));
		self.client = Some(client);

		info!(
			rpc_url = %self.rpc_url,
			chain_id = chain_id.as_u64(),
			"initialized evm subscriber"
		);
		Ok(())
	}

	fn start(
		&self,
	) -> (
		mpsc::Receiver<TrackedWalletEvent>,
		mpsc::Receiver<SubscriberError>,
	) {
		let (event_tx, event_rx) = mpsc::channel(1);
		let (error_tx, error_rx) = mpsc::channel(1);

		match (self.client.clone(), self.signer) {
			(Some(client), Some(signer)) => {
				let registry = self.registry.clone();
				tokio::spawn(ingest(client, signer, registry, event_tx, error_tx));
			}
			_ => {
				tokio::spawn(async move {
					let _ = error_tx
						.send(SubscriberError::terminal_error(
							"evm subscriber started before initialization",
						))
						.await;
				});
			}
		}

		(event_rx, error_rx)
	}

	fn track_wallet(&self, wallet: &str) -> Result<(), SubscriberError> {
		let address = parse_evm_address(wallet)?;
		self.registry.insert(address);
		Ok(())
	}

	fn untrack_wallet(&self, wallet: &str) -> Result<(), SubscriberError> {
		let address = parse_evm_address(wallet)?;
		self.registry.remove(&address);
		Ok(())
	}

	fn name(&self) -> ChainName {
		ChainName::EvmMainnet
	}
}

async fn ingest<C: EvmRpcClient>(
	client: Arc<C>,
	signer: ChainSigner,
	registry: Arc<WalletRegistry<H160>>,
	events: mpsc::Sender<TrackedWalletEvent>,
	errors: mpsc::Sender<SubscriberError>,
) {
	let mut heads = match client.subscribe_new_heads().await {
		Ok(stream) => stream,
		Err(e) => {
			let _ = errors.send(e).await;
			return;
		}
	};

	while let Some(next) = heads.next().await {
		let number = match next {
			Ok(number) => number,
			Err(e) => {
				// Subscription failures are terminal; the chain is lost
				// until restart.
				let _ = errors.send(e).await;
				return;
			}
		};
		info!(block_number = number.as_u64(), "received new block header");

		let block = match client.block_by_number(number).await {
			Ok(Some(block)) => block,
			Ok(None) => {
				warn!(block_number = number.as_u64(), "block not yet available, skipping");
				continue;
			}
			Err(e) => {
				error!(block_number = number.as_u64(), error = %e, "failed to get block by number");
				continue;
			}
		};

		if process_block(&block, &signer, &registry, &events).await.is_err() {
			// Sink consumer is gone; nothing left to emit to.
			return;
		}
		info!(chain = %ChainName::EvmMainnet, "processed a block");
	}

	let _ = errors
		.send(SubscriberError::terminal_error("new-heads subscription closed"))
		.await;
}

async fn process_block(
	block: &Block<Transaction>,
	signer: &ChainSigner,
	registry: &WalletRegistry<H160>,
	events: &mpsc::Sender<TrackedWalletEvent>,
) -> Result<(), mpsc::error::SendError<TrackedWalletEvent>> {
	for tx in &block.transactions {
		// Contract creations have no destination and are skipped
		let Some(to) = tx.to else {
			continue;
		};

		let sender = match signer.recover_sender(tx) {
			Ok(sender) => sender,
			Err(e) => {
				error!(tx_hash = ?tx.hash, error = %e, "failed to recover sender");
				continue;
			}
		};

		let fees = tx.gas_price.unwrap_or_default().saturating_mul(tx.gas);
		let amount = tx.value;

		let tracked = registry.contains(&sender) || registry.contains(&to);
		if tracked {
			events
				.send(TrackedWalletEvent {
					chain_name: ChainName::EvmMainnet,
					source: checksum_address(&sender),
					destination: checksum_address(&to),
					amount,
					fees,
				})
				.await?;
		}
	}
	Ok(())
}

fn parse_evm_address(wallet: &str) -> Result<H160, SubscriberError> {
	let hex_part = wallet.strip_prefix("0x").unwrap_or(wallet);
	if hex_part.len() != 40 {
		return Err(SubscriberError::validation_error(
			"invalid evm wallet address",
		));
	}
	let bytes = hex::decode(hex_part)
		.map_err(|_| SubscriberError::validation_error("invalid evm wallet address"))?;
	Ok(H160::from_slice(&bytes))
}
