//! UTXO chain subscriber.
//!
//! Ingestion polls the tip height every 15 seconds. When the tip advances,
//! the tip block is fetched and every transaction is resolved against its
//! previous outputs so input addresses and the fee can be derived. Events
//! are emitted per matched *output*, with amount and fee apportioned by the
//! output's share of total output value.

use std::{str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use bitcoin::{Address, Amount, Network};
use tokio::{sync::mpsc, time::Instant};
use tracing::{error, info};

use crate::{
	models::{ChainName, TrackedWalletEvent},
	services::{
		subscriber::{SubscriberError, TransactionSubscriber, WalletRegistry},
		utxo::client::{CoreRpcClient, UtxoRpcClient, UtxoTransaction},
	},
};

/// Block time on this chain is ~10 minutes; a 15 second poll keeps latency
/// low without hammering the node.
const POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Subscriber for the UTXO chain, generic over the RPC client so tests can
/// substitute a double.
pub struct UtxoSubscriber<C: UtxoRpcClient = CoreRpcClient> {
	rpc_url: String,
	client: Option<Arc<C>>,
	// Wallets are stored as lowercase canonical strings
	registry: Arc<WalletRegistry<String>>,
	last_block_height: i64,
}

impl UtxoSubscriber {
	/// Creates an uninitialised subscriber for the given HTTP RPC endpoint.
	pub fn new(rpc_url: &str) -> Self {
		Self {
			rpc_url: rpc_url.to_string(),
			client: None,
			registry: Arc::new(WalletRegistry::new()),
			last_block_height: 0,
		}
	}
}

impl<C: UtxoRpcClient> UtxoSubscriber<C> {
	/// Creates a subscriber around an existing client with a caller-chosen
	/// cursor, bypassing `init`'s dial.
	pub fn with_client(client: C, last_block_height: i64) -> Self {
		Self {
			rpc_url: String::new(),
			client: Some(Arc::new(client)),
			registry: Arc::new(WalletRegistry::new()),
			last_block_height,
		}
	}
}

#[async_trait]
impl<C: UtxoRpcClient> TransactionSubscriber for UtxoSubscriber<C> {
	async fn init(&mut self) -> Result<(), SubscriberError> {
		let client = match self.client.take() {
			Some(client) => client,
			None => Arc::new(C::connect(self.rpc_url.clone()).await?),
		};

		let tip = client.block_count().await.map_err(|e| {
			SubscriberError::init_error(format!("failed to get initial block count: {}", e))
		})?;
		// Step back one so the current tip is picked up on the first poll
		self.last_block_height = tip - 1;
		self.client = Some(client);

		info!(rpc_url = %self.rpc_url, "initialized utxo subscriber");
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

		match self.client.clone() {
			Some(client) => {
				let registry = self.registry.clone();
				let cursor = self.last_block_height;
				tokio::spawn(ingest(client, registry, cursor, event_tx, error_tx));
			}
			None => {
				tokio::spawn(async move {
					let _ = error_tx
						.send(SubscriberError::terminal_error(
							"utxo subscriber started before initialization",
						))
						.await;
				});
			}
		}

		(event_rx, error_rx)
	}

	fn track_wallet(&self, wallet: &str) -> Result<(), SubscriberError> {
		self.registry.insert(parse_utxo_address(wallet)?);
		Ok(())
	}

	fn untrack_wallet(&self, wallet: &str) -> Result<(), SubscriberError> {
		self.registry.remove(&parse_utxo_address(wallet)?);
		Ok(())
	}

	fn name(&self) -> ChainName {
		ChainName::UtxoMainnet
	}
}

async fn ingest<C: UtxoRpcClient>(
	client: Arc<C>,
	registry: Arc<WalletRegistry<String>>,
	mut last_block_height: i64,
	events: mpsc::Sender<TrackedWalletEvent>,
	errors: mpsc::Sender<SubscriberError>,
) {
	let mut ticker = tokio::time::interval(POLL_INTERVAL);
	loop {
		ticker.tick().await;

		let latest = match client.block_count().await {
			Ok(height) => height,
			Err(e) => {
				let _ = errors
					.send(SubscriberError::request_error(format!(
						"failed to get block count: {}",
						e
					)))
					.await;
				continue;
			}
		};

		// Never process the same tip twice
		if last_block_height < latest {
			last_block_height = latest;
		} else {
			continue;
		}

		let hash = match client.block_hash(latest).await {
			Ok(hash) => hash,
			Err(e) => {
				let _ = errors
					.send(SubscriberError::request_error(format!(
						"failed to get block hash: {}",
						e
					)))
					.await;
				continue;
			}
		};

		let started = Instant::now();
		let block = match client.block(&hash).await {
			Ok(block) => block,
			Err(e) => {
				let _ = errors
					.send(SubscriberError::request_error(format!(
						"failed to get block info: {}",
						e
					)))
					.await;
				continue;
			}
		};
		info!(
			block_hash = %block.hash,
			num_tx = block.tx.len(),
			duration = ?started.elapsed(),
			"fetched full block"
		);

		for tx in &block.tx {
			if process_transaction(client.as_ref(), &registry, tx, &events)
				.await
				.is_err()
			{
				// Sink consumer is gone; nothing left to emit to.
				return;
			}
		}
	}
}

async fn process_transaction<C: UtxoRpcClient>(
	client: &C,
	registry: &WalletRegistry<String>,
	tx: &UtxoTransaction,
	events: &mpsc::Sender<TrackedWalletEvent>,
) -> Result<(), mpsc::error::SendError<TrackedWalletEvent>> {
	let mut input_total: i64 = 0;
	let mut input_wallets: Vec<String> = Vec::new();

	// Resolve each input against the transaction it spends; inputs that
	// cannot be resolved contribute neither an address nor value.
	for vin in &tx.vin {
		let (Some(prev_txid), Some(prev_index)) = (vin.txid.as_deref(), vin.vout) else {
			continue;
		};
		let prev_tx = match client.raw_transaction(prev_txid).await {
			Ok(prev_tx) => prev_tx,
			Err(e) => {
				error!(txid = %tx.txid, prev_txid, error = %e, "failed to get raw transaction");
				continue;
			}
		};
		let Some(prev_out) = prev_tx.vout.get(prev_index as usize) else {
			continue;
		};
		let Some(address) = prev_out.script_pub_key.standard_address() else {
			continue;
		};
		let Ok(value) = coin_value_to_base_units(prev_out.value) else {
			continue;
		};
		input_total += value;
		input_wallets.push(address.to_string());
	}

	let mut output_amounts: Vec<i64> = Vec::new();
	let mut output_total: i64 = 0;
	let mut output_wallets: Vec<String> = Vec::new();

	for vout in &tx.vout {
		let Some(address) = vout.script_pub_key.standard_address() else {
			continue;
		};
		let Ok(value) = coin_value_to_base_units(vout.value) else {
			continue;
		};
		output_amounts.push(value);
		output_total += value;
		output_wallets.push(address.to_string());
	}

	let fees = (input_total - output_total).max(0);
	let sources = input_wallets.join(",");

	for (i, wallet) in output_wallets.iter().enumerate() {
		if !registry.contains(&wallet.to_lowercase()) {
			continue;
		}

		let (amount, fee_share) = apportion(output_amounts[i], output_total, fees);
		events
			.send(TrackedWalletEvent {
				chain_name: ChainName::UtxoMainnet,
				source: sources.clone(),
				destination: wallet.clone(),
				amount: amount.into(),
				fees: fee_share.into(),
			})
			.await?;
	}

	Ok(())
}

/// Splits the transaction total and fee proportionally to one output's share
/// of the total output value.
pub fn apportion(output_value: i64, output_total: i64, fees: i64) -> (u64, u64) {
	if output_total <= 0 || output_value <= 0 {
		return (0, 0);
	}
	let share = output_value as f64 / output_total as f64;
	(
		(output_total as f64 * share) as u64,
		(fees as f64 * share) as u64,
	)
}

fn coin_value_to_base_units(value: f64) -> Result<i64, SubscriberError> {
	Amount::from_btc(value)
		.map(|amount| amount.to_sat() as i64)
		.map_err(|e| SubscriberError::request_error(format!("invalid output value: {}", e)))
}

fn parse_utxo_address(wallet: &str) -> Result<String, SubscriberError> {
	let address = Address::from_str(wallet)
		.and_then(|address| address.require_network(Network::Bitcoin))
		.map_err(|e| SubscriberError::validation_error(format!("invalid utxo address: {}", e)))?;
	Ok(address.to_string().to_lowercase())
}
