//! Slot chain subscriber.
//!
//! A one-second tick queries the latest finalized slot; every slot between
//! the cursor and the new value is handed to its own worker task, so block
//! fetches for a burst of slots run concurrently. Within one transaction,
//! accounts are partitioned by balance delta into senders and recipients and
//! one event is emitted per matched wallet.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{sync::mpsc, time::Instant};
use tracing::{error, info};
use web3::types::U256;

use crate::{
	models::{ChainName, TrackedWalletEvent},
	services::{
		slot::client::{SlotBlock, SlotHttpClient, SlotRpcClient},
		subscriber::{SubscriberError, TransactionSubscriber, WalletRegistry},
	},
};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Worker bursts for several slots at once feed this channel; the extra
/// capacity keeps slot workers from serialising on a slow consumer.
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// 32-byte public key in canonical form.
pub type SlotAddress = [u8; 32];

/// Subscriber for the slot chain, generic over the RPC client so tests can
/// substitute a double.
pub struct SlotSubscriber<C: SlotRpcClient = SlotHttpClient> {
	rpc_url: String,
	client: Option<Arc<C>>,
	registry: Arc<WalletRegistry<SlotAddress>>,
	current_slot: u64,
}

impl SlotSubscriber {
	/// Creates an uninitialised subscriber for the given HTTP RPC endpoint.
	pub fn new(rpc_url: &str) -> Self {
		Self {
			rpc_url: rpc_url.to_string(),
			client: None,
			registry: Arc::new(WalletRegistry::new()),
			current_slot: 0,
		}
	}
}

impl<C: SlotRpcClient> SlotSubscriber<C> {
	/// Creates a subscriber around an existing client with a caller-chosen
	/// slot cursor, bypassing `init`'s dial.
	pub fn with_client(client: C, current_slot: u64) -> Self {
		Self {
			rpc_url: String::new(),
			client: Some(Arc::new(client)),
			registry: Arc::new(WalletRegistry::new()),
			current_slot,
		}
	}
}

#[async_trait]
impl<C: SlotRpcClient> TransactionSubscriber for SlotSubscriber<C> {
	async fn init(&mut self) -> Result<(), SubscriberError> {
		let client = match self.client.take() {
			Some(client) => client,
			None => Arc::new(C::connect(self.rpc_url.clone()).await?),
		};

		self.current_slot = client.finalized_slot().await.map_err(|e| {
			SubscriberError::init_error(format!("failed to get initial slot value: {}", e))
		})?;
		self.client = Some(client);

		info!(rpc_url = %self.rpc_url, "initialized slot subscriber");
		Ok(())
	}

	fn start(
		&self,
	) -> (
		mpsc::Receiver<TrackedWalletEvent>,
		mpsc::Receiver<SubscriberError>,
	) {
		let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
		let (error_tx, error_rx) = mpsc::channel(1);

		match self.client.clone() {
			Some(client) => {
				let registry = self.registry.clone();
				let cursor = self.current_slot;
				tokio::spawn(ingest(client, registry, cursor, event_tx, error_tx));
			}
			None => {
				tokio::spawn(async move {
					let _ = error_tx
						.send(SubscriberError::terminal_error(
							"slot subscriber started before initialization",
						))
						.await;
				});
			}
		}

		(event_rx, error_rx)
	}

	fn track_wallet(&self, wallet: &str) -> Result<(), SubscriberError> {
		self.registry.insert(parse_slot_address(wallet)?);
		Ok(())
	}

	fn untrack_wallet(&self, wallet: &str) -> Result<(), SubscriberError> {
		self.registry.remove(&parse_slot_address(wallet)?);
		Ok(())
	}

	fn name(&self) -> ChainName {
		ChainName::SlotMainnet
	}
}

async fn ingest<C: SlotRpcClient>(
	client: Arc<C>,
	registry: Arc<WalletRegistry<SlotAddress>>,
	mut current_slot: u64,
	events: mpsc::Sender<TrackedWalletEvent>,
	errors: mpsc::Sender<SubscriberError>,
) {
	let mut ticker = tokio::time::interval(TICK_INTERVAL);
	loop {
		ticker.tick().await;

		let slot = match client.finalized_slot().await {
			Ok(slot) => slot,
			Err(e) => {
				let _ = errors
					.send(SubscriberError::request_error(format!(
						"failed to get slot: {}",
						e
					)))
					.await;
				continue;
			}
		};

		if slot <= current_slot {
			continue;
		}

		for pending in current_slot..slot {
			let client = client.clone();
			let registry = registry.clone();
			let events = events.clone();
			tokio::spawn(async move {
				if let Err(e) = fetch_block(client.as_ref(), &registry, pending, &events).await {
					error!(
						chain = %ChainName::SlotMainnet,
						slot = pending,
						error = %e,
						"failed to fetch block"
					);
				}
			});
		}
		current_slot = slot;
	}
}

/// Fetches the block at `slot` and emits events for every tracked wallet
/// participating in its transactions.
pub async fn fetch_block<C: SlotRpcClient>(
	client: &C,
	registry: &WalletRegistry<SlotAddress>,
	slot: u64,
	events: &mpsc::Sender<TrackedWalletEvent>,
) -> Result<(), SubscriberError> {
	let started = Instant::now();
	let block = client.block(slot).await?;
	let fetch_elapsed = started.elapsed();

	process_block(&block, registry, events).await;

	info!(
		chain = %ChainName::SlotMainnet,
		slot,
		block_fetch_duration = ?fetch_elapsed,
		tx_processing_duration = ?started.elapsed().saturating_sub(fetch_elapsed),
		"processed a block"
	);
	Ok(())
}

/// Partitions each transaction's accounts by balance delta and emits one
/// event per tracked participant.
pub async fn process_block(
	block: &SlotBlock,
	registry: &WalletRegistry<SlotAddress>,
	events: &mpsc::Sender<TrackedWalletEvent>,
) {
	for tx in &block.transactions {
		let Some(meta) = &tx.meta else {
			continue;
		};
		let accounts = &tx.transaction.message.account_keys;
		if accounts.is_empty() || meta.pre_balances.len() != meta.post_balances.len() {
			continue;
		}

		let mut senders: Vec<&str> = Vec::new();
		let mut sender_amounts: Vec<i64> = Vec::new();
		let mut recipients: Vec<&str> = Vec::new();
		let mut recipient_amounts: Vec<i64> = Vec::new();

		for (i, account) in accounts.iter().enumerate() {
			let (Some(pre), Some(post)) = (meta.pre_balances.get(i), meta.post_balances.get(i))
			else {
				break;
			};
			let delta = post - pre;
			if delta == 0 {
				continue;
			}
			if delta < 0 {
				senders.push(account);
				sender_amounts.push(-delta);
			} else {
				recipients.push(account);
				recipient_amounts.push(delta);
			}
		}

		let senders_joined = senders.join(",");
		let recipients_joined = recipients.join(",");

		for (i, sender) in senders.iter().enumerate() {
			if !is_tracked(registry, sender) {
				continue;
			}
			let event = TrackedWalletEvent {
				chain_name: ChainName::SlotMainnet,
				source: sender.to_string(),
				destination: recipients_joined.clone(),
				amount: U256::from(sender_amounts[i] as u64),
				fees: U256::from(meta.fee),
			};
			if events.send(event).await.is_err() {
				return;
			}
		}

		for (i, recipient) in recipients.iter().enumerate() {
			if !is_tracked(registry, recipient) {
				continue;
			}
			let event = TrackedWalletEvent {
				chain_name: ChainName::SlotMainnet,
				source: senders_joined.clone(),
				destination: recipient.to_string(),
				amount: U256::from(recipient_amounts[i] as u64),
				// The fee is paid by the sending side
				fees: U256::zero(),
			};
			if events.send(event).await.is_err() {
				return;
			}
		}
	}
}

fn is_tracked(registry: &WalletRegistry<SlotAddress>, account: &str) -> bool {
	match decode_slot_address(account) {
		Some(address) => registry.contains(&address),
		None => false,
	}
}

fn decode_slot_address(wallet: &str) -> Option<SlotAddress> {
	let bytes = bs58::decode(wallet).into_vec().ok()?;
	SlotAddress::try_from(bytes.as_slice()).ok()
}

fn parse_slot_address(wallet: &str) -> Result<SlotAddress, SubscriberError> {
	decode_slot_address(wallet)
		.ok_or_else(|| SubscriberError::validation_error("invalid slot wallet address"))
}
