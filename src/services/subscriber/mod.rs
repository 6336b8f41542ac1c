//! Chain subscriber capability contract and its supporting pieces.
//!
//! A chain subscriber turns raw chain data into a stream of
//! [`TrackedWalletEvent`](crate::models::TrackedWalletEvent) values for the
//! wallets registered with it. The three chain-specific implementations live
//! under [`crate::services::evm`], [`crate::services::utxo`] and
//! [`crate::services::slot`]; the [`SubscriberManager`] holds them by this
//! capability only.

mod error;
mod manager;
mod registry;

pub use error::SubscriberError;
pub use manager::SubscriberManager;
pub use registry::WalletRegistry;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::models::{ChainName, TrackedWalletEvent};

/// Subscribes to real-time chain data for one blockchain.
#[async_trait]
pub trait TransactionSubscriber: Send + Sync {
	/// Initialises the subscriber: dials the RPC endpoint and fetches
	/// whatever initial chain state ingestion needs (head, tip height,
	/// finalized slot).
	async fn init(&mut self) -> Result<(), SubscriberError>;

	/// Starts the ingestion loop. Does not block.
	///
	/// # Returns
	/// The event channel carrying one [`TrackedWalletEvent`] per matched
	/// transfer, and the error channel carrying operational failures. A
	/// terminal failure on the error channel means the ingestion loop has
	/// exited.
	fn start(
		&self,
	) -> (
		mpsc::Receiver<TrackedWalletEvent>,
		mpsc::Receiver<SubscriberError>,
	);

	/// Starts tracking transactions of the provided wallet.
	///
	/// The address is validated against the chain's canonical form; invalid
	/// input is rejected without touching the registry.
	fn track_wallet(&self, wallet: &str) -> Result<(), SubscriberError>;

	/// Stops tracking the wallet's transactions.
	fn untrack_wallet(&self, wallet: &str) -> Result<(), SubscriberError>;

	/// The chain this subscriber serves.
	fn name(&self) -> ChainName;
}
