//! Subscriber manager: registration, admin dispatch, and event fan-in.

use std::collections::HashMap;

use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::{
	models::{ChainName, TrackedWalletEvent},
	services::subscriber::{SubscriberError, TransactionSubscriber},
};

/// Owns every chain subscriber in the process, keyed by chain name.
///
/// Admin calls are forwarded to the right subscriber; `start_all` merges all
/// per-chain event streams into a single caller-supplied sink.
#[derive(Default)]
pub struct SubscriberManager {
	subscribers: HashMap<ChainName, Box<dyn TransactionSubscriber>>,
}

impl SubscriberManager {
	pub fn new() -> Self {
		Self {
			subscribers: HashMap::new(),
		}
	}

	/// Registers subscribers and initialises each of them. Not
	/// concurrency-safe; invoked once at startup.
	///
	/// # Errors
	/// Stops at the first failure: a chain that already has a subscriber, or
	/// a subscriber whose `init` fails.
	pub async fn register_subscribers(
		&mut self,
		subscribers: Vec<Box<dyn TransactionSubscriber>>,
	) -> Result<(), SubscriberError> {
		for mut subscriber in subscribers {
			let chain = subscriber.name();
			if self.subscribers.contains_key(&chain) {
				return Err(SubscriberError::init_error(format!(
					"subscriber for chain {} already exists",
					chain
				)));
			}

			subscriber.init().await.map_err(|e| {
				SubscriberError::init_error(format!("initializing {} subscriber: {}", chain, e))
			})?;
			self.subscribers.insert(chain, subscriber);
		}
		Ok(())
	}

	/// Starts tracking the wallet's transactions within the given chain
	/// subscriber.
	pub fn track_wallet(&self, wallet: &str, chain: ChainName) -> Result<(), SubscriberError> {
		match self.subscribers.get(&chain) {
			Some(subscriber) => subscriber.track_wallet(wallet),
			None => Err(SubscriberError::unknown_chain_error(format!(
				"no registered subscriber for chain {}",
				chain
			))),
		}
	}

	/// Stops tracking the wallet's transactions within the given chain
	/// subscriber.
	pub fn untrack_wallet(&self, wallet: &str, chain: ChainName) -> Result<(), SubscriberError> {
		match self.subscribers.get(&chain) {
			Some(subscriber) => subscriber.untrack_wallet(wallet),
			None => Err(SubscriberError::unknown_chain_error(format!(
				"no registered subscriber for chain {}",
				chain
			))),
		}
	}

	/// Starts every registered subscriber and forwards their events to
	/// `sink`. Blocks until the first operational error arrives from any
	/// subscriber, which is then returned. The sink is never closed by the
	/// manager.
	///
	/// Fan-in tasks are torn down before returning so no task outlives the
	/// call.
	pub async fn start_all(&self, sink: mpsc::Sender<TrackedWalletEvent>) -> SubscriberError {
		let (error_tx, mut error_rx) = mpsc::channel::<SubscriberError>(1);
		let (shutdown_tx, shutdown_rx) = watch::channel(false);

		for subscriber in self.subscribers.values() {
			let (events, errors) = subscriber.start();
			info!(chain = %subscriber.name(), "started subscriber");
			tokio::spawn(fan_in(
				events,
				errors,
				sink.clone(),
				error_tx.clone(),
				shutdown_rx.clone(),
			));
		}
		drop(error_tx);

		let error = match error_rx.recv().await {
			Some(error) => error,
			// Every fan-in task exited without reporting; nothing is left to
			// produce events.
			None => SubscriberError::terminal_error("all subscriber channels closed"),
		};
		let _ = shutdown_tx.send(true);
		error
	}
}

/// Forwards one subscriber's events to the shared sink and its errors to the
/// manager's error channel, until told to shut down or both source channels
/// close.
async fn fan_in(
	mut events: mpsc::Receiver<TrackedWalletEvent>,
	mut errors: mpsc::Receiver<SubscriberError>,
	sink: mpsc::Sender<TrackedWalletEvent>,
	error_tx: mpsc::Sender<SubscriberError>,
	mut shutdown: watch::Receiver<bool>,
) {
	loop {
		tokio::select! {
			_ = shutdown.changed() => return,
			maybe_event = events.recv() => match maybe_event {
				Some(event) => {
					if sink.send(event).await.is_err() {
						return;
					}
				}
				None => break,
			},
			maybe_error = errors.recv() => match maybe_error {
				Some(error) => {
					// Fails only once the manager has already taken its
					// first error and dropped the receiver.
					let _ = error_tx.send(error).await;
				}
				None => break,
			},
		}
	}

	// The ingestion task dropped its channel pair; flush whatever is still
	// buffered.
	while let Some(error) = errors.recv().await {
		if error_tx.send(error).await.is_err() {
			return;
		}
	}
	while let Some(event) = events.recv().await {
		if sink.send(event).await.is_err() {
			return;
		}
	}
}
