//! Bootstrap: wires the chain subscribers, the admin API, and the event
//! sink consumer into a running process.
//!
//! The subscribers and the admin server run until the first critical error,
//! which terminates the process; transient per-block failures never reach
//! this layer.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::{
	api::create_api_server,
	models::{Config, TrackedWalletEvent},
	services::{
		evm::EvmSubscriber, slot::SlotSubscriber, subscriber::SubscriberManager,
		utxo::UtxoSubscriber,
	},
};

/// Builds the subscriber set from configuration, starts everything, and
/// consumes the unified event stream until a critical error or a shutdown
/// signal arrives.
pub async fn run(config: Config) -> Result<(), anyhow::Error> {
	let evm = EvmSubscriber::new(&config.evm_rpc_url);
	let utxo = UtxoSubscriber::new(&config.utxo_rpc_url);
	let slot = SlotSubscriber::new(&config.slot_rpc_url);

	let mut manager = SubscriberManager::new();
	manager
		.register_subscribers(vec![Box::new(evm), Box::new(utxo), Box::new(slot)])
		.await
		.context("failed to register subscribers")?;
	let manager = Arc::new(manager);

	let (sink_tx, mut sink_rx) = mpsc::channel::<TrackedWalletEvent>(1);
	let (critical_tx, mut critical_rx) = mpsc::channel::<anyhow::Error>(1);

	{
		let manager = manager.clone();
		let critical = critical_tx.clone();
		tokio::spawn(async move {
			let error = manager.start_all(sink_tx).await;
			let _ = critical
				.send(anyhow::Error::new(error).context("subscriber failure"))
				.await;
		});
	}

	let server = create_api_server(config.api_bind_address(), manager.clone())
		.context("failed to start api server")?;
	tokio::spawn(async move {
		if let Err(e) = server.await {
			let _ = critical_tx
				.send(anyhow::Error::new(e).context("api server failure"))
				.await;
		}
	});

	info!("tracked-wallet pipeline started");

	loop {
		tokio::select! {
			Some(error) = critical_rx.recv() => {
				error!(error = %error, "service encountered critical error");
				return Err(error);
			}
			Some(event) = sink_rx.recv() => {
				match serde_json::to_string(&event) {
					Ok(payload) => info!(event = %payload, "received new event"),
					Err(e) => error!(error = %e, "failed to serialise event"),
				}
			}
			_ = tokio::signal::ctrl_c() => {
				info!("shutdown signal received, stopping");
				return Ok(());
			}
		}
	}
}
