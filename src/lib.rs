//! Multi-chain tracked-wallet transaction pipeline.
//!
//! Watches an EVM chain, a UTXO chain, and a parallel-slot chain in near
//! real time and emits a unified stream of tracked-wallet events for value
//! transfers touching registered addresses. Wallets are registered per
//! chain through an administrative HTTP surface.

pub mod api;
pub mod bootstrap;
pub mod models;
pub mod services;
pub mod utils;

pub use models::{ChainName, Config, TrackedWalletEvent};
pub use services::subscriber::{
	SubscriberError, SubscriberManager, TransactionSubscriber, WalletRegistry,
};
