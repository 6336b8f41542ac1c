//! Concurrent wallet registry shared between ingestion loops and admin
//! callers.

use std::{
	collections::HashSet,
	hash::Hash,
	sync::{PoisonError, RwLock},
};

/// Chain-scoped set of canonical wallet addresses.
///
/// Membership checks run on the hot block-processing path under a read lock;
/// track/untrack calls take the write lock. Reads never hold the lock across
/// an await point, so admin latency is bounded by the set mutation alone.
#[derive(Debug, Default)]
pub struct WalletRegistry<A> {
	wallets: RwLock<HashSet<A>>,
}

impl<A: Eq + Hash> WalletRegistry<A> {
	pub fn new() -> Self {
		Self {
			wallets: RwLock::new(HashSet::new()),
		}
	}

	/// Registers an address. Re-registering an already tracked address is a
	/// no-op.
	pub fn insert(&self, address: A) {
		self.wallets
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(address);
	}

	/// Deregisters an address. Removing an address that was never tracked is
	/// a no-op.
	pub fn remove(&self, address: &A) {
		self.wallets
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.remove(address);
	}

	pub fn contains(&self, address: &A) -> bool {
		self.wallets
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.contains(address)
	}

	pub fn len(&self) -> usize {
		self.wallets
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
