//! Slot chain support: HTTP RPC client and the slot-cursor subscriber with
//! per-slot worker fan-out.

mod client;
mod subscriber;

pub use client::{
	SlotBlock, SlotHttpClient, SlotMessage, SlotRpcClient, SlotTransaction, SlotTransactionBody,
	SlotTransactionMeta,
};
pub use subscriber::{fetch_block, process_block, SlotAddress, SlotSubscriber};
