//! UTXO chain support: HTTP RPC client and the height-polling subscriber
//! with previous-output resolution.

mod client;
mod subscriber;

pub use client::{
	CoreRpcClient, UtxoBlock, UtxoRpcClient, UtxoScriptPubKey, UtxoTransaction, UtxoTxInput,
	UtxoTxOutput,
};
pub use subscriber::{apportion, UtxoSubscriber};
