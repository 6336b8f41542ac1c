//! EVM chain support: websocket RPC client, sender recovery, and the
//! push-based subscriber.

mod client;
mod signer;
mod subscriber;

pub use client::{EvmRpcClient, Web3EvmClient};
pub use signer::{checksum_address, ChainSigner};
pub use subscriber::EvmSubscriber;
