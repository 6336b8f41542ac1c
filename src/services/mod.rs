//! Service layer: the chain subscribers and the capability contract that
//! binds them.
//!
//! - `subscriber`: capability trait, wallet registry, error taxonomy, and
//!   the manager that fans every subscriber into one sink
//! - `evm`, `utxo`, `slot`: the three chain-specific subscriber
//!   implementations and their RPC clients

pub mod evm;
pub mod slot;
pub mod subscriber;
pub mod utxo;
