//! Process configuration loaded from the environment.
//!
//! Values can come from the process environment directly or from a `.env`
//! file loaded at startup. The three RPC endpoints are mandatory; the admin
//! API bind address and port fall back to sensible defaults.

use std::{env, error::Error, fmt};

/// Environment variable holding the websocket RPC endpoint of the EVM chain.
pub const RPC_URL_EVM: &str = "RPC_URL_EVM";
/// Environment variable holding the HTTP RPC endpoint of the UTXO chain.
pub const RPC_URL_UTXO: &str = "RPC_URL_UTXO";
/// Environment variable holding the HTTP RPC endpoint of the slot chain.
pub const RPC_URL_SLOT: &str = "RPC_URL_SLOT";
/// Environment variable overriding the admin API bind address.
pub const API_BIND_ADDR: &str = "API_BIND_ADDR";
/// Environment variable overriding the admin API port.
pub const API_PORT: &str = "API_PORT";

const DEFAULT_API_BIND_ADDR: &str = "127.0.0.1";
const DEFAULT_API_PORT: u16 = 8080;

/// Errors raised while assembling the process configuration. These are fatal
/// at startup.
#[derive(Debug)]
pub enum ConfigError {
	/// A required environment variable is absent or empty
	MissingVariable(String),
	/// An environment variable is present but cannot be parsed
	InvalidVariable(String, String),
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::MissingVariable(name) => {
				write!(f, "required environment variable {} is missing", name)
			}
			Self::InvalidVariable(name, reason) => {
				write!(f, "environment variable {} is invalid: {}", name, reason)
			}
		}
	}
}

impl Error for ConfigError {}

/// Resolved process configuration handed to the bootstrap.
#[derive(Debug, Clone)]
pub struct Config {
	pub evm_rpc_url: String,
	pub utxo_rpc_url: String,
	pub slot_rpc_url: String,
	pub api_bind_addr: String,
	pub api_port: u16,
}

impl Config {
	/// Reads the configuration from the environment.
	///
	/// # Returns
	/// * `Result<Self, ConfigError>` - Resolved configuration, or the first
	///   missing/invalid variable
	pub fn from_env() -> Result<Self, ConfigError> {
		let api_port = match env::var(API_PORT) {
			Ok(value) if !value.is_empty() => value
				.parse::<u16>()
				.map_err(|e| ConfigError::InvalidVariable(API_PORT.to_string(), e.to_string()))?,
			_ => DEFAULT_API_PORT,
		};

		Ok(Self {
			evm_rpc_url: required(RPC_URL_EVM)?,
			utxo_rpc_url: required(RPC_URL_UTXO)?,
			slot_rpc_url: required(RPC_URL_SLOT)?,
			api_bind_addr: env::var(API_BIND_ADDR)
				.ok()
				.filter(|value| !value.is_empty())
				.unwrap_or_else(|| DEFAULT_API_BIND_ADDR.to_string()),
			api_port,
		})
	}

	/// The `host:port` pair the admin API binds to.
	pub fn api_bind_address(&self) -> String {
		format!("{}:{}", self.api_bind_addr, self.api_port)
	}
}

fn required(name: &str) -> Result<String, ConfigError> {
	env::var(name)
		.ok()
		.filter(|value| !value.is_empty())
		.ok_or_else(|| ConfigError::MissingVariable(name.to_string()))
}
