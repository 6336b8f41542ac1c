//! Subscriber error types and handling.
//!
//! Groups every failure a chain subscriber or the subscriber manager can
//! produce: initialisation, terminal ingestion failures, transient RPC
//! failures, address validation, and lookups for unregistered chains.

use std::{error::Error, fmt};

use tracing::error;

/// Represents possible errors raised by chain subscribers and their manager
#[derive(Debug)]
pub enum SubscriberError {
	/// Errors raised while initialising a subscriber
	///
	/// Examples include:
	/// - RPC dial failures
	/// - Initial height / slot / chain-id fetch failures
	/// - A chain that already has a registered subscriber
	InitError(String),

	/// Terminal ingestion errors
	///
	/// The originating subscriber's ingestion loop has exited and the chain
	/// is lost until the process restarts.
	TerminalError(String),

	/// Transient RPC failures reported while ingestion continues
	RequestError(String),

	/// A malformed wallet address was passed to track/untrack
	ValidationError(String),

	/// Track/untrack was requested for a chain with no registered subscriber
	UnknownChainError(String),
}

impl SubscriberError {
	fn format_message(&self) -> String {
		match self {
			Self::InitError(msg) => format!("Init error: {}", msg),
			Self::TerminalError(msg) => format!("Terminal error: {}", msg),
			Self::RequestError(msg) => format!("Request error: {}", msg),
			Self::ValidationError(msg) => format!("Validation error: {}", msg),
			Self::UnknownChainError(msg) => format!("Unknown chain error: {}", msg),
		}
	}

	/// Creates a new init error with logging
	pub fn init_error(msg: impl Into<String>) -> Self {
		let error = Self::InitError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new terminal error with logging
	pub fn terminal_error(msg: impl Into<String>) -> Self {
		let error = Self::TerminalError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new request error with logging
	pub fn request_error(msg: impl Into<String>) -> Self {
		let error = Self::RequestError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new validation error without logging; these surface directly
	/// to the admin caller
	pub fn validation_error(msg: impl Into<String>) -> Self {
		Self::ValidationError(msg.into())
	}

	/// Creates a new unknown-chain error without logging; these surface
	/// directly to the admin caller
	pub fn unknown_chain_error(msg: impl Into<String>) -> Self {
		Self::UnknownChainError(msg.into())
	}
}

impl fmt::Display for SubscriberError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for SubscriberError {}
