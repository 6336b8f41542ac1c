//! Logging setup for the application.
//!
//! Structured logging goes to stdout through `tracing_subscriber`; the level
//! is controlled by `RUST_LOG` and defaults to `info`.

use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Initialises the global tracing subscriber writing to stdout.
pub fn setup_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
	setup_logging_with_writer(std::io::stdout)
}

/// Initialises the global tracing subscriber with a custom writer. Tests use
/// this to capture log output.
pub fn setup_logging_with_writer<W>(
	writer: W,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>
where
	W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::registry()
		.with(filter)
		.with(
			fmt::layer()
				.with_writer(writer)
				.event_format(fmt::format().with_level(true).with_target(true).compact()),
		)
		.try_init()?;
	Ok(())
}
