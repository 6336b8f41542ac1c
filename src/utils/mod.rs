//! Utility modules for common functionality.

mod logging;

pub use logging::{setup_logging, setup_logging_with_writer};
