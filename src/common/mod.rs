//! Common module
//!
//! This module contains shared types, errors, and utility functions used throughout the controller.

pub mod error;
pub mod fs;
pub mod log;
pub mod net;
pub mod signal;

// Re-export commonly used types and functions
pub use error::{WebhookError, Result};
pub use fs::read_to_string;
pub use log::init_logger;
pub use net::parse_socket_addr;
pub use signal::shutdown_signal;
