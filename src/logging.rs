//! Logging prelude and subscriber setup.
//!
//! Library code only emits `tracing` events. Installing a subscriber is left
//! to the binary (or to tests that want to see output).
//!
//! ```ignore
//! use crate::logging::*;
//!
//! debug!("Cannot open {}: {}", path.display(), err);
//! ```

pub use tracing::{debug, error, info, trace, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// `default_level` is used when `RUST_LOG` is not set:
///
/// ```bash
/// RUST_LOG=debug treemirror src dst
/// RUST_LOG=treemirror::copy=trace treemirror src dst
/// ```
pub fn init_tracing(default_level: &str) {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
		)
		.with_writer(std::io::stderr)
		.try_init();
}

// vim: ts=4
