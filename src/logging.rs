//! Logging prelude module for convenient access to tracing macros.
//!
//! # Usage
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("Pushing {}", remote_path);
//! debug!("{} -> {:?}", path, verdict);
//! ```

pub use tracing::{debug, error, info, trace, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (usually the
/// `logLevel` config value) is used:
///
/// ```bash
/// RUST_LOG=debug vaultsync push jcr_root/apps/myproj
/// RUST_LOG=vaultsync::reconcile=trace vaultsync pull jcr_root/apps/myproj
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
