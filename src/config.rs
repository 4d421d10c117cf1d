//! Configuration for vaultsync
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (Config::default())
//! 2. Config file (`.toml`, or `.json`/`.json5`)
//! 3. Environment variables (VAULTSYNC_* prefix)
//! 4. CLI flags (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{SyncError, SyncResult};
use crate::validation::{
	validate_credentials, validate_repository_path, validate_server_url, validate_timeout_secs,
	ValidationError, Validator,
};

// ============================================================================
// MAIN CONFIGURATION STRUCT
// ============================================================================

/// Settings for syncing a checkout with one server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	// ========================================================================
	// SERVER
	// ========================================================================
	/// Base URL of the server (e.g. http://localhost:4502/contextpath)
	pub server_url: String,

	pub username: String,

	pub password: String,

	/// Skip TLS certificate validation
	pub accept_self_signed_certificates: bool,

	/// Timeout for each HTTP request, in seconds
	pub request_timeout_secs: u64,

	// ========================================================================
	// SYNC BEHAVIOR
	// ========================================================================
	/// Push files as they change
	pub auto_sync: bool,

	/// Group of the temporary packages
	pub package_group: String,

	/// External command run as `<command> <path>` instead of the package push
	pub push_command: Option<String>,

	/// External command run as `<command> <path>` instead of the package pull
	pub pull_command: Option<String>,

	/// What to do with a folder whose `.content.xml` was removed by a pull
	pub marker_folder_removal: MarkerFolderRemoval,

	/// Repository folder dependency files are posted to
	pub dependency_install_path: String,

	// ========================================================================
	// PERFORMANCE
	// ========================================================================
	/// Number of parallel hashing operations (0 = auto)
	pub parallel_hashing: usize,

	// ========================================================================
	// OUTPUT
	// ========================================================================
	/// Default log filter when RUST_LOG is unset
	pub log_level: String,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			// Server
			server_url: "http://localhost:4502".to_string(),
			username: "admin".to_string(),
			password: "admin".to_string(),
			accept_self_signed_certificates: false,
			request_timeout_secs: 30,

			// Sync behavior
			auto_sync: true,
			package_group: "tmp/repo".to_string(),
			push_command: None,
			pull_command: None,
			marker_folder_removal: MarkerFolderRemoval::WhenEmpty,
			dependency_install_path: "/apps/system/install".to_string(),

			// Performance
			parallel_hashing: 0, // 0 = auto

			// Output
			log_level: "info".to_string(),
		}
	}
}

impl Config {
	/// Load a config file, choosing the format by extension
	pub fn load(path: &Path) -> SyncResult<Self> {
		let text = fs::read_to_string(path).map_err(|e| SyncError::InvalidConfig {
			message: format!("cannot read {}: {}", path.display(), e),
		})?;
		let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
		let config = match ext.as_str() {
			"toml" => toml::from_str(&text).map_err(|e| SyncError::InvalidConfig {
				message: format!("{}: {}", path.display(), e),
			})?,
			"json" | "json5" => json5::from_str(&text).map_err(|e| SyncError::InvalidConfig {
				message: format!("{}: {}", path.display(), e),
			})?,
			other => {
				return Err(SyncError::InvalidConfig {
					message: format!("unsupported config format '{}' for {}", other, path.display()),
				})
			}
		};
		Ok(config)
	}

	/// Apply VAULTSYNC_* overrides from the process environment
	pub fn apply_env(&mut self) {
		self.apply_env_from(|key| std::env::var(key).ok());
	}

	/// Apply VAULTSYNC_* overrides using `lookup` as the environment
	pub fn apply_env_from<F>(&mut self, lookup: F)
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(url) = lookup("VAULTSYNC_SERVER_URL") {
			self.server_url = url;
		}
		if let Some(user) = lookup("VAULTSYNC_USER") {
			self.username = user;
		}
		if let Some(password) = lookup("VAULTSYNC_PASSWORD") {
			self.password = password;
		}
		if let Some(flag) = lookup("VAULTSYNC_ACCEPT_SELF_SIGNED") {
			self.accept_self_signed_certificates = matches!(flag.as_str(), "1" | "true" | "yes");
		}
		if let Some(flag) = lookup("VAULTSYNC_AUTO_SYNC") {
			self.auto_sync = matches!(flag.as_str(), "1" | "true" | "yes");
		}
	}

	/// Effective hashing parallelism
	pub fn hashing_parallelism(&self) -> usize {
		if self.parallel_hashing > 0 {
			self.parallel_hashing
		} else {
			std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
		}
	}
}

impl Validator for Config {
	fn validate(&self) -> Result<(), ValidationError> {
		validate_server_url(&self.server_url)?;
		validate_credentials(&self.username, &self.password)?;
		validate_timeout_secs(self.request_timeout_secs)?;
		validate_repository_path(&self.dependency_install_path)?;
		Ok(())
	}
}

// ============================================================================
// PREFERENCES
// ============================================================================

/// Read access to the user's sync preferences
pub trait Preferences: Send + Sync {
	fn remote_url(&self) -> &str;

	/// User name and password
	fn credentials(&self) -> (&str, &str);

	fn auto_sync_enabled(&self) -> bool;
}

impl Preferences for Config {
	fn remote_url(&self) -> &str {
		&self.server_url
	}

	fn credentials(&self) -> (&str, &str) {
		(&self.username, &self.password)
	}

	fn auto_sync_enabled(&self) -> bool {
		self.auto_sync
	}
}

// ============================================================================
// MARKER FOLDER REMOVAL
// ============================================================================

/// Policy for folders whose `.content.xml` marker is deleted by a pull
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerFolderRemoval {
	/// Leave folders in place
	Never,

	/// Remove the folder only once nothing is left in it (default)
	#[default]
	WhenEmpty,

	/// Remove the folder and everything still in it
	Recursive,
}

impl FromStr for MarkerFolderRemoval {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"never" | "keep" => Ok(Self::Never),
			"when-empty" | "empty" => Ok(Self::WhenEmpty),
			"recursive" | "always" => Ok(Self::Recursive),
			_ => Err(format!(
				"Unknown marker folder removal policy: {}. Valid options: never, when-empty, recursive",
				s
			)),
		}
	}
}

impl std::fmt::Display for MarkerFolderRemoval {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Never => write!(f, "never"),
			Self::WhenEmpty => write!(f, "when-empty"),
			Self::Recursive => write!(f, "recursive"),
		}
	}
}


// vim: ts=4
