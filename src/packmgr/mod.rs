//! Remote package manager interface
//!
//! The sync engine talks to the remote only through [`PackageManager`], so
//! tests can substitute an in-memory implementation for the HTTP client.

mod http;

pub use http::HttpPackageManager;

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

use crate::error::SyncResult;

/// JSON service endpoint, relative to the server URL
pub const SERVICE_PATH: &str = "/crx/packmgr/service/.json";

/// Folder packages live under, relative to the server URL
pub const PACKAGES_PATH: &str = "/etc/packages";

/// Body returned by every package manager command
#[derive(Debug, Clone, Deserialize)]
pub struct CommandResponse {
	pub success: bool,
	#[serde(default)]
	pub msg: String,
}

/// Operations of the remote package manager
///
/// `package_path` is the path below `/etc/packages`, e.g.
/// `tmp/repo/repo_apps_myproj-1700000000000.zip`.
#[async_trait]
pub trait PackageManager: Send + Sync {
	/// Server this manager talks to, used in messages and lock keys
	fn server_url(&self) -> &str;

	/// Upload an archive, replacing any package with the same name
	async fn upload(&self, archive: &Path) -> SyncResult<()>;

	/// Install an uploaded package into the repository
	async fn install(&self, package_path: &str) -> SyncResult<()>;

	/// Rebuild an uploaded package from the repository content its filter selects
	async fn build(&self, package_path: &str) -> SyncResult<()>;

	/// Remove a package
	async fn delete(&self, package_path: &str) -> SyncResult<()>;

	/// Stream a package archive into `dest`
	async fn download(&self, package_path: &str, dest: &Path) -> SyncResult<()>;

	/// Create or replace a file node below `parent_path`
	async fn post_file(&self, parent_path: &str, file: &Path) -> SyncResult<()>;
}

// vim: ts=4
