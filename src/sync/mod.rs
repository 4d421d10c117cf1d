//! Push and pull orchestration
//!
//! [`VaultSync`] sequences filter parsing, staging, archiving and the remote
//! package manager calls into the push and pull pipelines. Every phase change
//! goes to the configured [`StatusSink`]; the temporary workspace and the
//! remote package are cleaned up on every exit path.

mod extras;
mod pipeline;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::{SyncLocks, TimestampCache};
use crate::callbacks::{LoggingSink, StatusSink};
use crate::config::{Config, Preferences};
use crate::error::SyncResult;
use crate::exclusion::load_ignore_rules;
use crate::filter::{default_filter_file, parse_filter_file, Filter};
use crate::logging::*;
use crate::packmgr::{HttpPackageManager, PackageManager};
use crate::paths::{self, CheckoutPath};
use crate::status::build_sync_status_list;
use crate::types::{to_entries, SyncAction, SyncEntry, SyncPhase};
use crate::validation::Validator;

/// Sync engine bound to one server
pub struct VaultSync {
	manager: Arc<dyn PackageManager>,
	config: Config,
	cache: Arc<TimestampCache>,
	locks: SyncLocks,
	sink: Box<dyn StatusSink>,
	filter_file: Option<PathBuf>,
}

/// Builder for [`VaultSync`]
#[derive(Default)]
pub struct VaultSyncBuilder {
	config: Option<Config>,
	manager: Option<Arc<dyn PackageManager>>,
	cache: Option<Arc<TimestampCache>>,
	locks: Option<SyncLocks>,
	sink: Option<Box<dyn StatusSink>>,
	filter_file: Option<PathBuf>,
}

impl VaultSyncBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn config(mut self, config: Config) -> Self {
		self.config = Some(config);
		self
	}

	/// Use `manager` instead of an HTTP client built from the config
	pub fn package_manager(mut self, manager: Arc<dyn PackageManager>) -> Self {
		self.manager = Some(manager);
		self
	}

	/// Share a last-synced cache with other engines
	pub fn cache(mut self, cache: Arc<TimestampCache>) -> Self {
		self.cache = Some(cache);
		self
	}

	/// Share the in-flight registry with other engines
	pub fn locks(mut self, locks: SyncLocks) -> Self {
		self.locks = Some(locks);
		self
	}

	pub fn sink(mut self, sink: Box<dyn StatusSink>) -> Self {
		self.sink = Some(sink);
		self
	}

	/// Read filters from `path` instead of `<checkout>/META-INF/vault/filter.xml`
	pub fn filter_file(mut self, path: impl Into<PathBuf>) -> Self {
		self.filter_file = Some(path.into());
		self
	}

	pub fn build(self) -> SyncResult<VaultSync> {
		let config = self.config.unwrap_or_default();
		config.validate()?;
		let manager = match self.manager {
			Some(manager) => manager,
			None => Arc::new(HttpPackageManager::from_config(&config)?),
		};
		Ok(VaultSync {
			manager,
			config,
			cache: self.cache.unwrap_or_default(),
			locks: self.locks.unwrap_or_default(),
			sink: self.sink.unwrap_or_else(|| Box::new(LoggingSink)),
			filter_file: self.filter_file,
		})
	}
}

impl VaultSync {
	pub fn builder() -> VaultSyncBuilder {
		VaultSyncBuilder::new()
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn cache(&self) -> &Arc<TimestampCache> {
		&self.cache
	}

	pub fn locks(&self) -> &SyncLocks {
		&self.locks
	}

	/// Send the local state of `path` to the server
	pub async fn push(&self, path: &Path) -> SyncResult<Vec<SyncEntry>> {
		self.run(SyncAction::Push, path).await
	}

	/// Replace the local state of `path` with the server's
	pub async fn pull(&self, path: &Path) -> SyncResult<Vec<SyncEntry>> {
		self.run(SyncAction::Pull, path).await
	}

	/// Verdicts a push of `path` would use, without touching the network
	pub async fn status(&self, path: &Path) -> SyncResult<Vec<SyncEntry>> {
		let checkout = CheckoutPath::locate(path)?;
		let filters = self.load_filters(&checkout)?;
		let ignore = load_ignore_rules(&checkout.content_root, path)?;
		let status = build_sync_status_list(&filters, &ignore, path)?;
		Ok(to_entries(&status))
	}

	/// Browser URL of `path` on the server
	pub fn remote_url(&self, path: &Path) -> SyncResult<String> {
		let checkout = CheckoutPath::locate(path)?;
		Ok(paths::remote_url(self.manager.server_url(), &checkout.remote_path, path.is_dir()))
	}

	fn filter_file_for(&self, checkout: &CheckoutPath) -> PathBuf {
		self.filter_file.clone().unwrap_or_else(|| default_filter_file(&checkout.content_root))
	}

	fn load_filters(&self, checkout: &CheckoutPath) -> SyncResult<Vec<Filter>> {
		let file = self.filter_file_for(checkout);
		debug!("Reading filters from {}", file.display());
		parse_filter_file(&file)
	}

	fn enter(&self, action: SyncAction, phase: SyncPhase) {
		info!("{}: {}", action, phase);
		self.sink.report_progress(phase);
	}

	fn external_command(&self, action: SyncAction) -> Option<&str> {
		match action {
			SyncAction::Push => self.config.push_command.as_deref(),
			SyncAction::Pull => self.config.pull_command.as_deref(),
		}
		.filter(|c| !c.trim().is_empty())
	}

	async fn run(&self, action: SyncAction, path: &Path) -> SyncResult<Vec<SyncEntry>> {
		self.enter(action, SyncPhase::Idle);
		let result = match self.external_command(action) {
			Some(command) => self.run_command(command, path).await,
			None => self.run_pipeline(action, path).await,
		};
		match result {
			Ok(entries) => {
				self.sink.report_progress(SyncPhase::Done);
				self.sink.report_result(&entries);
				Ok(entries)
			}
			Err(e) => {
				self.sink.report_progress(SyncPhase::Failed);
				self.sink.report_failure(&e);
				Err(e)
			}
		}
	}

	/// Whether auto-sync applies to this engine
	pub fn auto_sync_enabled(&self) -> bool {
		self.config.auto_sync_enabled()
	}
}

// vim: ts=4
