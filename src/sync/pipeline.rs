//! Pipeline states
//!
//! Push: ParsingFilters -> Staging -> Archiving -> Uploading -> Installing.
//! Pull: ParsingFilters -> Staging -> Archiving -> Uploading -> Building ->
//! Downloading -> Extracting -> Reconciling.
//! Both end in CleaningUp, whatever happened before.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::VaultSync;
use crate::cache::CacheEntry;
use crate::error::{SyncError, SyncResult};
use crate::exclusion::{load_ignore_rules, IgnoreRuleSet};
use crate::filter::Filter;
use crate::logging::*;
use crate::package::{
	create_archive, extract_archive, package_filters, stage_included, write_meta_inf, PackageInfo,
	TempWorkspace,
};
use crate::paths::CheckoutPath;
use crate::reconcile::Reconciler;
use crate::status::build_sync_status_list;
use crate::types::{to_entries, FileSyncStatus, SyncAction, SyncEntry, SyncPhase, SyncVerdict};

/// Everything one push or pull accumulates on its way through the states
struct SyncJob<'a> {
	action: SyncAction,
	path: &'a Path,
	checkout: CheckoutPath,
	package: PackageInfo,
	filters: Vec<Filter>,
	ignore: IgnoreRuleSet,
	status: FileSyncStatus,
	staging: Option<TempWorkspace>,
	extraction: Option<TempWorkspace>,
	archive: Option<PathBuf>,
	download: Option<PathBuf>,
	/// Uploaded package not yet deleted from the server
	remote_package: Option<String>,
	entries: Vec<SyncEntry>,
}

impl<'a> SyncJob<'a> {
	fn new(action: SyncAction, path: &'a Path, checkout: CheckoutPath, group: &str) -> Self {
		let package = PackageInfo::new(&checkout.remote_path, group);
		SyncJob {
			action,
			path,
			checkout,
			package,
			filters: Vec::new(),
			ignore: IgnoreRuleSet::empty(),
			status: FileSyncStatus::new(),
			staging: None,
			extraction: None,
			archive: None,
			download: None,
			remote_package: None,
			entries: Vec::new(),
		}
	}

	fn staging(&self) -> SyncResult<&TempWorkspace> {
		self.staging.as_ref().ok_or_else(|| SyncError::Other { message: "nothing staged".into() })
	}

	fn remote_package(&self) -> SyncResult<&str> {
		self.remote_package
			.as_deref()
			.ok_or_else(|| SyncError::Other { message: "no package uploaded".into() })
	}
}

impl VaultSync {
	pub(super) async fn run_pipeline(
		&self,
		action: SyncAction,
		path: &Path,
	) -> SyncResult<Vec<SyncEntry>> {
		let checkout = CheckoutPath::locate(path)?;
		let _guard = self.locks.acquire(&checkout.content_root, self.manager.server_url())?;
		let mut job = SyncJob::new(action, path, checkout, &self.config.package_group);

		let result = match action {
			SyncAction::Push => self.push_states(&mut job).await,
			SyncAction::Pull => self.pull_states(&mut job).await,
		};
		self.clean_up(&mut job).await;
		result.map_err(|e| e.during(&action.to_string(), &job.checkout.remote_path))?;
		Ok(job.entries)
	}

	async fn push_states(&self, job: &mut SyncJob<'_>) -> SyncResult<()> {
		self.parse_filters(job)?;
		if !self.stage_push(job)? {
			return Ok(());
		}
		self.archive(job).await?;
		self.upload(job).await?;
		self.install(job).await?;
		self.remember_pushed(job);
		Ok(())
	}

	async fn pull_states(&self, job: &mut SyncJob<'_>) -> SyncResult<()> {
		self.parse_filters(job)?;
		if !self.stage_pull(job)? {
			return Ok(());
		}
		self.archive(job).await?;
		self.upload(job).await?;
		self.build_remote(job).await?;
		self.download(job).await?;
		self.extract(job).await?;
		self.reconcile(job).await
	}

	fn parse_filters(&self, job: &mut SyncJob<'_>) -> SyncResult<()> {
		self.enter(job.action, SyncPhase::ParsingFilters);
		job.filters = self.load_filters(&job.checkout)?;
		job.ignore = load_ignore_rules(&job.checkout.content_root, job.path)?;
		debug!("{} filter(s) loaded", job.filters.len());
		Ok(())
	}

	/// Returns false when nothing is included and the network can be skipped
	fn stage_push(&self, job: &mut SyncJob<'_>) -> SyncResult<bool> {
		self.enter(job.action, SyncPhase::Staging);
		job.status = build_sync_status_list(&job.filters, &job.ignore, job.path)?;
		job.entries = to_entries(&job.status);

		let owners: BTreeSet<usize> = job
			.status
			.values()
			.filter(|e| e.verdict == SyncVerdict::Included)
			.filter_map(|e| e.owner)
			.collect();
		if owners.is_empty() {
			info!("Nothing to push under {}", job.checkout.remote_path);
			return Ok(false);
		}
		let owners: Vec<usize> = owners.into_iter().collect();
		let filters = package_filters(&job.filters, &owners, &job.checkout.remote_path);

		let staging = job.staging.insert(TempWorkspace::new()?);
		let staged = stage_included(&job.status, &job.checkout.jcr_root, staging)?;
		write_meta_inf(staging, &job.package, &filters)?;
		info!("Staged {} file(s) for {}", staged, job.package.name);
		Ok(true)
	}

	/// Returns false when no filter applies to the pulled path
	fn stage_pull(&self, job: &mut SyncJob<'_>) -> SyncResult<bool> {
		self.enter(job.action, SyncPhase::Staging);
		let remote_path = job.checkout.remote_path.as_str();
		let relevant: Vec<usize> = job
			.filters
			.iter()
			.enumerate()
			.filter(|(_, f)| f.is_relevant_to(remote_path))
			.map(|(i, _)| i)
			.collect();
		if relevant.is_empty() {
			warn!("No filter applies to {}, nothing to pull", remote_path);
			return Ok(false);
		}
		let filters = package_filters(&job.filters, &relevant, remote_path);
		let staging = job.staging.insert(TempWorkspace::new()?);
		write_meta_inf(staging, &job.package, &filters)?;
		Ok(true)
	}

	async fn archive(&self, job: &mut SyncJob<'_>) -> SyncResult<()> {
		self.enter(job.action, SyncPhase::Archiving);
		let staging = job.staging()?;
		let root = staging.path().to_path_buf();
		let dest = staging.archive_path(&job.package);
		let target = dest.clone();
		let entries = tokio::task::spawn_blocking(move || create_archive(&root, &target)).await??;
		debug!("Archived {} entries into {}", entries, dest.display());
		job.archive = Some(dest);
		Ok(())
	}

	async fn upload(&self, job: &mut SyncJob<'_>) -> SyncResult<()> {
		self.enter(job.action, SyncPhase::Uploading);
		let archive = job
			.archive
			.as_deref()
			.ok_or_else(|| SyncError::Other { message: "no archive built".into() })?;
		self.manager.upload(archive).await?;
		job.remote_package = Some(job.package.package_path());
		Ok(())
	}

	async fn install(&self, job: &mut SyncJob<'_>) -> SyncResult<()> {
		self.enter(job.action, SyncPhase::Installing);
		self.manager.install(job.remote_package()?).await?;
		self.delete_remote_package(job).await;
		Ok(())
	}

	async fn build_remote(&self, job: &mut SyncJob<'_>) -> SyncResult<()> {
		self.enter(job.action, SyncPhase::Building);
		self.manager.build(job.remote_package()?).await
	}

	async fn download(&self, job: &mut SyncJob<'_>) -> SyncResult<()> {
		self.enter(job.action, SyncPhase::Downloading);
		let extraction = job.extraction.insert(TempWorkspace::new()?);
		let dest = extraction.archive_path(&job.package);
		let package = job
			.remote_package
			.as_deref()
			.ok_or_else(|| SyncError::Other { message: "no package uploaded".into() })?;
		self.manager.download(package, &dest).await?;
		job.download = Some(dest);
		self.delete_remote_package(job).await;
		Ok(())
	}

	async fn extract(&self, job: &mut SyncJob<'_>) -> SyncResult<()> {
		self.enter(job.action, SyncPhase::Extracting);
		let (Some(archive), Some(extraction)) = (job.download.clone(), job.extraction.as_ref()) else {
			return Err(SyncError::Other { message: "nothing downloaded".into() });
		};
		let dest = extraction.path().to_path_buf();
		let entries = tokio::task::spawn_blocking(move || extract_archive(&archive, &dest)).await??;
		debug!("Extracted {} entries", entries);
		Ok(())
	}

	async fn reconcile(&self, job: &mut SyncJob<'_>) -> SyncResult<()> {
		self.enter(job.action, SyncPhase::Reconciling);
		let extracted = match job.extraction.as_ref() {
			Some(extraction) => extraction.jcr_root(),
			None => return Err(SyncError::Other { message: "nothing extracted".into() }),
		};
		let reconciler = Reconciler {
			filters: &job.filters,
			ignore: &job.ignore,
			local_jcr_root: &job.checkout.jcr_root,
			remote_path: &job.checkout.remote_path,
			parallelism: self.config.hashing_parallelism(),
			marker_policy: self.config.marker_folder_removal,
			cache: Some(self.cache.as_ref()),
		};
		let outcome = reconciler.run(&extracted).await?;
		job.status = outcome.status;
		job.entries = to_entries(&job.status);
		Ok(())
	}

	/// Record the mtimes of pushed files so unchanged files skip auto-sync
	fn remember_pushed(&self, job: &SyncJob<'_>) {
		for (remote, entry) in &job.status {
			if entry.verdict != SyncVerdict::Included {
				continue;
			}
			let local = job.checkout.local_path(remote);
			if let Ok(mtime) = fs::metadata(&local).and_then(|m| m.modified()) {
				let digest = self.cache.fresh_digest(remote, mtime);
				self.cache.put(remote, CacheEntry { mtime, digest });
			}
		}
	}

	async fn delete_remote_package(&self, job: &mut SyncJob<'_>) {
		if let Some(package) = job.remote_package.take() {
			match self.manager.delete(&package).await {
				Ok(()) => debug!("Deleted remote package {}", package),
				Err(e) => warn!("Unable to delete remote package {}: {}", package, e),
			}
		}
	}

	async fn clean_up(&self, job: &mut SyncJob<'_>) {
		self.enter(job.action, SyncPhase::CleaningUp);
		self.delete_remote_package(job).await;
		for workspace in [job.staging.take(), job.extraction.take()].into_iter().flatten() {
			if let Err(e) = workspace.close() {
				warn!("Unable to remove temporary workspace: {}", e);
			}
		}
	}
}

// vim: ts=4
