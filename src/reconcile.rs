//! Pull reconciliation
//!
//! After a pulled package is extracted, only files whose content differs are
//! copied into the checkout, and files the remote no longer has are removed.

use futures::stream::{self, StreamExt, TryStreamExt};
use md5::{Digest, Md5};
use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::cache::{CacheEntry, TimestampCache};
use crate::config::MarkerFolderRemoval;
use crate::error::{SyncError, SyncResult};
use crate::exclusion::{is_basic_exclude, IgnoreRuleSet};
use crate::filter::{is_same_or_descendant, Filter};
use crate::logging::*;
use crate::paths;
use crate::status::{build_sync_status_list, DirectoryLister, FsLister};
use crate::types::{FileSyncStatus, StatusEntry, SyncVerdict};

pub type Md5Digest = [u8; 16];

/// Repository path -> content digest
pub type DigestMap = HashMap<String, Md5Digest>;

/// MD5 of a file's content
pub fn md5_file(path: &Path) -> io::Result<Md5Digest> {
	let mut file = File::open(path)?;
	let mut hasher = Md5::new();
	io::copy(&mut file, &mut hasher)?;
	let mut digest = [0u8; 16];
	digest.copy_from_slice(&hasher.finalize());
	Ok(digest)
}

/// Hash every file below `root`, keyed by repository path
///
/// Up to `parallelism` files are hashed at once; the first failure aborts the
/// batch. A missing `root` yields an empty map. When `cache` is given, files
/// whose mtime matches the cached one reuse the cached digest.
pub async fn hash_tree(
	jcr_root: &Path,
	root: &Path,
	parallelism: usize,
	cache: Option<&TimestampCache>,
) -> SyncResult<DigestMap> {
	if !root.exists() {
		return Ok(DigestMap::new());
	}
	let files = FsLister.list_descendants(root)?;
	let jobs = files.into_iter().filter_map(|file| {
		let remote = paths::remote_path(jcr_root, &file)?;
		Some(async move {
			let mtime = tokio::fs::metadata(&file).await?.modified()?;
			if let Some(digest) = cache.and_then(|c| c.fresh_digest(&remote, mtime)) {
				return Ok::<_, SyncError>((remote, digest));
			}
			let digest = tokio::task::spawn_blocking(move || md5_file(&file)).await??;
			if let Some(cache) = cache {
				cache.put(&remote, CacheEntry { mtime, digest: Some(digest) });
			}
			trace!("{} {}", hex::encode(digest), remote);
			Ok((remote, digest))
		})
	});
	let pairs: Vec<(String, Md5Digest)> =
		stream::iter(jobs).buffer_unordered(parallelism.max(1)).try_collect().await?;
	Ok(pairs.into_iter().collect())
}

/// Result of reconciling one pull
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
	/// Verdicts of the pulled tree plus the local deletions
	pub status: FileSyncStatus,
	/// Repository paths written into the checkout
	pub copied: Vec<String>,
	/// Repository paths removed from the checkout
	pub deleted: Vec<String>,
}

/// Applies an extracted remote tree to the local checkout
pub struct Reconciler<'a> {
	pub filters: &'a [Filter],
	pub ignore: &'a IgnoreRuleSet,
	/// `jcr_root` of the local checkout
	pub local_jcr_root: &'a Path,
	/// Repository path being pulled
	pub remote_path: &'a str,
	pub parallelism: usize,
	pub marker_policy: MarkerFolderRemoval,
	pub cache: Option<&'a TimestampCache>,
}

impl Reconciler<'_> {
	pub async fn run(&self, extracted_jcr_root: &Path) -> SyncResult<ReconcileOutcome> {
		let local_root = paths::local_path(self.local_jcr_root, self.remote_path);
		let remote_root = paths::local_path(extracted_jcr_root, self.remote_path);

		let local_hashes =
			hash_tree(self.local_jcr_root, &local_root, self.parallelism, self.cache).await?;
		let remote_hashes =
			hash_tree(extracted_jcr_root, &remote_root, self.parallelism, None).await?;
		debug!(
			"Hashed {} local and {} remote file(s) under {}",
			local_hashes.len(),
			remote_hashes.len(),
			self.remote_path
		);

		let mut outcome = ReconcileOutcome::default();
		let mut seen = BTreeSet::new();

		if remote_root.exists() {
			let remote_status = build_sync_status_list(self.filters, self.ignore, &remote_root)?;
			for (remote, entry) in remote_status {
				if entry.verdict == SyncVerdict::Included {
					if local_hashes.get(&remote) != remote_hashes.get(&remote) {
						self.copy_in(extracted_jcr_root, &remote, remote_hashes.get(&remote)).await?;
						outcome.copied.push(remote.clone());
					}
					seen.insert(remote.clone());
				}
				outcome.status.insert(remote, entry);
			}
		} else {
			debug!("Remote has nothing under {}", self.remote_path);
		}

		if local_root.exists() {
			let local_status = build_sync_status_list(self.filters, self.ignore, &local_root)?;
			let mut markers = Vec::new();
			for (remote, entry) in local_status {
				if seen.contains(&remote) || entry.verdict != SyncVerdict::Included {
					continue;
				}
				if is_basic_exclude(Path::new(remote.trim_start_matches('/'))) {
					continue;
				}
				let local = paths::local_path(self.local_jcr_root, &remote);
				tokio::fs::remove_file(&local).await?;
				debug!("Deleted {} (gone from remote)", remote);
				if let Some(cache) = self.cache {
					cache.remove(&remote);
				}
				if paths::is_content_xml(&remote) {
					markers.push(paths::remote_parent(&remote).to_string());
				}
				outcome
					.status
					.insert(remote.clone(), StatusEntry::new(SyncVerdict::DeletedFromRemote, entry.owner));
				outcome.deleted.push(remote);
			}
			self.remove_marker_folders(markers, &seen)?;
		}

		info!(
			"Reconciled {}: {} copied, {} deleted",
			self.remote_path,
			outcome.copied.len(),
			outcome.deleted.len()
		);
		Ok(outcome)
	}

	async fn copy_in(
		&self,
		extracted_jcr_root: &Path,
		remote: &str,
		digest: Option<&Md5Digest>,
	) -> SyncResult<()> {
		let source = paths::local_path(extracted_jcr_root, remote);
		let target = paths::local_path(self.local_jcr_root, remote);
		if let Some(parent) = target.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}
		tokio::fs::copy(&source, &target).await?;
		debug!("Updated {}", remote);
		if let Some(cache) = self.cache {
			let mtime = tokio::fs::metadata(&target).await?.modified()?;
			cache.put(remote, CacheEntry { mtime, digest: digest.copied() });
		}
		Ok(())
	}

	/// Remove folders whose marker was deleted, deepest first
	fn remove_marker_folders(&self, mut folders: Vec<String>, seen: &BTreeSet<String>) -> SyncResult<()> {
		if self.marker_policy == MarkerFolderRemoval::Never {
			return Ok(());
		}
		folders.retain(|f| f != "/");
		folders.sort_by_key(|f| std::cmp::Reverse(f.matches('/').count()));
		for folder in folders {
			let local: PathBuf = paths::local_path(self.local_jcr_root, &folder);
			if !local.is_dir() {
				continue;
			}
			match self.marker_policy {
				MarkerFolderRemoval::Never => {}
				MarkerFolderRemoval::WhenEmpty => match fs::remove_dir(&local) {
					Ok(()) => debug!("Removed folder {}", folder),
					Err(e) => debug!("Keeping folder {}: {}", folder, e),
				},
				MarkerFolderRemoval::Recursive => {
					if seen.iter().any(|s| is_same_or_descendant(s, &folder)) {
						warn!("Keeping folder {}: remote still has content below it", folder);
						continue;
					}
					fs::remove_dir_all(&local)?;
					debug!("Removed folder {} recursively", folder);
				}
			}
		}
		Ok(())
	}
}


// vim: ts=4
