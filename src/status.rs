//! Sync-status computation over a local tree
//!
//! Every file below the sync root is mapped to its repository path and
//! evaluated against the filters, then against the ignore rules.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{SyncError, SyncResult};
use crate::exclusion::IgnoreRuleSet;
use crate::filter::Filter;
use crate::logging::*;
use crate::paths::{self, CheckoutPath};
use crate::types::{FileSyncStatus, StatusEntry, SyncVerdict};

/// Enumerates the files of a tree
pub trait DirectoryLister: Send + Sync {
	/// Every file below `root`, or `root` itself when it is a file
	fn list_descendants(&self, root: &Path) -> SyncResult<Vec<PathBuf>>;
}

/// Lister walking the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLister;

impl FsLister {
	/// Any unreadable entry aborts the walk
	fn walk(&self, dir: &Path, out: &mut Vec<PathBuf>) -> SyncResult<()> {
		for entry in fs::read_dir(dir)? {
			let path = entry?.path();
			// follows symlinks so linked files are synced like regular ones
			let meta = fs::metadata(&path)?;
			if meta.is_dir() {
				self.walk(&path, out)?;
			} else if meta.is_file() {
				out.push(path);
			} else {
				debug!("Skipping special file {}", path.display());
			}
		}
		Ok(())
	}
}

impl DirectoryLister for FsLister {
	fn list_descendants(&self, root: &Path) -> SyncResult<Vec<PathBuf>> {
		let meta = fs::metadata(root).map_err(|e| match e.kind() {
			std::io::ErrorKind::NotFound => SyncError::PathNotFound { path: root.display().to_string() },
			_ => SyncError::Io(e),
		})?;
		if meta.is_file() {
			return Ok(vec![root.to_path_buf()]);
		}
		let mut files = Vec::new();
		self.walk(root, &mut files)?;
		files.sort();
		Ok(files)
	}
}

/// Combine the verdicts of all filters for one repository path
///
/// An inclusion by any filter sticks; otherwise the last filter with an
/// opinion decides.
pub fn evaluate_path(filters: &[Filter], remote_path: &str) -> StatusEntry {
	if paths::is_content_xml(remote_path) {
		let folder = paths::remote_parent(remote_path);
		if let Some(owner) = filters.iter().position(|f| f.covers(folder)) {
			return StatusEntry::new(SyncVerdict::Included, Some(owner));
		}
	}
	let mut entry = StatusEntry::new(SyncVerdict::Ignored, None);
	for (index, filter) in filters.iter().enumerate() {
		match filter.get_sync_status(remote_path) {
			SyncVerdict::Included => return StatusEntry::new(SyncVerdict::Included, Some(index)),
			SyncVerdict::Ignored => {}
			verdict => entry = StatusEntry::new(verdict, Some(index)),
		}
	}
	entry
}

/// Build the verdict map for every file below `root` using the filesystem
pub fn build_sync_status_list(
	filters: &[Filter],
	ignore: &IgnoreRuleSet,
	root: &Path,
) -> SyncResult<FileSyncStatus> {
	build_sync_status_list_with(&FsLister, filters, ignore, root)
}

/// Build the verdict map for every file below `root`
///
/// `root` must lie inside a `jcr_root` folder. Ignore rules see paths
/// relative to the sync root directory (the parent when `root` is a file).
pub fn build_sync_status_list_with(
	lister: &dyn DirectoryLister,
	filters: &[Filter],
	ignore: &IgnoreRuleSet,
	root: &Path,
) -> SyncResult<FileSyncStatus> {
	let checkout = CheckoutPath::locate(root)?;
	let files = lister.list_descendants(root)?;
	let ignore_base = if root.is_dir() { root } else { root.parent().unwrap_or(root) };

	let mut status = FileSyncStatus::new();
	for file in files {
		let remote = match paths::remote_path(&checkout.jcr_root, &file) {
			Some(remote) => remote,
			None => {
				warn!("{} is outside {}", file.display(), checkout.jcr_root.display());
				continue;
			}
		};
		let mut entry = evaluate_path(filters, &remote);
		if entry.verdict == SyncVerdict::Included {
			let relative = file.strip_prefix(ignore_base).map(paths::to_slash).unwrap_or_default();
			if ignore.denies(&relative) {
				entry = StatusEntry::new(SyncVerdict::ExcludedByIgnoreFile, None);
			}
		}
		trace!("{} -> {}", remote, entry.verdict);
		status.insert(remote, entry);
	}
	debug!("Computed sync status for {} file(s) under {}", status.len(), root.display());
	Ok(status)
}


// vim: ts=4
