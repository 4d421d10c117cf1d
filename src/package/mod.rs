//! Content package assembly
//!
//! A package is staged in a private temporary workspace laid out as
//! `jcr_root/...` plus `META-INF/vault/{filter.xml,properties.xml}` and then
//! zipped.

mod archive;
mod meta;

pub use archive::{create_archive, extract_archive};
pub use meta::{package_filters, properties_xml, write_meta_inf, PackageInfo};

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{SyncError, SyncResult};
use crate::exclusion::is_basic_exclude;
use crate::logging::*;
use crate::paths::{self, JCR_ROOT};
use crate::types::{FileSyncStatus, SyncVerdict};

/// Temporary package tree owned by exactly one sync operation
///
/// The directory is removed on drop; `close` removes it and reports errors.
#[derive(Debug)]
pub struct TempWorkspace {
	dir: tempfile::TempDir,
}

impl TempWorkspace {
	pub fn new() -> SyncResult<Self> {
		let dir = tempfile::Builder::new().prefix("vaultsync-").tempdir()?;
		debug!("Created workspace {}", dir.path().display());
		Ok(TempWorkspace { dir })
	}

	pub fn path(&self) -> &Path {
		self.dir.path()
	}

	pub fn jcr_root(&self) -> PathBuf {
		self.dir.path().join(JCR_ROOT)
	}

	pub fn vault_dir(&self) -> PathBuf {
		self.dir.path().join("META-INF").join("vault")
	}

	/// Location of the archive built from this workspace (outside the staged tree)
	pub fn archive_path(&self, info: &PackageInfo) -> PathBuf {
		self.dir.path().join(info.file_name())
	}

	pub fn close(self) -> SyncResult<()> {
		let path = self.dir.path().to_path_buf();
		self.dir.close()?;
		debug!("Removed workspace {}", path.display());
		Ok(())
	}
}

/// Copy every included file from `source_jcr_root` into the workspace
///
/// Returns the number of staged files.
pub fn stage_included(
	status: &FileSyncStatus,
	source_jcr_root: &Path,
	workspace: &TempWorkspace,
) -> SyncResult<usize> {
	let target_root = workspace.jcr_root();
	fs::create_dir_all(&target_root)?;
	let mut staged = 0;
	for (remote, entry) in status {
		if entry.verdict != SyncVerdict::Included {
			continue;
		}
		if is_basic_exclude(Path::new(remote.trim_start_matches('/'))) {
			debug!("Not staging {}", remote);
			continue;
		}
		let source = paths::local_path(source_jcr_root, remote);
		let target = paths::local_path(&target_root, remote);
		if let Some(parent) = target.parent() {
			fs::create_dir_all(parent)?;
		}
		fs::copy(&source, &target).map_err(|e| SyncError::Packaging {
			message: format!("cannot stage {}: {}", source.display(), e),
		})?;
		staged += 1;
	}
	debug!("Staged {} file(s)", staged);
	Ok(staged)
}


// vim: ts=4
