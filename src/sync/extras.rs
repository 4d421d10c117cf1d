//! Operations around the package pipelines: external sync commands,
//! dependency upload and auto-sync of changed files

use futures::stream::{self, StreamExt, TryStreamExt};
use std::io;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use super::VaultSync;
use crate::error::{SyncError, SyncResult};
use crate::exclusion::is_basic_exclude;
use crate::logging::*;
use crate::paths::{self, CheckoutPath};
use crate::types::SyncEntry;

impl VaultSync {
	/// Run `<command> <path>` in place of the package pipeline
	pub(super) async fn run_command(&self, command: &str, path: &Path) -> SyncResult<Vec<SyncEntry>> {
		let mut words = command.split_whitespace();
		let program = words.next().ok_or_else(|| SyncError::CommandFailed {
			command: command.to_string(),
			message: "empty command".to_string(),
		})?;
		info!("Running {} {}", command, path.display());
		let output = Command::new(program).args(words).arg(path).output().await.map_err(|e| {
			SyncError::CommandFailed { command: command.to_string(), message: e.to_string() }
		})?;
		for line in String::from_utf8_lossy(&output.stdout).lines() {
			debug!("{}: {}", program, line);
		}
		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
			let message =
				if stderr.is_empty() { format!("exited with {}", output.status) } else { stderr };
			return Err(SyncError::CommandFailed { command: command.to_string(), message });
		}
		Ok(Vec::new())
	}

	/// Post every file of `dir` into the configured install folder
	///
	/// Uploads run concurrently; the first failure is returned.
	pub async fn install_dependencies(&self, dir: &Path) -> SyncResult<usize> {
		let mut reader = tokio::fs::read_dir(dir).await.map_err(|e| match e.kind() {
			io::ErrorKind::NotFound => SyncError::PathNotFound { path: dir.display().to_string() },
			_ => SyncError::Io(e),
		})?;
		let mut files = Vec::new();
		while let Some(entry) = reader.next_entry().await? {
			if entry.file_type().await?.is_file() && !is_basic_exclude(Path::new(&entry.file_name())) {
				files.push(entry.path());
			}
		}
		files.sort();

		let target = self.config.dependency_install_path.as_str();
		let uploads = files.iter().map(|file| self.manager.post_file(target, file));
		stream::iter(uploads).buffer_unordered(files.len().max(1)).try_collect::<Vec<()>>().await?;
		info!("Installed {} dependency file(s) into {}", files.len(), target);
		Ok(files.len())
	}

	/// Push a changed file when auto-sync is on
	///
	/// A `.content.xml` pushes its folder and a deleted file pushes its parent
	/// so the removal reaches the server. Files whose mtime matches the last
	/// sync are skipped. Returns `None` when nothing was pushed.
	pub async fn on_change(&self, path: &Path) -> SyncResult<Option<Vec<SyncEntry>>> {
		if !self.auto_sync_enabled() {
			trace!("Auto-sync disabled, ignoring {}", path.display());
			return Ok(None);
		}
		let checkout = CheckoutPath::locate(path)?;
		let parent = || path.parent().map(Path::to_path_buf).unwrap_or_else(|| path.to_path_buf());
		let target: PathBuf = match tokio::fs::metadata(path).await {
			Ok(meta) => {
				let mtime = meta.modified()?;
				if self.cache.get(&checkout.remote_path).map(|e| e.mtime) == Some(mtime) {
					debug!("{} unchanged since last sync", checkout.remote_path);
					return Ok(None);
				}
				if paths::is_content_xml(&checkout.remote_path) {
					parent()
				} else {
					path.to_path_buf()
				}
			}
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				self.cache.remove(&checkout.remote_path);
				parent()
			}
			Err(e) => return Err(e.into()),
		};
		self.push(&target).await.map(Some)
	}
}

// vim: ts=4
