//! Last-synced timestamp cache and sync exclusivity
//!
//! The timestamp cache remembers, per repository path, the modification time
//! (and digest when known) a file had when it was last synced. It is only an
//! optimization and may be cleared at any time.
//!
//! `SyncLocks` ensures a single sync per (checkout, server) pair; the lock is
//! released when its guard is dropped.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::error::{SyncError, SyncResult};

/// What was known about a file when it was last synced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
	pub mtime: SystemTime,
	pub digest: Option<[u8; 16]>,
}

/// In-memory last-synced cache keyed by repository path
#[derive(Debug, Default)]
pub struct TimestampCache {
	entries: Mutex<HashMap<String, CacheEntry>>,
}

impl TimestampCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, remote_path: &str) -> Option<CacheEntry> {
		self.entries.lock().unwrap_or_else(|e| e.into_inner()).get(remote_path).copied()
	}

	pub fn put(&self, remote_path: &str, entry: CacheEntry) {
		self.entries
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.insert(remote_path.to_string(), entry);
	}

	pub fn remove(&self, remote_path: &str) {
		self.entries.lock().unwrap_or_else(|e| e.into_inner()).remove(remote_path);
	}

	pub fn clear(&self) {
		self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
	}

	pub fn len(&self) -> usize {
		self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Digest recorded for `remote_path` if its mtime still matches
	pub fn fresh_digest(&self, remote_path: &str, mtime: SystemTime) -> Option<[u8; 16]> {
		self.get(remote_path).filter(|entry| entry.mtime == mtime).and_then(|entry| entry.digest)
	}
}

type LockKey = (PathBuf, String);

/// Resolve `..` and symlinks so every spelling of a checkout shares one key
fn lock_key(content_root: &Path, server_url: &str) -> LockKey {
	let root = fs::canonicalize(content_root).unwrap_or_else(|_| content_root.to_path_buf());
	(root, server_url.trim_end_matches('/').to_string())
}

/// Registry of syncs in flight
#[derive(Debug, Clone, Default)]
pub struct SyncLocks {
	active: Arc<Mutex<HashSet<LockKey>>>,
}

impl SyncLocks {
	pub fn new() -> Self {
		Self::default()
	}

	/// Claim the (checkout, server) pair, failing if another sync holds it
	pub fn acquire(&self, content_root: &Path, server_url: &str) -> SyncResult<SyncLockGuard> {
		let key = lock_key(content_root, server_url);
		let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
		if !active.insert(key.clone()) {
			return Err(SyncError::LockFailed {
				message: format!(
					"a sync of {} with {} is already running",
					content_root.display(),
					server_url
				),
			});
		}
		Ok(SyncLockGuard { active: Arc::clone(&self.active), key: Some(key) })
	}

	pub fn is_locked(&self, content_root: &Path, server_url: &str) -> bool {
		let key = lock_key(content_root, server_url);
		self.active.lock().unwrap_or_else(|e| e.into_inner()).contains(&key)
	}
}

/// Held for the duration of one sync
#[derive(Debug)]
pub struct SyncLockGuard {
	active: Arc<Mutex<HashSet<LockKey>>>,
	key: Option<LockKey>,
}

impl SyncLockGuard {
	fn release(&mut self) {
		if let Some(key) = self.key.take() {
			self.active.lock().unwrap_or_else(|e| e.into_inner()).remove(&key);
		}
	}
}

impl Drop for SyncLockGuard {
	fn drop(&mut self) {
		self.release();
	}
}


// vim: ts=4
