//! Exclusion and ignore-file handling
//!
//! Provides the fixed exclusion list, the `.vltignore` pattern compiler and
//! the aggregation of ignore files found in a checkout.

mod ignore;
mod patterns;

pub use ignore::{build_ignore_text, load_ignore_rules, IGNORE_FILE_NAME};
pub use patterns::IgnoreRuleSet;

use std::path::Path;

use crate::error::SyncError;

/// File names that never travel in a package, whatever the filters say
pub const BASIC_EXCLUDES: &[&str] = &[
	".vlt",
	IGNORE_FILE_NAME,
	".vlt-sync.log",
	".vlt-sync-config.properties",
	".DS_Store",
	"Thumbs.db",
	"desktop.ini",
];

/// True if any component of `path` is on the fixed exclusion list
pub fn is_basic_exclude(path: &Path) -> bool {
	path.components().any(|c| {
		let name = c.as_os_str().to_string_lossy();
		BASIC_EXCLUDES.iter().any(|e| *e == name)
	})
}

/// Errors that can occur while reading or compiling ignore rules
#[derive(Debug)]
pub enum ExclusionError {
	/// Failed to compile a pattern
	InvalidPattern(String),

	/// Failed to read or find an ignore file
	IgnoreFileError(String),
}

impl std::fmt::Display for ExclusionError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ExclusionError::InvalidPattern(msg) => {
				write!(f, "Invalid ignore pattern: {}", msg)
			}
			ExclusionError::IgnoreFileError(msg) => {
				write!(f, "Ignore file error: {}", msg)
			}
		}
	}
}

impl std::error::Error for ExclusionError {}

impl From<ExclusionError> for SyncError {
	fn from(e: ExclusionError) -> Self {
		SyncError::Other { message: e.to_string() }
	}
}


// vim: ts=4
