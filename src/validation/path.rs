//! Archive entry checks

use std::path::{Component, Path};

use super::ValidationError;

/// Accept only relative entry names made of normal components
///
/// Anything else (`..`, a root, a drive prefix) could land outside the
/// extraction folder.
pub fn validate_archive_entry(name: &Path) -> Result<(), ValidationError> {
	let safe = name.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
	if !safe || name.as_os_str().is_empty() {
		return Err(ValidationError::UnsafePath(name.display().to_string()));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_package_entries_accepted() {
		assert!(validate_archive_entry(Path::new("jcr_root/apps/x/.content.xml")).is_ok());
		assert!(validate_archive_entry(Path::new("META-INF/vault/filter.xml")).is_ok());
	}

	#[test]
	fn test_escaping_entries_rejected() {
		assert!(validate_archive_entry(Path::new("/etc/passwd")).is_err());
		assert!(validate_archive_entry(Path::new("../x")).is_err());
		let err = validate_archive_entry(Path::new("jcr_root/../../x")).unwrap_err();
		assert!(err.to_string().starts_with("unsafe path"));
	}
}

// vim: ts=4
